//! Step outputs
//!
//! Values other steps consume (`package_path`, `uuid`, ...). Printed as
//! `name=value` on stdout and appended to the GitHub Actions output file
//! when one is configured. Multi-line values use the heredoc form with a
//! random delimiter.

use crate::error::{PkgflowError, PkgflowResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

/// Ordered set of named outputs
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Outputs {
    entries: Vec<(String, String)>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing an earlier value in place
    pub fn set(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write `name=value` lines to `out`
    pub fn print(&self, out: &mut impl Write) -> PkgflowResult<()> {
        for (name, value) in &self.entries {
            writeln!(out, "{}={}", name, value)
                .map_err(|e| PkgflowError::io("writing outputs", e))?;
        }
        Ok(())
    }

    /// Output file contents in GitHub Actions format
    pub fn render(&self) -> String {
        let mut rendered = String::new();
        for (name, value) in &self.entries {
            if value.contains('\n') {
                let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
                rendered.push_str(&format!("{}<<{}\n{}\n{}\n", name, delimiter, value, delimiter));
            } else {
                rendered.push_str(&format!("{}={}\n", name, value));
            }
        }
        rendered
    }

    /// Append to the output file at `path`, creating it if needed
    pub async fn append_to(&self, path: &Path) -> PkgflowResult<()> {
        let context = || format!("writing outputs to {}", path.display());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| PkgflowError::io(context(), e))?;
        file.write_all(self.render().as_bytes())
            .await
            .map_err(|e| PkgflowError::io(context(), e))?;
        file.flush().await.map_err(|e| PkgflowError::io(context(), e))?;

        debug!("Wrote {} outputs to {}", self.entries.len(), path.display());
        Ok(())
    }

    /// Print to stdout, then append to `output_file` if set
    pub async fn emit(&self, output_file: Option<&PathBuf>) -> PkgflowResult<()> {
        self.print(&mut std::io::stdout().lock())?;
        if let Some(path) = output_file {
            self.append_to(path).await?;
        }
        Ok(())
    }
}
