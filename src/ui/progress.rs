//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Longest tool line shown next to the spinner
const MAX_LINE_WIDTH: usize = 60;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Live view of the packaging tool's output.
///
/// Interactive: a spinner showing the latest line. GitHub Actions: the raw
/// output inside a collapsible log group. Elsewhere: nothing, the lines
/// still reach the debug log.
pub struct BuildProgress {
    bar: Option<ProgressBar>,
    grouped: bool,
}

impl BuildProgress {
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let mut grouped = false;
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new_spinner();
            if let Ok(template) = ProgressStyle::default_spinner()
                .template("  {spinner:.blue} Packaging {prefix}  {msg:.dim}  {elapsed:.dim}")
            {
                bar.set_style(template.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            if ctx.use_log_groups() {
                println!("::group::Packaging {}", label);
                grouped = true;
            } else {
                println!("Packaging {}...", label);
            }
            None
        };
        Self { bar, grouped }
    }

    /// Show one line of tool output
    pub fn on_line(&self, line: &str) {
        if let Some(ref bar) = self.bar {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                bar.set_message(truncate(trimmed, MAX_LINE_WIDTH));
            }
        } else if self.grouped {
            println!("{}", line);
        }
    }

    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
        if self.grouped {
            println!("::endgroup::");
        }
    }
}

/// Cut `line` to at most `width` characters, marking the cut with `...`
fn truncate(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        return line.to_string();
    }
    let kept: String = line.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}
