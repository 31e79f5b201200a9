//! Build orchestration
//!
//! Prepares the workspace and drives the containerized packaging tool:
//! - `Workspace`: clean root with disjoint cache and output directories
//! - `Builder`: the packaging step, implemented by `ContainerBuilder`
//! - `pipeline`: the whole `package` flow around a `Builder`

mod builder;
mod container;
mod pipeline;
mod workspace;

pub use builder::{BuildStatus, Builder, PackageSpec};
pub use container::{ContainerBuilder, OutputSink};
pub use pipeline::{package, PackageJob, PackageReport};
pub use workspace::Workspace;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Returns all collected output lines in arrival order.
pub(crate) async fn stream_child_output(
    stdout: ChildStdout,
    stderr: ChildStderr,
    on_output: &(dyn Fn(&str) + Send + Sync),
) -> Vec<String> {
    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_reader = BufReader::new(stdout).lines();

    let mut all_output = Vec::new();
    let mut stderr_done = false;
    let mut stdout_done = false;

    while !stderr_done || !stdout_done {
        tokio::select! {
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(&line);
                        all_output.push(line);
                    }
                    _ => stderr_done = true,
                }
            }
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(&line);
                        all_output.push(line);
                    }
                    _ => stdout_done = true,
                }
            }
        }
    }

    all_output
}
