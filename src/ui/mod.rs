//! Terminal output
//!
//! `cliclack` framing and `indicatif` spinners in a terminal, plain tagged
//! lines in CI. GitHub Actions runs get `::group::` blocks around the
//! packaging tool output.

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{intro, key_value, outro_success, remark, step_info, step_ok, step_warn};
pub use progress::{BuildProgress, TaskSpinner};
pub use prompts::confirm;
