//! Confirmation prompt with CI fallback

use super::context::UiContext;
use crate::error::{PkgflowError, PkgflowResult};

/// Ask a yes/no question; auto-yes answers yes, non-interactive returns `default`
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> PkgflowResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    tokio::task::spawn_blocking(move || cliclack::confirm(&message).initial_value(default).interact())
        .await
        .map_err(|e| PkgflowError::Internal(format!("prompt task failed: {}", e)))?
        .map_err(|e| PkgflowError::User(format!("Prompt failed: {}", e)))
}
