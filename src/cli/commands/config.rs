//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{PkgflowError, PkgflowResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

/// Keys accepted by `pkgflow config set`
const VALID_KEYS: [&str; 13] = [
    "general.verbose",
    "general.log_format",
    "build.runtime",
    "build.image_registry",
    "build.network",
    "build.workspace",
    "cache.enabled",
    "cache.prefix",
    "cache.store_dir",
    "upload.url",
    "upload.max_attempts",
    "upload.base_delay_secs",
    "upload.attempt_timeout_secs",
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
) -> PkgflowResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let mut config = config.clone();
            set_value(&mut config, &key, &value)?;
            manager.save(&config).await?;
            ui::step_ok(&UiContext::detect(), &format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> PkgflowResult<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> PkgflowResult<()> {
    let ctx = UiContext::detect().with_auto_yes(force);
    let path = manager.path();

    if path.exists() {
        let prompt = format!("Overwrite {}?", path.display());
        if !ui::confirm(&ctx, &prompt, false).await? {
            ui::step_warn(
                &ctx,
                &format!("Config already exists at {}", path.display()),
            );
            ui::remark(&ctx, "Use --force to overwrite");
            return Ok(());
        }
    }

    manager.save(&Config::default()).await?;
    ui::step_ok(&ctx, &format!("Configuration initialized at {}", path.display()));
    Ok(())
}

/// Apply a dot-separated `key` to `config`
fn set_value(config: &mut Config, key: &str, value: &str) -> PkgflowResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "verbose"] => config.general.verbose = parse_bool(value)?,
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(PkgflowError::User(format!(
                    "Invalid log format: {}. Use text or json",
                    value
                )))
            }
        },

        ["build", "runtime"] => config.build.runtime = value.to_string(),
        ["build", "image_registry"] => config.build.image_registry = value.to_string(),
        ["build", "network"] => config.build.network = value.to_string(),
        ["build", "workspace"] => config.build.workspace = PathBuf::from(value),

        ["cache", "enabled"] => config.cache.enabled = parse_bool(value)?,
        ["cache", "prefix"] => config.cache.prefix = value.to_string(),
        ["cache", "store_dir"] => config.cache.store_dir = Some(PathBuf::from(value)),

        ["upload", "url"] => config.upload.url = value.to_string(),
        ["upload", "max_attempts"] => config.upload.max_attempts = parse_number(value)?,
        ["upload", "base_delay_secs"] => config.upload.base_delay_secs = parse_number(value)?,
        ["upload", "attempt_timeout_secs"] => {
            config.upload.attempt_timeout_secs = parse_number(value)?
        }

        _ => {
            return Err(PkgflowError::User(format!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                VALID_KEYS.join(", ")
            )))
        }
    }

    Ok(())
}

fn parse_bool(value: &str) -> PkgflowResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(PkgflowError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> PkgflowResult<T> {
    value
        .parse()
        .map_err(|_| PkgflowError::User(format!("Invalid number: {}", value)))
}
