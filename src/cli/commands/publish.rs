//! Publish command - upload a package to the repository service

use crate::cli::args::PublishArgs;
use crate::config::Config;
use crate::error::PkgflowResult;
use crate::outputs::Outputs;
use crate::secrets::SecretMask;
use crate::ui::{self, TaskSpinner, UiContext};
use crate::upload::{RetryPolicy, UploadClient, UploadRequest};

/// Execute the publish command
pub async fn execute(args: PublishArgs, config: &Config, mask: &SecretMask) -> PkgflowResult<()> {
    mask.register(args.token.as_str());
    let ctx = UiContext::detect();

    // Validation happens before any network call
    let request = UploadRequest::new(&args.file, &args.target, &args.repository, &args.channel)?;

    let mut policy = RetryPolicy::from_config(&config.upload);
    if let Some(max_attempts) = args.max_attempts {
        policy.max_attempts = max_attempts;
    }
    let url = args.url.as_deref().unwrap_or(&config.upload.url);
    let client = UploadClient::new(url, &args.token, policy, mask.clone())?;

    ui::intro(&ctx, &format!("pkgflow publish {}", request.file_name()));

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!(
        "Uploading to {} ({})",
        request.repository(),
        request.channel
    ));
    let receipt = match client.upload(&request).await {
        Ok(receipt) => {
            spinner.stop("Package uploaded");
            receipt
        }
        Err(e) => {
            spinner.stop_error("Upload failed");
            return Err(e);
        }
    };

    ui::key_value(&ctx, "UUID", &receipt.uuid);
    for (key, value) in [
        ("Name", &receipt.name),
        ("Version", &receipt.version),
        ("Architecture", &receipt.architecture),
    ] {
        if let Some(value) = value {
            ui::key_value(&ctx, key, value);
        }
    }

    let mut outputs = Outputs::new();
    outputs.set("uuid", &receipt.uuid);
    outputs.emit(args.output_file.as_ref()).await?;

    ui::outro_success(&ctx, "Published");
    Ok(())
}
