//! HTTP upload client
//!
//! `POST <base>/api/upload` with a bearer token and a multipart body. The
//! blocking HTTP call runs on the blocking pool; the agent's global timeout
//! aborts an attempt that runs too long and drops its file handle.

use crate::error::{PkgflowError, PkgflowResult};
use crate::secrets::SecretMask;
use crate::upload::multipart::MultipartBody;
use crate::upload::request::UploadRequest;
use crate::upload::response::{interpret, UploadOutcome, UploadReceipt};
use crate::upload::retry::{self, RetryPolicy};
use std::time::Duration;
use tracing::{debug, info};
use ureq::{Agent, SendBody};

/// Default repository service
pub const DEFAULT_SERVER_URL: &str = "https://go.packager.io";

/// Path of the upload endpoint
const UPLOAD_PATH: &str = "/api/upload";

/// Client for the package repository service
pub struct UploadClient {
    agent: Agent,
    endpoint: String,
    token: String,
    policy: RetryPolicy,
    mask: SecretMask,
}

impl UploadClient {
    /// Create a client. The token is registered with `mask` before anything
    /// is logged.
    pub fn new(
        base_url: &str,
        token: &str,
        policy: RetryPolicy,
        mask: SecretMask,
    ) -> PkgflowResult<Self> {
        if token.trim().is_empty() {
            return Err(PkgflowError::MissingInput("token"));
        }
        mask.register(token);

        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(PkgflowError::MissingInput("url"));
        }

        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(policy.attempt_timeout))
            .build();

        Ok(Self {
            agent: config.into(),
            endpoint: format!("{}{}", base_url, UPLOAD_PATH),
            token: token.to_string(),
            policy,
            mask,
        })
    }

    /// Full upload URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload `request`, retrying per the client's policy
    pub async fn upload(&self, request: &UploadRequest) -> PkgflowResult<UploadReceipt> {
        let size_mib = std::fs::metadata(&request.file)
            .map(|m| m.len() as f64 / 1024.0 / 1024.0)
            .unwrap_or_default();

        info!(
            "Uploading {} ({:.2} MB) to {}",
            request.file_name(),
            size_mib,
            self.endpoint
        );
        info!("Repository: {}", request.repository());
        info!("Target: {}", request.target);
        info!("Channel: {}", request.channel);

        let receipt = retry::run(&self.policy, |n| self.attempt(request, n)).await?;

        info!("✓ Package uploaded successfully");
        info!("UUID: {}", receipt.uuid);
        info!("Name: {}", receipt.name.as_deref().unwrap_or("-"));
        info!("Version: {}", receipt.version.as_deref().unwrap_or("-"));
        info!(
            "Architecture: {}",
            receipt.architecture.as_deref().unwrap_or("-")
        );

        Ok(receipt)
    }

    /// One attempt: fresh body, one request, classified response
    async fn attempt(&self, request: &UploadRequest, n: u32) -> UploadOutcome {
        debug!("Upload attempt {}/{}", n, self.policy.max_attempts);

        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let authorization = format!("Bearer {}", self.token);
        let request = request.clone();
        let timeout = self.policy.attempt_timeout;

        let outcome = tokio::task::spawn_blocking(move || {
            send_once(&agent, &endpoint, &authorization, &request, timeout)
        })
        .await
        .unwrap_or_else(|e| UploadOutcome::retryable(format!("upload task failed: {}", e)));

        match outcome {
            UploadOutcome::RetryableFailure { reason } => {
                UploadOutcome::retryable(self.mask.redact(&reason))
            }
            other => other,
        }
    }
}

fn send_once(
    agent: &Agent,
    endpoint: &str,
    authorization: &str,
    request: &UploadRequest,
    timeout: Duration,
) -> UploadOutcome {
    let body = match MultipartBody::for_request(request) {
        Ok(body) => body,
        Err(e) => {
            return UploadOutcome::retryable(format!(
                "Cannot read {}: {}",
                request.file.display(),
                e
            ))
        }
    };
    let content_type = body.content_type();
    let content_length = body.content_length().to_string();
    let mut reader = body.into_reader();

    let result = agent
        .post(endpoint)
        .header("Authorization", authorization)
        .header("Content-Type", content_type.as_str())
        .header("Content-Length", content_length.as_str())
        .header("User-Agent", concat!("pkgflow/", env!("CARGO_PKG_VERSION")))
        .send(SendBody::from_reader(&mut reader));

    match result {
        Ok(mut response) => {
            let status = response.status().as_u16();
            match response.body_mut().read_to_string() {
                Ok(text) => interpret(status, &text),
                Err(e) => UploadOutcome::retryable(format!(
                    "Upload failed ({}): reading response: {}",
                    status, e
                )),
            }
        }
        Err(ureq::Error::Timeout(_)) => {
            UploadOutcome::retryable(format!("Upload timeout after {}", describe(timeout)))
        }
        Err(e) => UploadOutcome::retryable(format!("Upload failed: {}", e)),
    }
}

/// Whole minutes when the timeout is a multiple of 60s, seconds otherwise
fn describe(timeout: Duration) -> String {
    let secs = timeout.as_secs();
    let (n, unit) = if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    format!("{} {}{}", n, unit, if n == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_from_base_url() {
        let client = UploadClient::new(
            "https://repo.example.com/",
            "tok",
            RetryPolicy::default(),
            SecretMask::new(),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "https://repo.example.com/api/upload");
    }

    #[test]
    fn empty_token_rejected() {
        let err = UploadClient::new(
            DEFAULT_SERVER_URL,
            "  ",
            RetryPolicy::default(),
            SecretMask::new(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, PkgflowError::MissingInput("token")));
    }

    #[test]
    fn token_registered_with_mask() {
        let mask = SecretMask::new();
        let _client =
            UploadClient::new(DEFAULT_SERVER_URL, "abc123", RetryPolicy::default(), mask.clone())
                .unwrap();
        assert_eq!(mask.redact("Bearer abc123"), "Bearer ***");
    }

    #[tokio::test]
    async fn upload_recovers_after_server_error() {
        use httptest::{cycle, matchers::*, responders::*, Expectation, Server};

        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/api/upload"),
                request::body(matches("name=\"channel\"")),
            ])
            .times(2)
            .respond_with(cycle![
                status_code(502).body("bad gateway"),
                status_code(201).body(r#"{"package":{"uuid":"abc-1","name":"demo"}}"#),
            ]),
        );

        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("demo_1.0_amd64.deb");
        std::fs::write(&file, b"package bytes").unwrap();
        let request = UploadRequest::new(&file, "ubuntu-22.04", "acme/tools", "main").unwrap();

        let policy = RetryPolicy {
            base_delay: Duration::ZERO,
            ..RetryPolicy::default()
        };
        let client = UploadClient::new(&server.url_str(""), "tok", policy, SecretMask::new()).unwrap();

        let receipt = client.upload(&request).await.unwrap();
        assert_eq!(receipt.uuid, "abc-1");
        assert_eq!(receipt.name.as_deref(), Some("demo"));
        assert_eq!(receipt.version, None);
    }

    #[test]
    fn timeout_described_in_fitting_unit() {
        assert_eq!(describe(Duration::from_secs(600)), "10 minutes");
        assert_eq!(describe(Duration::from_secs(60)), "1 minute");
        assert_eq!(describe(Duration::from_secs(90)), "90 seconds");
        assert_eq!(describe(Duration::from_secs(1)), "1 second");
    }

    #[tokio::test]
    async fn slow_server_times_out_each_attempt() {
        use httptest::{matchers::*, responders::*, Expectation, Server};

        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/api/upload"))
                .times(2)
                .respond_with(delay_and_then(
                    Duration::from_secs(3),
                    status_code(201).body(r#"{"package":{"uuid":"late"}}"#),
                )),
        );

        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("demo_1.0_amd64.deb");
        std::fs::write(&file, b"package bytes").unwrap();
        let request = UploadRequest::new(&file, "ubuntu-22.04", "acme/tools", "main").unwrap();

        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::ZERO,
            attempt_timeout: Duration::from_secs(1),
        };
        let client = UploadClient::new(&server.url_str(""), "tok", policy, SecretMask::new()).unwrap();

        let started = std::time::Instant::now();
        let err = client.upload(&request).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(6));
        match err {
            PkgflowError::UploadExhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert_eq!(last, "Upload timeout after 1 second");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
