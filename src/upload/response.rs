//! Upload response classification
//!
//! Only `201 Created` is success. Every other status is retryable, 4xx
//! included: a permanent client error still uses up the attempt budget.

use crate::error::PkgflowError;
use serde_json::Value;

/// HTTP status the repository service answers a stored upload with
pub const STATUS_CREATED: u16 = 201;

/// Confirmation returned by the repository service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub uuid: String,
    pub name: Option<String>,
    pub version: Option<String>,
    pub architecture: Option<String>,
}

/// Outcome of a single upload attempt
#[derive(Debug)]
pub enum UploadOutcome {
    Success(UploadReceipt),
    /// Worth another attempt (non-201, timeout, connection or local I/O error)
    RetryableFailure { reason: String },
    /// Retrying cannot help
    FatalFailure(PkgflowError),
}

impl UploadOutcome {
    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::RetryableFailure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Classify a response by status code and body
pub fn interpret(status: u16, body: &str) -> UploadOutcome {
    if status != STATUS_CREATED {
        return UploadOutcome::retryable(format!(
            "Upload failed ({}): {}",
            status,
            error_message(body)
        ));
    }

    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            return UploadOutcome::FatalFailure(PkgflowError::InvalidResponse(e.to_string()))
        }
    };

    let Some(uuid) = parsed
        .pointer("/package/uuid")
        .and_then(Value::as_str)
        .filter(|uuid| !uuid.is_empty())
    else {
        return UploadOutcome::FatalFailure(PkgflowError::MissingIdentifier);
    };

    let field = |name: &str| parsed.pointer(&format!("/package/{}", name)).and_then(text);

    UploadOutcome::Success(UploadReceipt {
        uuid: uuid.to_string(),
        name: field("name"),
        version: field("version"),
        architecture: field("architecture"),
    })
}

/// Error text from a failed response: JSON `message`, then `error`, then the raw body
pub fn error_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    ["message", "error"]
        .iter()
        .filter_map(|key| parsed.get(key))
        .find_map(text)
        .unwrap_or_else(|| body.to_string())
}

/// Non-empty display text of a JSON value
fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_with_uuid_is_success() {
        let body = r#"{"package":{"uuid":"u-1","name":"n","version":"v","architecture":"amd64"}}"#;
        match interpret(201, body) {
            UploadOutcome::Success(receipt) => {
                assert_eq!(receipt.uuid, "u-1");
                assert_eq!(receipt.name.as_deref(), Some("n"));
                assert_eq!(receipt.version.as_deref(), Some("v"));
                assert_eq!(receipt.architecture.as_deref(), Some("amd64"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn created_without_uuid_is_fatal() {
        assert!(matches!(
            interpret(201, r#"{"package":{}}"#),
            UploadOutcome::FatalFailure(PkgflowError::MissingIdentifier)
        ));
        assert!(matches!(
            interpret(201, r#"{"package":{"uuid":""}}"#),
            UploadOutcome::FatalFailure(PkgflowError::MissingIdentifier)
        ));
        assert!(matches!(
            interpret(201, r#"{}"#),
            UploadOutcome::FatalFailure(PkgflowError::MissingIdentifier)
        ));
    }

    #[test]
    fn created_with_garbage_is_fatal() {
        assert!(matches!(
            interpret(201, "<html>ok</html>"),
            UploadOutcome::FatalFailure(PkgflowError::InvalidResponse(_))
        ));
    }

    #[test]
    fn unprocessable_is_retryable_with_message() {
        match interpret(422, r#"{"message":"bad channel"}"#) {
            UploadOutcome::RetryableFailure { reason } => {
                assert!(reason.contains("bad channel"));
                assert_eq!(reason, "Upload failed (422): bad channel");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn other_success_codes_are_not_success() {
        let body = r#"{"package":{"uuid":"u-1"}}"#;
        assert!(!interpret(200, body).is_success());
    }

    #[test]
    fn error_message_precedence() {
        assert_eq!(error_message(r#"{"message":"m","error":"e"}"#), "m");
        assert_eq!(error_message(r#"{"error":"e"}"#), "e");
        assert_eq!(error_message(r#"{"message":"","error":"e"}"#), "e");
        assert_eq!(error_message(r#"{"detail":"d"}"#), r#"{"detail":"d"}"#);
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(""), "");
    }
}
