use serde::Deserialize;
use thiserror::Error;

/// Errors from talking to the plan engine.
///
/// The client performs no retries; every failure is surfaced unchanged so
/// the caller can decide what is retryable.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Connection, timeout, or body decoding failure.
    #[error("plan engine transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The engine rejected the request with a structured error envelope.
    #[error("plan engine error {code} ({status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Non-success response without a recognizable error envelope.
    #[error("plan engine returned unexpected status {status}")]
    UnexpectedStatus { status: u16 },
}

/// The engine's error envelope: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_with_missing_fields() {
        let env: ErrorEnvelope = serde_json::from_str(r#"{"error": {}}"#).unwrap();
        assert!(env.error.code.is_none());
        assert!(env.error.message.is_none());
    }

    #[test]
    fn envelope_parses_full() {
        let env: ErrorEnvelope = serde_json::from_str(
            r#"{"error": {"code": "PLAN_NOT_FOUND", "message": "Plan 'x' not found"}}"#,
        )
        .unwrap();
        assert_eq!(env.error.code.as_deref(), Some("PLAN_NOT_FOUND"));
        assert_eq!(env.error.message.as_deref(), Some("Plan 'x' not found"));
    }
}
