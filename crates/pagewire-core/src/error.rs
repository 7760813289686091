// ── Core error types ──
//
// Errors surfaced by pagewire-core. Transport failures from pagewire-api
// are translated into the variants below; consumers never match on
// reqwest errors directly.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Data errors ──────────────────────────────────────────────────
    #[error("Data source not registered: {id}")]
    SourceNotFound { id: String },

    #[error("Cannot {operation}: no Tokio runtime is running")]
    NoRuntime { operation: String },

    // ── Transport errors ─────────────────────────────────────────────
    #[error("Request failed: {message}")]
    Request {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Rule errors ──────────────────────────────────────────────────
    #[error("Invalid rules: {message}")]
    InvalidRules { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<pagewire_api::Error> for CoreError {
    fn from(err: pagewire_api::Error) -> Self {
        match err {
            pagewire_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            pagewire_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            pagewire_api::Error::Status { status, url } => CoreError::Request {
                message: format!("HTTP {status} from {url}"),
                status: Some(status),
            },
            other @ (pagewire_api::Error::Transport(_) | pagewire_api::Error::Body { .. }) => {
                CoreError::Request {
                    message: other.to_string(),
                    status: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_translate() {
        let err = CoreError::from(pagewire_api::Error::Status {
            status: 503,
            url: "http://localhost/feed".into(),
        });
        assert!(matches!(err, CoreError::Request { status: Some(503), .. }));

        let err = CoreError::from(pagewire_api::Error::Timeout { timeout_secs: 3 });
        assert_eq!(err.to_string(), "Request timed out after 3s");
    }

    #[test]
    fn source_not_found_names_the_id() {
        let err = CoreError::SourceNotFound { id: "feed".into() };
        assert_eq!(err.to_string(), "Data source not registered: feed");
    }
}
