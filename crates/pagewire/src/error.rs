//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use pagewire_config::ConfigError;
use pagewire_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Rules ────────────────────────────────────────────────────────
    #[error("Could not parse rule file {path}")]
    #[diagnostic(
        code(pagewire::invalid_rules),
        help(
            "{message}\n\
             Rule files hold [[rules]] tables (TOML) or {{\"rules\": [...]}} (JSON)."
        )
    )]
    InvalidRules { path: String, message: String },

    #[error("Lint found {errors} error(s)")]
    #[diagnostic(
        code(pagewire::lint_failed),
        help("Fix the conditions marked as errors; they can never match.")
    )]
    LintFailed { errors: usize },

    // ── Data ─────────────────────────────────────────────────────────
    #[error("Data source '{id}' is not configured")]
    #[diagnostic(
        code(pagewire::source_not_found),
        help("Declare it under [[sources]] in the config file. Run: pagewire config show")
    )]
    SourceNotFound { id: String },

    #[error("Request failed: {message}")]
    #[diagnostic(code(pagewire::request_failed))]
    Request { message: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(pagewire::timeout),
        help("Raise [http] timeout in the config file or check the source's availability.")
    )]
    Timeout { seconds: u64 },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(pagewire::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists")]
    #[diagnostic(
        code(pagewire::config_exists),
        help(
            "Existing file: {path}\n\
             Use --yes (-y) to overwrite it."
        )
    )]
    ConfigExists { path: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(
        code(pagewire::config),
        help("Run: pagewire config show")
    )]
    Config { message: String },

    #[error(transparent)]
    #[diagnostic(code(pagewire::config_load))]
    ConfigLoad(Box<figment::Error>),

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(pagewire::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidRules { .. } | Self::Validation { .. } | Self::ConfigExists { .. } => {
                exit_code::USAGE
            }
            Self::SourceNotFound { .. } => exit_code::NOT_FOUND,
            Self::Request { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SourceNotFound { id } => CliError::SourceNotFound { id },
            CoreError::Request { message, status: _ } => CliError::Request { message },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::InvalidRules { message } => CliError::InvalidRules {
                path: "(input)".into(),
                message,
            },
            CoreError::Config { message } => CliError::Config { message },
            CoreError::NoRuntime { operation } => {
                CliError::Internal(format!("no async runtime for {operation}"))
            }
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Figment(inner) => CliError::ConfigLoad(inner),
            ConfigError::Io(e) => CliError::Io(e),
            other @ (ConfigError::MissingToken { .. }
            | ConfigError::DuplicateSource { .. }
            | ConfigError::Serialization(_)) => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(
            CliError::from(CoreError::SourceNotFound { id: "x".into() }).exit_code(),
            exit_code::NOT_FOUND
        );
        assert_eq!(
            CliError::from(CoreError::Timeout { timeout_secs: 1 }).exit_code(),
            exit_code::TIMEOUT
        );
        assert_eq!(
            CliError::LintFailed { errors: 2 }.exit_code(),
            exit_code::GENERAL
        );
    }
}
