// ── Runtime context configuration ──
//
// These types describe what an AppContext wires up: transport tuning,
// the overlap policy, data sources, and bindings. They never touch disk.
// The CLI (via pagewire-config) builds a `ContextConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::data::OverlapPolicy;
use crate::model::Binding;

/// TLS verification strategy for remote sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Transport settings shared by every HTTP source in a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub tls: TlsVerification,
    pub connect_timeout: Duration,
    /// Total request timeout.
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            tls: TlsVerification::default(),
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(15),
        }
    }
}

/// A data source to register at construction.
#[derive(Debug, Clone)]
pub enum SourceConfig {
    /// Remote text split into rows.
    Http {
        id: String,
        url: Url,
        separator: char,
        token: Option<SecretString>,
    },
    /// Fixed list of file names.
    Listing {
        id: String,
        files: Vec<String>,
        base_url: Option<Url>,
    },
}

impl SourceConfig {
    pub fn id(&self) -> &str {
        match self {
            Self::Http { id, .. } | Self::Listing { id, .. } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Listing { .. } => "listing",
        }
    }
}

/// Everything an [`AppContext`](crate::AppContext) is built from.
#[derive(Debug, Clone, Default)]
pub struct ContextConfig {
    pub http: HttpSettings,
    pub overlap: OverlapPolicy,
    pub sources: Vec<SourceConfig>,
    pub bindings: Vec<Binding>,
}
