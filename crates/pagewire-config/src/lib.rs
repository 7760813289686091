//! Configuration for the pagewire CLI.
//!
//! TOML file (platform config dir) merged with `PAGEWIRE_`-prefixed
//! environment variables, source token resolution, and translation to
//! `pagewire_core::ContextConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use pagewire_core::{
    Binding, ContextConfig, HttpSettings, OverlapPolicy, SourceConfig, TlsVerification,
};

/// Environment variable prefix; nested keys are separated by `__`
/// (`PAGEWIRE_HTTP__TIMEOUT=5`).
pub const ENV_PREFIX: &str = "PAGEWIRE_";

const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("source '{id}' reads its token from ${var}, which is not set")]
    MissingToken { id: String, var: String },

    #[error("duplicate source id '{id}'")]
    DuplicateSource { id: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpSection,

    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub sources: Vec<SourceEntry>,

    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// Transport settings shared by every HTTP source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HttpSection {
    /// Seconds allowed for establishing a connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Seconds allowed for a whole request.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate (PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}
fn default_timeout() -> u64 {
    15
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegistrySection {
    /// What to do when a refresh completes after a newer one was requested.
    #[serde(default)]
    pub overlap: OverlapPolicy,
}

/// One `[[sources]]` entry, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceEntry {
    Http {
        id: String,
        url: String,
        /// Single character the body is split on.
        #[serde(default = "default_separator")]
        separator: String,
        /// Bearer token (plaintext, prefer `token_env`).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        /// Environment variable holding the bearer token.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_env: Option<String>,
    },
    Listing {
        id: String,
        #[serde(default)]
        files: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
}

fn default_separator() -> String {
    "\n".into()
}

impl SourceEntry {
    pub fn id(&self) -> &str {
        match self {
            Self::Http { id, .. } | Self::Listing { id, .. } => id,
        }
    }
}

/// Starter file written by `pagewire config init`.
pub const SAMPLE_CONFIG: &str = r#"# pagewire configuration

[http]
connect_timeout = 10   # seconds
timeout = 15
insecure = false

[registry]
overlap = "last-completion-wins"   # or "latest-request-wins"

# [[sources]]
# id = "news"
# kind = "http"
# url = "https://example.com/news.txt"
# separator = "\n"
# token_env = "NEWS_TOKEN"

# [[sources]]
# id = "media"
# kind = "listing"
# files = ["intro.mp4", "logo.png"]
# base_url = "https://cdn.example.com/media/"

# [[bindings]]
# component = "home.news"
# source = "news"
# refresh = { policy = "interval", secs = 60 }
"#;

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "pagewire").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pagewire");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from `path` (a missing file yields defaults) + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Parse a config from TOML text, without consulting the environment.
pub fn parse_config(source: &str) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::string(source))
        .extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent
/// directories as needed.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Copy with plaintext tokens masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for source in &mut copy.sources {
            if let SourceEntry::Http {
                token: Some(token), ..
            } = source
            {
                *token = REDACTED.into();
            }
        }
        copy
    }

    /// Validate and build the runtime configuration, resolving tokens
    /// from the environment.
    pub fn to_context_config(&self) -> Result<ContextConfig, ConfigError> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.sources.len());
        let mut sources = Vec::with_capacity(self.sources.len());

        for entry in &self.sources {
            if seen.contains(&entry.id()) {
                return Err(ConfigError::DuplicateSource {
                    id: entry.id().to_owned(),
                });
            }
            seen.push(entry.id());
            sources.push(source_config(entry)?);
        }

        for binding in &self.bindings {
            if !seen.contains(&binding.source.as_str()) {
                return Err(ConfigError::Validation {
                    field: format!("bindings.{}", binding.component),
                    reason: format!("unknown source '{}'", binding.source),
                });
            }
        }

        Ok(ContextConfig {
            http: self.http.to_settings(),
            overlap: self.registry.overlap,
            sources,
            bindings: self.bindings.clone(),
        })
    }
}

impl HttpSection {
    fn to_settings(&self) -> HttpSettings {
        let tls = if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        HttpSettings {
            tls,
            connect_timeout: Duration::from_secs(self.connect_timeout),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

fn source_config(entry: &SourceEntry) -> Result<SourceConfig, ConfigError> {
    match entry {
        SourceEntry::Http {
            id,
            url,
            separator,
            token,
            token_env,
        } => Ok(SourceConfig::Http {
            id: id.clone(),
            url: parse_url(id, "url", url)?,
            separator: parse_separator(id, separator)?,
            token: resolve_token(id, token.as_deref(), token_env.as_deref())?,
        }),
        SourceEntry::Listing {
            id,
            files,
            base_url,
        } => Ok(SourceConfig::Listing {
            id: id.clone(),
            files: files.clone(),
            base_url: base_url
                .as_deref()
                .map(|raw| parse_url(id, "base_url", raw))
                .transpose()?,
        }),
    }
}

fn parse_url(id: &str, field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: format!("sources.{id}.{field}"),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

fn parse_separator(id: &str, raw: &str) -> Result<char, ConfigError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConfigError::Validation {
            field: format!("sources.{id}.separator"),
            reason: format!("expected exactly one character, got {raw:?}"),
        }),
    }
}

/// Token chain: `token_env` variable first, then the plaintext `token`.
fn resolve_token(
    id: &str,
    token: Option<&str>,
    token_env: Option<&str>,
) -> Result<Option<SecretString>, ConfigError> {
    if let Some(var) = token_env {
        if let Ok(val) = std::env::var(var) {
            return Ok(Some(SecretString::from(val)));
        }
        if token.is_none() {
            return Err(ConfigError::MissingToken {
                id: id.into(),
                var: var.into(),
            });
        }
    }
    Ok(token.map(|t| SecretString::from(t.to_owned())))
}
