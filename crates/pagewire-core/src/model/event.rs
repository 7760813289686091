// ── Dispatchable events ──
//
// Events are ephemeral: they are matched against rules and dropped.

use std::fmt;

/// Canonical event names, as written in a rule's `on` field.
pub mod names {
    pub const ON_LOAD_SUCCESS: &str = "onLoadSuccess";
    pub const ON_LOAD_ERROR: &str = "onLoadError";
    pub const ON_CHANGE: &str = "onChange";
    pub const ON_ENTER_PAGE: &str = "onEnterPage";
}

/// An event emitted by the host UI or by a data binding.
///
/// Every variant carries an optional path naming the component or page
/// the event concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    OnLoadSuccess { path: Option<String> },
    OnLoadError { path: Option<String> },
    OnChange { path: Option<String> },
    OnEnterPage { path: Option<String> },
    Custom { name: String, path: Option<String> },
}

impl Event {
    /// A custom event with no path.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom {
            name: name.into(),
            path: None,
        }
    }

    /// Build an event from a name, mapping canonical names (any case) to
    /// their dedicated variants and everything else to `Custom`.
    pub fn named(name: &str, path: Option<String>) -> Self {
        if name.eq_ignore_ascii_case(names::ON_LOAD_SUCCESS) {
            Self::OnLoadSuccess { path }
        } else if name.eq_ignore_ascii_case(names::ON_LOAD_ERROR) {
            Self::OnLoadError { path }
        } else if name.eq_ignore_ascii_case(names::ON_CHANGE) {
            Self::OnChange { path }
        } else if name.eq_ignore_ascii_case(names::ON_ENTER_PAGE) {
            Self::OnEnterPage { path }
        } else {
            Self::Custom {
                name: name.to_owned(),
                path,
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::OnLoadSuccess { .. } => names::ON_LOAD_SUCCESS,
            Self::OnLoadError { .. } => names::ON_LOAD_ERROR,
            Self::OnChange { .. } => names::ON_CHANGE,
            Self::OnEnterPage { .. } => names::ON_ENTER_PAGE,
            Self::Custom { name, .. } => name,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Self::OnLoadSuccess { path }
            | Self::OnLoadError { path }
            | Self::OnChange { path }
            | Self::OnEnterPage { path }
            | Self::Custom { path, .. } => path.as_deref(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path() {
            Some(path) => write!(f, "{}@{path}", self.name()),
            None => f.write_str(self.name()),
        }
    }
}
