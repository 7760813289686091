// ── Data source lifecycle ──

use std::sync::Arc;

use thiserror::Error;

use crate::model::Row;

/// Why a data source failed to load. Cloneable so it can live inside
/// [`DataState`] and be observed by any number of subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The remote request failed (transport, status, timeout).
    #[error("request failed: {message}")]
    Request { message: String, transient: bool },

    /// The source itself reported a failure.
    #[error("{0}")]
    Source(String),

    /// The load task panicked or was aborted before completing.
    #[error("load aborted: {0}")]
    Aborted(String),
}

impl LoadError {
    pub fn source_failure(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Request { transient: true, .. })
    }
}

impl From<pagewire_api::Error> for LoadError {
    fn from(err: pagewire_api::Error) -> Self {
        Self::Request {
            transient: err.is_transient(),
            message: err.to_string(),
        }
    }
}

/// Message attached to [`DataState::Empty`] when a load yields no rows.
pub const EMPTY_MESSAGE: &str = "no data";

/// Current load phase of one data source.
///
/// Transitions: `Idle → Loading` on refresh, `Loading → Success | Empty |
/// Error` on completion, any state `→ Loading` on a new refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DataState {
    #[default]
    Idle,
    Loading,
    Success(Arc<Vec<Row>>),
    Empty(String),
    Error(LoadError),
}

impl DataState {
    /// Map a finished load onto its terminal state.
    pub fn from_outcome(outcome: Result<Vec<Row>, LoadError>) -> Self {
        match outcome {
            Ok(rows) if rows.is_empty() => Self::Empty(EMPTY_MESSAGE.to_owned()),
            Ok(rows) => Self::Success(Arc::new(rows)),
            Err(err) => Self::Error(err),
        }
    }

    /// `true` for Success, Empty, and Error.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Empty(_) | Self::Error(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn rows(&self) -> Option<&Arc<Vec<Row>>> {
        match self {
            Self::Success(rows) => Some(rows),
            _ => None,
        }
    }

    /// Lowercase phase name, as published under `<component>.status`.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success(_) => "success",
            Self::Empty(_) => "empty",
            Self::Error(_) => "error",
        }
    }
}
