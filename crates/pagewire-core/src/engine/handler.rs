// ── Host action handler ──
//
// UI-facing actions (banners, menus, navigation, template swaps) are
// delegated to whatever the host plugs in here.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use thiserror::Error;

/// Why a host refused or failed to perform an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The host has no target with this name (menu, page, component).
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    /// The host refused the action.
    #[error("rejected: {0}")]
    Rejected(String),

    /// `refetch` could not start its refresh.
    #[error("refresh failed: {0}")]
    Refresh(String),
}

/// Host callbacks for the actions the engine cannot perform itself.
///
/// Called synchronously from [`RuleEngine::emit`](super::RuleEngine::emit);
/// implementations should return quickly.
pub trait ActionHandler: Send + Sync {
    fn show_banner(&self, text: &str) -> Result<(), ActionError>;
    fn open_menu(&self, name: &str) -> Result<(), ActionError>;
    fn navigate(&self, path: &str) -> Result<(), ActionError>;
    fn swap_template(&self, component: &str, template: &str) -> Result<(), ActionError>;
}

/// Accepts every action and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl ActionHandler for NoopHandler {
    fn show_banner(&self, _text: &str) -> Result<(), ActionError> {
        Ok(())
    }

    fn open_menu(&self, _name: &str) -> Result<(), ActionError> {
        Ok(())
    }

    fn navigate(&self, _path: &str) -> Result<(), ActionError> {
        Ok(())
    }

    fn swap_template(&self, _component: &str, _template: &str) -> Result<(), ActionError> {
        Ok(())
    }
}

/// One call received by a [`RecordingHandler`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum HandlerCall {
    ShowBanner { text: String },
    OpenMenu { name: String },
    Navigate { path: String },
    SwapTemplate { component: String, template: String },
}

impl HandlerCall {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ShowBanner { .. } => "show_banner",
            Self::OpenMenu { .. } => "open_menu",
            Self::Navigate { .. } => "navigate",
            Self::SwapTemplate { .. } => "swap_template",
        }
    }

    /// The call's arguments joined for display.
    pub fn detail(&self) -> String {
        match self {
            Self::ShowBanner { text } => text.clone(),
            Self::OpenMenu { name } => name.clone(),
            Self::Navigate { path } => path.clone(),
            Self::SwapTemplate {
                component,
                template,
            } => format!("{component} -> {template}"),
        }
    }
}

/// Records every call in order. Menus and pages listed via
/// [`reject_target`](Self::reject_target) fail with
/// [`ActionError::UnknownTarget`].
#[derive(Debug, Default)]
pub struct RecordingHandler {
    calls: Mutex<Vec<HandlerCall>>,
    rejected: Vec<String>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any `open_menu`, `navigate`, or `swap_template` aimed at `target`.
    pub fn reject_target(mut self, target: impl Into<String>) -> Self {
        self.rejected.push(target.into());
        self
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> Vec<HandlerCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the recorded calls.
    pub fn take(&self) -> Vec<HandlerCall> {
        std::mem::take(&mut *self.calls.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn check(&self, target: &str) -> Result<(), ActionError> {
        if self.rejected.iter().any(|r| r == target) {
            Err(ActionError::UnknownTarget(target.to_owned()))
        } else {
            Ok(())
        }
    }

    fn record(&self, call: HandlerCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl ActionHandler for RecordingHandler {
    fn show_banner(&self, text: &str) -> Result<(), ActionError> {
        self.record(HandlerCall::ShowBanner { text: text.into() });
        Ok(())
    }

    fn open_menu(&self, name: &str) -> Result<(), ActionError> {
        self.check(name)?;
        self.record(HandlerCall::OpenMenu { name: name.into() });
        Ok(())
    }

    fn navigate(&self, path: &str) -> Result<(), ActionError> {
        self.check(path)?;
        self.record(HandlerCall::Navigate { path: path.into() });
        Ok(())
    }

    fn swap_template(&self, component: &str, template: &str) -> Result<(), ActionError> {
        self.check(component)?;
        self.record(HandlerCall::SwapTemplate {
            component: component.into(),
            template: template.into(),
        });
        Ok(())
    }
}
