// ── Declarative rules ──
//
// A rule is a (trigger, condition, actions) tuple. Rules are authored
// in TOML or JSON and installed into the RuleEngine as a whole set.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::value::Value;
use crate::error::CoreError;

/// One step of a rule's action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Ask the host to show a transient banner.
    ShowBanner { text: String },
    /// Write a StateStore key.
    SetVar { key: String, value: Value },
    /// Refresh a registered data source without waiting for it.
    Refetch { source: String },
    /// Ask the host to open a named menu.
    OpenMenu { name: String },
    /// Ask the host to navigate to a page path.
    Navigate { path: String },
    /// Ask the host to swap the template rendering a component.
    SwapTemplate { component: String, template: String },
}

impl Action {
    /// Stable snake_case tag, matching the serialized `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ShowBanner { .. } => "show_banner",
            Self::SetVar { .. } => "set_var",
            Self::Refetch { .. } => "refetch",
            Self::OpenMenu { .. } => "open_menu",
            Self::Navigate { .. } => "navigate",
            Self::SwapTemplate { .. } => "swap_template",
        }
    }

    pub fn set_var(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::SetVar {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A declarative (trigger, condition, actions) rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Event name this rule reacts to, compared case-insensitively.
    pub on: String,
    /// Optional single-comparison condition; absent means always.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Rule {
    pub fn new(on: impl Into<String>) -> Self {
        Self {
            on: on.into(),
            condition: None,
            actions: Vec::new(),
        }
    }

    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn then(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Whether this rule is triggered by an event called `event_name`.
    pub fn matches(&self, event_name: &str) -> bool {
        self.on.eq_ignore_ascii_case(event_name)
    }
}

/// Supported rule file encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RuleFormat {
    Toml,
    Json,
}

impl RuleFormat {
    /// Guess the format from a file extension; anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// A complete rule file: `[[rules]]` tables in TOML, `{"rules": [...]}` in JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn parse(source: &str, format: RuleFormat) -> Result<Self, CoreError> {
        match format {
            RuleFormat::Toml => toml::from_str(source).map_err(|e| CoreError::InvalidRules {
                message: e.to_string(),
            }),
            RuleFormat::Json => {
                serde_json::from_str(source).map_err(|e| CoreError::InvalidRules {
                    message: e.to_string(),
                })
            }
        }
    }

    pub fn into_rules(self) -> Vec<Rule> {
        self.rules
    }
}
