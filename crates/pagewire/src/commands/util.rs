//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use pagewire_core::{Event, Rule, RuleFormat, RuleSet, Value};

use crate::cli::RuleFileFormat;
use crate::error::CliError;

/// Parse a `key=value` flag. The value's type is inferred (`true`, `3.5`,
/// anything else is text).
pub fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_owned(), Value::infer(value)))
}

/// Parse an `--emit` flag: `name` or `name@path`.
pub fn parse_event(raw: &str) -> Result<Event, String> {
    let (name, path) = match raw.split_once('@') {
        Some((name, path)) => {
            if path.is_empty() {
                return Err(format!("empty path in '{raw}'"));
            }
            (name, Some(path.to_owned()))
        }
        None => (raw, None),
    };
    if name.trim().is_empty() {
        return Err(format!("empty event name in '{raw}'"));
    }
    Ok(Event::named(name.trim(), path))
}

/// Read and parse a rule file.
pub fn read_rules(path: &Path, format: Option<RuleFileFormat>) -> Result<Vec<Rule>, CliError> {
    let source = std::fs::read_to_string(path)?;
    let format = format.map_or_else(|| RuleFormat::from_path(path), RuleFormat::from);
    let set = RuleSet::parse(&source, format).map_err(|e| CliError::InvalidRules {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(set.into_rules())
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
/// Without a terminal to ask on, the answer is no.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Ok(false);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}
