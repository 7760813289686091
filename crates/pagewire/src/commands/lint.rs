//! `pagewire lint` -- static checks over a rule file.

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::Tabled;

use pagewire_core::expr;
use pagewire_core::{Action, Diagnostic, Rule, Severity};

use crate::cli::{GlobalOpts, LintArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Findings ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Finding {
    rule: usize,
    on: String,
    #[serde(flatten)]
    diagnostic: Diagnostic,
}

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Rule")]
    rule: usize,
    #[tabled(rename = "On")]
    on: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&Finding> for FindingRow {
    fn from(f: &Finding) -> Self {
        Self {
            rule: f.rule,
            on: f.on.clone(),
            severity: f.diagnostic.severity.to_string(),
            message: f.diagnostic.message.clone(),
        }
    }
}

/// Everything suspicious about one rule: its trigger, its condition, and
/// actions that can never do anything.
fn check_rule(rule: &Rule) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    if rule.on.trim().is_empty() {
        out.push(Diagnostic::error("rule has an empty 'on' trigger"));
    }
    if let Some(condition) = &rule.condition {
        out.extend(expr::lint(condition));
    }
    if rule.actions.is_empty() {
        out.push(Diagnostic::warning("rule has no actions"));
    }

    for action in &rule.actions {
        let empty = match action {
            Action::SetVar { key, .. } => key.trim().is_empty(),
            Action::Refetch { source } => source.trim().is_empty(),
            Action::OpenMenu { name } => name.trim().is_empty(),
            Action::Navigate { path } => path.trim().is_empty(),
            Action::SwapTemplate {
                component,
                template,
            } => component.trim().is_empty() || template.trim().is_empty(),
            Action::ShowBanner { .. } => false,
        };
        if empty {
            out.push(Diagnostic::error(format!(
                "'{}' action is missing its target",
                action.kind()
            )));
        }
    }
    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &LintArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let rules = util::read_rules(&args.file, args.format)?;

    let findings: Vec<Finding> = rules
        .iter()
        .enumerate()
        .flat_map(|(index, rule)| {
            check_rule(rule).into_iter().map(move |diagnostic| Finding {
                rule: index,
                on: rule.on.clone(),
                diagnostic,
            })
        })
        .collect();

    let errors = findings
        .iter()
        .filter(|f| f.diagnostic.severity == Severity::Error)
        .count();
    let warnings = findings.len() - errors;

    if !findings.is_empty() {
        let out = output::render_list(
            &global.output,
            &findings,
            |f| FindingRow::from(f),
            |f| format!("{}:{}: {}", args.file.display(), f.rule, f.diagnostic),
        )?;
        output::print_output(&out, global.quiet);
    }

    if !global.quiet {
        let summary = format!(
            "{} rule(s), {errors} error(s), {warnings} warning(s)",
            rules.len()
        );
        if !output::should_color(&global.color) {
            eprintln!("{summary}");
        } else if errors > 0 {
            eprintln!("{}", summary.red());
        } else if warnings > 0 {
            eprintln!("{}", summary.yellow());
        } else {
            eprintln!("{}", summary.green());
        }
    }

    if errors > 0 {
        return Err(CliError::LintFailed { errors });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_rule_has_no_findings() {
        let rule = Rule::new("onChange")
            .when("${n} > 0")
            .then(Action::set_var("flag", "1"));
        assert!(check_rule(&rule).is_empty());
    }

    #[test]
    fn empty_targets_and_missing_actions_are_reported() {
        let rule = Rule::new(" ");
        let found = check_rule(&rule);
        assert!(found.iter().any(Diagnostic::is_error));
        assert!(found.iter().any(|d| d.severity == Severity::Warning));

        let rule = Rule::new("onChange").then(Action::Refetch {
            source: String::new(),
        });
        assert_eq!(check_rule(&rule).len(), 1);
    }

    #[test]
    fn bad_condition_surfaces_expression_errors() {
        let rule = Rule::new("onChange")
            .when("${n} ~ 3")
            .then(Action::set_var("flag", "1"));
        assert!(check_rule(&rule).iter().any(Diagnostic::is_error));
    }
}
