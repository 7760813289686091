// ── Authoring diagnostics ──
//
// Evaluation swallows every problem; this pass reports them.

use std::fmt;

use serde::Serialize;

use super::{Condition, ExprError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// One finding about a condition expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Report everything that would make `src` evaluate differently from what
/// its author likely intended. An empty result means the expression is clean.
pub fn lint(src: &str) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    let condition = match Condition::parse(src) {
        Ok(condition) => condition,
        Err(err) => {
            out.push(Diagnostic::error(err.to_string()));
            if let ExprError::UnknownOperator(token) = &err {
                if let Some(op) = glued_operator(token) {
                    out.push(Diagnostic::warning(format!(
                        "operator and value must be separated by whitespace: write '{op} {}'",
                        &token[op.len()..]
                    )));
                }
            }
            return out;
        }
    };

    if let Some((leading, _)) = src.split_once("${") {
        if !leading.trim().is_empty() {
            out.push(Diagnostic::warning(format!(
                "text before the variable reference is ignored: '{}'",
                leading.trim()
            )));
        }
    }

    if condition.rhs.contains("${") {
        out.push(Diagnostic::warning(
            "only one variable reference is supported; the right-hand side is compared literally",
        ));
    }

    if ["&&", "||", " and ", " or "]
        .iter()
        .any(|joiner| condition.rhs.contains(joiner))
    {
        out.push(Diagnostic::warning(
            "boolean combinators are not supported; everything after the operator is one value",
        ));
    }

    if condition.op.is_ordering() && condition.rhs.trim().parse::<f64>().is_err() {
        out.push(Diagnostic::error(format!(
            "'{}' needs a numeric value, got '{}'; this condition is always false",
            condition.op, condition.rhs
        )));
    }

    out
}

/// `==1` → `Some("==")` when a known operator is glued to its operand.
fn glued_operator(token: &str) -> Option<&'static str> {
    // Two-character operators first so `<=5` is not read as `<`.
    ["==", "!=", "<=", ">=", "<", ">"]
        .into_iter()
        .find(|op| token.len() > op.len() && token.starts_with(op))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_expression_has_no_findings() {
        assert!(lint("${cart.count} > 0").is_empty());
        assert!(lint(r#"${user.role} == "admin""#).is_empty());
    }

    #[test]
    fn parse_failure_is_an_error() {
        let findings = lint("cart.count > 0");
        assert_eq!(findings.len(), 1);
        assert!(findings[0].is_error());
    }

    #[test]
    fn glued_operator_gets_a_hint() {
        let findings = lint("${n}<=5");
        assert_eq!(findings.len(), 2);
        assert!(findings[0].is_error());
        assert_eq!(findings[1].severity, Severity::Warning);
        assert!(findings[1].message.contains("'<= 5'"));
    }

    #[test]
    fn combinators_are_flagged() {
        let findings = lint("${a} == 1 && ${b} == 2");
        let messages: Vec<&str> = findings.iter().map(|d| d.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("one variable reference")));
        assert!(messages.iter().any(|m| m.contains("combinators")));
        assert!(findings.iter().all(|d| !d.is_error()));
    }

    #[test]
    fn non_numeric_ordering_literal_is_an_error() {
        let findings = lint("${n} > many");
        assert_eq!(findings.len(), 1);
        assert!(findings[0].is_error());
        assert!(findings[0].message.contains("always false"));
    }

    #[test]
    fn leading_text_is_a_warning() {
        let findings = lint("if ${n} > 1");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(
            findings[0].to_string(),
            "warning: text before the variable reference is ignored: 'if'"
        );
    }
}
