// ── Rule condition language ──
//
// Exactly one comparison per expression:
//
//     ${<key>} <op> <rhs>
//
// `<op>` is one of `== != < > <= >=`, `<rhs>` is a bare token or a
// double-quoted string. Evaluation is fail-closed: anything that cannot
// be parsed or compared yields `false`. Rule authors get typed errors
// through `Condition::parse` and `lint` instead.

mod lint;

use std::cmp::Ordering;

use strum::{Display, EnumString};
use thiserror::Error;
use tracing::debug;

use crate::model::Value;
use crate::model::value::parse_bool;
use crate::store::StateStore;

pub use lint::{Diagnostic, Severity, lint};

/// Why an expression could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("expression has no ${{...}} variable reference")]
    MissingVariable,

    #[error("variable reference is missing its closing '}}'")]
    UnterminatedVariable,

    #[error("variable reference has an empty key")]
    EmptyKey,

    #[error("expected an operator after the variable reference")]
    MissingOperator,

    #[error("unknown operator '{0}' (expected one of == != < > <= >=)")]
    UnknownOperator(String),

    #[error("expected a value after operator '{0}'")]
    MissingOperand(CompareOp),
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum CompareOp {
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">=")]
    Ge,
}

impl CompareOp {
    /// Ordering operators require both sides to be numeric.
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Gt | Self::Le | Self::Ge)
    }
}

/// A parsed single-comparison condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub key: String,
    pub op: CompareOp,
    /// Right-hand side with surrounding quotes removed.
    pub rhs: String,
    /// Whether the right-hand side was written as a quoted string.
    pub quoted: bool,
}

impl Condition {
    /// Parse `src`. Text before `${` is ignored; after the closing `}` the
    /// first whitespace-delimited token is the operator and the trimmed
    /// remainder is the right-hand side.
    pub fn parse(src: &str) -> Result<Self, ExprError> {
        let (_, after) = src.split_once("${").ok_or(ExprError::MissingVariable)?;
        let (key, rest) = after
            .split_once('}')
            .ok_or(ExprError::UnterminatedVariable)?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ExprError::EmptyKey);
        }

        let rest = rest.trim_start();
        let (op_token, rhs) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(op, rhs)| (op, rhs.trim()));
        if op_token.is_empty() {
            return Err(ExprError::MissingOperator);
        }
        let op: CompareOp = op_token
            .parse()
            .map_err(|_| ExprError::UnknownOperator(op_token.to_owned()))?;

        if rhs.is_empty() {
            return Err(ExprError::MissingOperand(op));
        }
        let (rhs, quoted) = strip_quotes(rhs);

        Ok(Self {
            key: key.to_owned(),
            op,
            rhs: rhs.to_owned(),
            quoted,
        })
    }

    /// Evaluate against the current value of `self.key` in `store`.
    pub fn evaluate(&self, store: &StateStore) -> bool {
        self.evaluate_with(store.get(&self.key).as_ref())
    }

    /// Evaluate against an explicit left-hand side. An absent left-hand side
    /// is `false` for every operator.
    pub fn evaluate_with(&self, lhs: Option<&Value>) -> bool {
        let Some(lhs) = lhs else {
            return false;
        };

        match self.op {
            CompareOp::Eq => loosely_equal(lhs, &self.rhs),
            CompareOp::Ne => !loosely_equal(lhs, &self.rhs),
            CompareOp::Lt | CompareOp::Gt | CompareOp::Le | CompareOp::Ge => {
                let (Some(left), Ok(right)) = (lhs.as_number(), self.rhs.trim().parse::<f64>())
                else {
                    return false;
                };
                let ord = left.partial_cmp(&right);
                match self.op {
                    CompareOp::Lt => ord == Some(Ordering::Less),
                    CompareOp::Gt => ord == Some(Ordering::Greater),
                    CompareOp::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
                    _ => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
                }
            }
        }
    }
}

/// Parse and evaluate `src` against `store`, failing closed.
pub fn eval(src: &str, store: &StateStore) -> bool {
    match Condition::parse(src) {
        Ok(condition) => condition.evaluate(store),
        Err(err) => {
            debug!(expression = src, error = %err, "condition did not parse; treating as false");
            false
        }
    }
}

/// Equality as rule authors expect it.
///
/// Numbers compare numerically when the literal is numeric, booleans
/// compare against a `true`/`false` literal, and everything else compares
/// by display text. A text value `"5"` therefore equals the literal `5`.
fn loosely_equal(lhs: &Value, rhs: &str) -> bool {
    match lhs {
        Value::Number(n) => {
            if let Ok(r) = rhs.trim().parse::<f64>() {
                return n.partial_cmp(&r) == Some(Ordering::Equal);
            }
        }
        Value::Bool(b) => {
            if let Some(r) = parse_bool(rhs) {
                return *b == r;
            }
        }
        Value::Text(_) => {}
    }
    lhs.to_string() == rhs
}

fn strip_quotes(raw: &str) -> (&str, bool) {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map_or((raw, false), |inner| (inner, true))
}
