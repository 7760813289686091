//! `pagewire eval` -- evaluate one condition.

use owo_colors::OwoColorize;
use serde::Serialize;

use pagewire_core::expr;
use pagewire_core::{Diagnostic, Severity, StateStore};

use crate::cli::{EvalArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Evaluation {
    expression: String,
    result: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<Diagnostic>,
}

fn detail_view(evaluation: &Evaluation, color: bool) -> String {
    let result = evaluation.result.to_string();
    let mut text = match (color, evaluation.result) {
        (false, _) => result,
        (true, true) => result.green().to_string(),
        (true, false) => result.red().to_string(),
    };
    for d in &evaluation.diagnostics {
        let line = format!("  {d}");
        text.push('\n');
        if !color {
            text.push_str(&line);
        } else if d.severity == Severity::Error {
            text.push_str(&line.red().to_string());
        } else {
            text.push_str(&line.yellow().to_string());
        }
    }
    text
}

pub fn handle(args: EvalArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = StateStore::new();
    store.set_all(args.sets);

    let evaluation = Evaluation {
        result: expr::eval(&args.expression, &store),
        diagnostics: expr::lint(&args.expression),
        expression: args.expression,
    };

    let color = output::should_color_stdout(&global.color);
    let out = output::render_single(
        &global.output,
        &evaluation,
        |e| detail_view(e, color),
        |e| e.result.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
