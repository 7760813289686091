//! `pagewire run` -- dry-run a rule file against a live context.

use std::sync::Arc;
use std::time::Duration;

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::Tabled;
use tracing::{debug, warn};

use pagewire_core::{
    ActionHandler, AppContext, ContextConfig, DataState, DispatchReport, HandlerCall,
    RecordingHandler, StateSnapshot,
};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::output;

use super::{config_cmd, util};

// ── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct RunReport {
    /// Whether every load settled within `--wait`.
    settled: bool,
    dispatches: Vec<DispatchReport>,
    calls: Vec<HandlerCall>,
    sources: Vec<SourceSummary>,
    state: StateSnapshot,
}

#[derive(Debug, Serialize)]
struct SourceSummary {
    id: String,
    phase: &'static str,
    rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SourceSummary {
    fn new(id: String, state: &DataState) -> Self {
        Self {
            id,
            phase: state.phase(),
            rows: state.rows().map_or(0, |rows| rows.len()),
            error: match state {
                DataState::Error(err) => Some(err.to_string()),
                _ => None,
            },
        }
    }
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct StateRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Type")]
    kind: &'static str,
}

#[derive(Tabled)]
struct DispatchRow {
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Matched")]
    matched: String,
    #[tabled(rename = "Actions")]
    actions: usize,
    #[tabled(rename = "Failures")]
    failures: String,
}

impl From<&DispatchReport> for DispatchRow {
    fn from(r: &DispatchReport) -> Self {
        Self {
            event: r.event.clone(),
            matched: r
                .matched
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            actions: r.actions_run,
            failures: r
                .failures
                .iter()
                .map(|f| format!("#{} {}: {}", f.rule, f.action, f.message))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

#[derive(Tabled)]
struct CallRow {
    #[tabled(rename = "Call")]
    call: &'static str,
    #[tabled(rename = "Detail")]
    detail: String,
}

#[derive(Tabled)]
struct SourceRow {
    #[tabled(rename = "Source")]
    id: String,
    #[tabled(rename = "Phase")]
    phase: &'static str,
    #[tabled(rename = "Rows")]
    rows: usize,
    #[tabled(rename = "Error")]
    error: String,
}

fn detail_view(report: &RunReport, color: bool) -> String {
    let title = |name: &str| {
        if color {
            name.bold().to_string()
        } else {
            name.to_owned()
        }
    };
    let mut sections = Vec::new();

    if !report.dispatches.is_empty() {
        let rows: Vec<DispatchRow> = report.dispatches.iter().map(DispatchRow::from).collect();
        sections.push(format!("{}\n{}", title("Dispatch"), output::render_table(&rows)));
    }
    if !report.calls.is_empty() {
        let rows: Vec<CallRow> = report
            .calls
            .iter()
            .map(|c| CallRow {
                call: c.kind(),
                detail: c.detail(),
            })
            .collect();
        sections.push(format!("{}\n{}", title("Handler calls"), output::render_table(&rows)));
    }
    if !report.sources.is_empty() {
        let rows: Vec<SourceRow> = report
            .sources
            .iter()
            .map(|s| SourceRow {
                id: s.id.clone(),
                phase: s.phase,
                rows: s.rows,
                error: s.error.clone().unwrap_or_default(),
            })
            .collect();
        sections.push(format!("{}\n{}", title("Sources"), output::render_table(&rows)));
    }

    let rows: Vec<StateRow> = report
        .state
        .iter()
        .map(|(key, value)| StateRow {
            key: key.clone(),
            value: value.to_string(),
            kind: value.kind(),
        })
        .collect();
    sections.push(format!("{}\n{}", title("State"), output::render_table(&rows)));

    if !report.settled {
        let note = "(some loads did not settle before --wait elapsed)";
        sections.push(if color {
            note.yellow().to_string()
        } else {
            note.to_owned()
        });
    }
    sections.join("\n\n")
}

fn plain_view(report: &RunReport) -> String {
    report
        .state
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let rules = util::read_rules(&args.file, args.format)?;
    let config = if args.no_config {
        ContextConfig::default()
    } else {
        config_cmd::load(global)?.to_context_config()?
    };
    let wait: Duration = args.wait.into();

    let handler = Arc::new(RecordingHandler::new());
    let ctx = AppContext::new(config, Arc::clone(&handler) as Arc<dyn ActionHandler>)?;
    ctx.engine().set_rules(rules);
    ctx.store().set_all(args.sets);
    ctx.start()?;

    let mut settled = true;
    let mut dispatches = Vec::with_capacity(args.events.len());
    for event in &args.events {
        debug!(%event, "emitting");
        dispatches.push(ctx.emit(event));
        if !ctx.wait_settled(wait).await {
            warn!(%event, wait = %args.wait, "data loads still pending");
            settled = false;
        }
    }
    ctx.shutdown().await;

    let registry = ctx.registry();
    let report = RunReport {
        settled,
        dispatches,
        calls: handler.take(),
        sources: registry
            .source_ids()
            .into_iter()
            .map(|id| {
                let state = registry.current(&id);
                SourceSummary::new(id, &state)
            })
            .collect(),
        state: ctx.store().snapshot().as_ref().clone(),
    };

    let color = output::should_color_stdout(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| detail_view(r, color),
        plain_view,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
