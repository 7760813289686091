// ── Rule engine ──
//
// Matches emitted events against the installed rules and runs the
// actions of every rule whose condition holds.

mod handler;

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::data::DataRegistry;
use crate::error::CoreError;
use crate::expr;
use crate::model::{Action, Event, Rule};
use crate::store::StateStore;

pub use handler::{ActionError, ActionHandler, HandlerCall, NoopHandler, RecordingHandler};

/// An action that failed during dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionFailure {
    /// Index of the rule in the installed list.
    pub rule: usize,
    /// Action tag, e.g. `navigate`.
    pub action: String,
    pub message: String,
}

/// Outcome of one [`RuleEngine::emit`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub event: String,
    /// Indices of rules whose trigger and condition matched.
    pub matched: Vec<usize>,
    /// Actions that ran to completion.
    pub actions_run: usize,
    pub failures: Vec<ActionFailure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Event-driven dispatcher over a swappable rule list.
pub struct RuleEngine {
    rules: ArcSwap<Vec<Rule>>,
    store: Arc<StateStore>,
    registry: Arc<DataRegistry>,
    handler: Arc<dyn ActionHandler>,
}

impl RuleEngine {
    pub fn new(
        store: Arc<StateStore>,
        registry: Arc<DataRegistry>,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        Self {
            rules: ArcSwap::from_pointee(Vec::new()),
            store,
            registry,
            handler,
        }
    }

    /// Replace the installed rules as a whole. An `emit` already in
    /// progress finishes against the list it started with.
    pub fn set_rules(&self, rules: Vec<Rule>) {
        info!(count = rules.len(), "rules installed");
        self.rules.store(Arc::new(rules));
    }

    pub fn rules(&self) -> Arc<Vec<Rule>> {
        self.rules.load_full()
    }

    /// Dispatch `event` to every matching rule, in installed order.
    ///
    /// A failing action stops the remaining actions of its rule; later
    /// rules still run.
    pub fn emit(&self, event: &Event) -> DispatchReport {
        let rules = self.rules.load_full();
        let name = event.name();
        let mut report = DispatchReport {
            event: event.to_string(),
            ..DispatchReport::default()
        };

        for (index, rule) in rules.iter().enumerate() {
            if !rule.matches(name) {
                continue;
            }
            if let Some(condition) = &rule.condition {
                if !expr::eval(condition, &self.store) {
                    debug!(rule = index, %event, condition, "condition false, rule skipped");
                    continue;
                }
            }

            debug!(rule = index, %event, actions = rule.actions.len(), "rule matched");
            report.matched.push(index);

            for action in &rule.actions {
                match self.run(action) {
                    Ok(()) => report.actions_run += 1,
                    Err(err) => {
                        warn!(
                            rule = index,
                            action = action.kind(),
                            error = %err,
                            "action failed, skipping rest of rule"
                        );
                        report.failures.push(ActionFailure {
                            rule: index,
                            action: action.kind().to_owned(),
                            message: err.to_string(),
                        });
                        break;
                    }
                }
            }
        }

        report
    }

    fn run(&self, action: &Action) -> Result<(), ActionError> {
        match action {
            Action::SetVar { key, value } => {
                self.store.set(key.clone(), value.clone());
                Ok(())
            }
            Action::Refetch { source } => match self.registry.refresh(source) {
                // Fire and forget: the load publishes its own outcome.
                Ok(_handle) => Ok(()),
                // Already logged by the registry; an unknown id is a no-op.
                Err(CoreError::SourceNotFound { .. }) => Ok(()),
                Err(err) => Err(ActionError::Refresh(err.to_string())),
            },
            Action::ShowBanner { text } => self.handler.show_banner(text),
            Action::OpenMenu { name } => self.handler.open_menu(name),
            Action::Navigate { path } => self.handler.navigate(path),
            Action::SwapTemplate {
                component,
                template,
            } => self.handler.swap_template(component, template),
        }
    }
}
