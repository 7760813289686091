// ── DataRegistry ──
//
// Named data sources plus one observable lifecycle state per id.
// Refreshes run as independent Tokio tasks; nothing is cancelled.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::source::DataSource;
use super::state::{DataState, LoadError};
use crate::error::CoreError;
use crate::stream::DataStateStream;

/// What happens when a refresh completes after a newer refresh of the
/// same source was requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Every completion publishes; the last one to finish wins.
    #[default]
    LastCompletionWins,
    /// Completions of superseded requests are discarded.
    LatestRequestWins,
}

/// Per-id observable state.
struct Slot {
    state: watch::Sender<DataState>,
    /// Bumped on every refresh request.
    generation: AtomicU64,
    last_completed: watch::Sender<Option<DateTime<Utc>>>,
}

impl Slot {
    fn new() -> Self {
        let (state, _) = watch::channel(DataState::Idle);
        let (last_completed, _) = watch::channel(None);
        Self {
            state,
            generation: AtomicU64::new(0),
            last_completed,
        }
    }
}

/// Registry of named asynchronous data sources.
pub struct DataRegistry {
    sources: DashMap<String, Arc<dyn DataSource>>,
    slots: DashMap<String, Arc<Slot>>,
    overlap: OverlapPolicy,
}

impl DataRegistry {
    pub fn new() -> Self {
        Self::with_overlap(OverlapPolicy::default())
    }

    pub fn with_overlap(overlap: OverlapPolicy) -> Self {
        Self {
            sources: DashMap::new(),
            slots: DashMap::new(),
            overlap,
        }
    }

    pub fn overlap(&self) -> OverlapPolicy {
        self.overlap
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Bind `id` to `source`, replacing any previous binding. The id's
    /// current state is left as is.
    pub fn register(&self, id: impl Into<String>, source: impl DataSource + 'static) {
        self.register_shared(id, Arc::new(source));
    }

    pub fn register_shared(&self, id: impl Into<String>, source: Arc<dyn DataSource>) {
        let id = id.into();
        debug!(source = %id, "data source registered");
        self.sources.insert(id, source);
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sources.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Subscribe to the lifecycle of `id`, creating an Idle entry if the
    /// id has never been seen.
    pub fn state_of(&self, id: &str) -> DataStateStream {
        DataStateStream::new(self.slot(id).state.subscribe())
    }

    /// Point-in-time state of `id`; Idle for unseen ids.
    pub fn current(&self, id: &str) -> DataState {
        self.slots
            .get(id)
            .map(|slot| slot.state.borrow().clone())
            .unwrap_or_default()
    }

    /// When the last load of `id` completed, if ever.
    pub fn last_completed(&self, id: &str) -> Option<DateTime<Utc>> {
        self.slots
            .get(id)
            .and_then(|slot| *slot.last_completed.borrow())
    }

    /// `true` when no known source is currently loading.
    pub fn is_settled(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| !slot.state.borrow().is_loading())
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Start loading `id`.
    ///
    /// Publishes `Loading` immediately, then spawns the load on the current
    /// Tokio runtime and publishes its outcome when it finishes. An id with
    /// no registered source is left untouched and reported as
    /// [`CoreError::SourceNotFound`].
    pub fn refresh(&self, id: &str) -> Result<JoinHandle<()>, CoreError> {
        let Some(source) = self.sources.get(id).map(|s| Arc::clone(s.value())) else {
            warn!(source = id, "refresh requested for unregistered data source");
            return Err(CoreError::SourceNotFound { id: id.to_owned() });
        };
        let runtime = Handle::try_current().map_err(|_| CoreError::NoRuntime {
            operation: format!("refresh '{id}'"),
        })?;

        let slot = self.slot(id);
        let generation = slot.generation.fetch_add(1, Ordering::SeqCst) + 1;
        slot.state.send_replace(DataState::Loading);
        debug!(source = id, generation, "refresh started");

        let overlap = self.overlap;
        let id = id.to_owned();
        Ok(runtime.spawn(async move {
            // `load()` itself may panic before returning a future.
            let load = AssertUnwindSafe(async { source.load().await });
            let outcome = match load.catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(LoadError::Aborted(panic_message(panic.as_ref()))),
            };

            if let Err(err) = &outcome {
                warn!(source = %id, error = %err, "data source load failed");
            }

            if overlap == OverlapPolicy::LatestRequestWins
                && slot.generation.load(Ordering::SeqCst) != generation
            {
                debug!(source = %id, generation, "discarding superseded load");
                return;
            }

            let next = DataState::from_outcome(outcome);
            debug!(source = %id, generation, phase = next.phase(), "refresh finished");
            slot.state.send_replace(next);
            slot.last_completed.send_replace(Some(Utc::now()));
        }))
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn slot(&self, id: &str) -> Arc<Slot> {
        if let Some(slot) = self.slots.get(id) {
            return Arc::clone(slot.value());
        }
        Arc::clone(
            self.slots
                .entry(id.to_owned())
                .or_insert_with(|| Arc::new(Slot::new()))
                .value(),
        )
    }
}

impl Default for DataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "data source panicked".to_owned()
    }
}
