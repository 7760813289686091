//! Reactive core behind a page-builder UI.
//!
//! This crate owns the pieces a declarative page needs at runtime, without
//! any widget toolkit:
//!
//! - **[`StateStore`]** — observable string-keyed value map built on a
//!   `tokio::sync::watch` snapshot. Every write is visible to
//!   [`StateStream`] subscribers; bulk writes notify once.
//!
//! - **[`expr`]** — the one-comparison condition language
//!   (`${cart.count} > 0`). [`expr::eval`] fails closed; [`expr::lint`]
//!   explains why a condition would never match.
//!
//! - **[`DataRegistry`]** — named asynchronous [`DataSource`]s, each with an
//!   observable [`DataState`] (Idle / Loading / Success / Empty / Error).
//!   Built-in sources fetch remote text through `pagewire-api` or expose a
//!   static file listing.
//!
//! - **[`RuleEngine`]** — matches [`Event`]s against installed [`Rule`]s and
//!   dispatches their [`Action`]s to the store, the registry, or the host's
//!   [`ActionHandler`].
//!
//! - **[`AppContext`]** — owns one of each plus the background tasks that
//!   drive component [`Binding`]s, with explicit `start()` / `shutdown()`.

pub mod config;
pub mod context;
pub mod data;
pub mod engine;
pub mod error;
pub mod expr;
pub mod model;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ContextConfig, HttpSettings, SourceConfig, TlsVerification};
pub use context::AppContext;
pub use data::{
    DataRegistry, DataSource, DataState, FileKind, HttpTextSource, LoadError, OverlapPolicy,
    StaticListingSource, source_fn,
};
pub use engine::{
    ActionError, ActionFailure, ActionHandler, DispatchReport, HandlerCall, NoopHandler,
    RecordingHandler, RuleEngine,
};
pub use error::CoreError;
pub use expr::{Condition, Diagnostic, ExprError, Severity};
pub use store::{StateSnapshot, StateStore};
pub use stream::{DataStateStream, StateStream, Subscription};

// Re-export model types at the crate root for ergonomics.
pub use model::{Action, Binding, Event, RefreshPolicy, Row, Rule, RuleFormat, RuleSet, Value};
