// ── Domain model ──
//
// Plain data types shared by the store, the registry, and the engine.

pub mod binding;
pub mod event;
pub mod row;
pub mod rule;
pub mod value;

pub use binding::{Binding, RefreshPolicy};
pub use event::Event;
pub use row::Row;
pub use rule::{Action, Rule, RuleFormat, RuleSet};
pub use value::Value;
