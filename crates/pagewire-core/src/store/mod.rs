// ── Observable state store ──
//
// String-keyed value map with push-based change notification.

mod state_store;

pub use state_store::{StateSnapshot, StateStore};
