// ── Data layer ──
//
// Named asynchronous sources, their lifecycle states, and the registry
// that drives refreshes.

pub mod http;
pub mod listing;
pub mod registry;
pub mod source;
pub mod state;

pub use http::HttpTextSource;
pub use listing::{FileKind, StaticListingSource};
pub use registry::{DataRegistry, OverlapPolicy};
pub use source::{DataSource, FnSource, source_fn};
pub use state::{DataState, LoadError};
