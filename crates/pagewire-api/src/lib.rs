// pagewire-api: HTTP transport for remote pagewire data sources.

pub mod error;
pub mod text;
pub mod transport;

pub use error::Error;
pub use text::TextClient;
pub use transport::{TlsMode, TransportConfig};
