//! Command handlers, one module per subcommand.

pub mod config_cmd;
pub mod eval;
pub mod lint;
pub mod run;
pub mod util;
