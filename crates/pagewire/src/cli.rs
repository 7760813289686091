//! Clap derive structures for the `pagewire` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use pagewire_core::{Event, RuleFormat, Value};

use crate::commands::util;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pagewire -- check and dry-run page-builder rules
#[derive(Debug, Parser)]
#[command(
    name = "pagewire",
    version,
    about = "Lint, evaluate, and dry-run page-builder rules",
    long_about = "Works with the rule files that drive a page-builder UI.\n\n\
        Rules react to events (onLoadSuccess, onChange, ...), test a single\n\
        `${key} <op> value` condition against the state store, and run actions.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "PAGEWIRE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PAGEWIRE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Rule file encoding override.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RuleFileFormat {
    Toml,
    Json,
}

impl From<RuleFileFormat> for RuleFormat {
    fn from(f: RuleFileFormat) -> Self {
        match f {
            RuleFileFormat::Toml => RuleFormat::Toml,
            RuleFileFormat::Json => RuleFormat::Json,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a rule file: syntax, conditions, and actions
    #[command(alias = "check")]
    Lint(LintArgs),

    /// Evaluate one condition against a throwaway state store
    Eval(EvalArgs),

    /// Load a rule file, emit events, and show what happened
    Run(RunArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Lint ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LintArgs {
    /// Rule file (.toml or .json)
    pub file: PathBuf,

    /// Override the format guessed from the file extension
    #[arg(long)]
    pub format: Option<RuleFileFormat>,
}

// ── Eval ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EvalArgs {
    /// Condition, e.g. '${cart.count} > 0'
    pub expression: String,

    /// Seed the store (repeatable): key=value
    #[arg(
        long = "set",
        short = 's',
        value_name = "KEY=VALUE",
        value_parser = util::parse_assignment
    )]
    pub sets: Vec<(String, Value)>,
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Rule file (.toml or .json)
    pub file: PathBuf,

    /// Override the format guessed from the file extension
    #[arg(long)]
    pub format: Option<RuleFileFormat>,

    /// Seed the store before any event (repeatable): key=value
    #[arg(
        long = "set",
        short = 's',
        value_name = "KEY=VALUE",
        value_parser = util::parse_assignment
    )]
    pub sets: Vec<(String, Value)>,

    /// Emit an event, in order (repeatable): name[@path]
    #[arg(long = "emit", short = 'e', value_name = "NAME[@PATH]", value_parser = util::parse_event)]
    pub events: Vec<Event>,

    /// How long to wait for data loads to settle
    #[arg(long, default_value = "2s")]
    pub wait: humantime::Duration,

    /// Ignore the config file (no sources, no bindings)
    #[arg(long)]
    pub no_config: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the effective configuration (tokens masked)
    Show,

    /// Write a starter config file
    Init,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
