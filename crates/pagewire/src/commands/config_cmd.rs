//! Config subcommand handlers.

use std::path::PathBuf;

use pagewire_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Helpers ─────────────────────────────────────────────────────────

/// Config file in effect: `--config` / `PAGEWIRE_CONFIG`, else the
/// platform default.
pub fn path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config::config_path)
}

/// Load the effective configuration (file + environment).
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(config::load_config_from(&path(global))?)
}

fn show_table(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# failed to render config: {e}"))
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&path(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = load(global)?.redacted();
            let out = output::render_single(&global.output, &cfg, show_table, show_table)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init => {
            let path = path(global);
            if path.exists()
                && !util::confirm(
                    &format!("Overwrite {}?", path.display()),
                    global.yes,
                )?
            {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, config::SAMPLE_CONFIG)?;
            if !global.quiet {
                eprintln!("Wrote {}", path.display());
            }
            Ok(())
        }
    }
}
