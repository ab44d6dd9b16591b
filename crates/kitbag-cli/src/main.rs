//! 🚀 kitbag-cli — the front door to the drawer of small things.
//!
//! 📦 Thin wrapper: parse args, set up logging, load config, hand off to the library,
//! print a comfy table. Like a manager. 🦆

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use kitbag::app_config::{self, AppConfig};
use kitbag::{Throttler, ValidationLevel, convert_size, registered_groups};
use tracing::error;
use tracing_subscriber::EnvFilter;

// -- 🔧 the ol' reliable: used when --config is absent and this file happens to exist
const DEFAULT_CONFIG_FILE: &str = "kitbag.toml";

#[derive(Debug, Parser)]
#[command(name = "kitbag", version, about = "🧰 small tools for data pipelines")]
struct Cli {
    /// TOML config file. Defaults to ./kitbag.toml when present, env vars (KITBAG_*) otherwise.
    #[arg(long, global = true, env = "KITBAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 🗝️ Validate one or more S3 object keys. Exits 1 if any key fails.
    CheckKey {
        #[arg(required = true)]
        keys: Vec<String>,
        /// safe or lenient (case-insensitive). Falls back to the config's level.
        #[arg(long)]
        level: Option<ValidationLevel>,
        /// Reject '/' at the safe level, for checking a single path segment.
        #[arg(long)]
        no_separator: bool,
    },
    /// 📏 Render a byte count in human units.
    Size {
        bytes: u64,
        #[arg(long, default_value_t = 2)]
        rounding: u32,
    },
    /// 🚦 Register the configured throttler groups and show them.
    Groups,
}

fn main() -> Result<()> {
    // 📡 Set up tracing — because println! debugging is a lifestyle choice
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion, one layer at a time
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Size { bytes, rounding } => {
            println!("{}", convert_size(bytes, rounding));
            Ok(())
        }
        Command::CheckKey {
            keys,
            level,
            no_separator,
        } => {
            let app_config = load(cli.config.as_deref())?;
            check_keys(&app_config, &keys, level, no_separator)
        }
        Command::Groups => {
            let app_config = load(cli.config.as_deref())?;
            show_groups(&app_config)
        }
    }
}

/// 🔧 An explicit --config must exist. The default file is optional.
fn load(config_file: Option<&Path>) -> Result<AppConfig> {
    let the_path = match config_file {
        Some(path) => {
            let exists = path.try_exists().with_context(|| {
                format!("💀 Couldn't check whether '{}' exists", path.display())
            })?;
            if !exists {
                anyhow::bail!(
                    "💀 Configuration file '{}' not found. Relative paths resolve against the \
                     current directory; use an absolute path to be absolutely certain.",
                    path.display()
                );
            }
            Some(path)
        }
        None => {
            let the_default = Path::new(DEFAULT_CONFIG_FILE);
            the_default.is_file().then_some(the_default)
        }
    };

    app_config::load_config(the_path).context("💀 kitbag couldn't load its configuration")
}

fn check_keys(
    app_config: &AppConfig,
    keys: &[String],
    level: Option<ValidationLevel>,
    no_separator: bool,
) -> Result<()> {
    let mut the_validator = app_config.key_validation.validator();
    if let Some(level) = level {
        the_validator.set_level(level);
    }
    if no_separator {
        the_validator.allow_separator = false;
    }

    let mut the_table = Table::new();
    the_table
        .load_preset(UTF8_FULL)
        .set_header(vec!["key", "level", "valid"]);

    let mut the_rejects = 0usize;
    for key in keys {
        let is_valid = the_validator.is_valid(key);
        if !is_valid {
            the_rejects += 1;
        }
        the_table.add_row(vec![
            Cell::new(key),
            Cell::new(the_validator.level()),
            Cell::new(if is_valid { "✅" } else { "❌" }),
        ]);
    }
    println!("{the_table}");

    if the_rejects > 0 {
        anyhow::bail!("{} of {} keys failed validation", the_rejects, keys.len());
    }
    Ok(())
}

fn show_groups(app_config: &AppConfig) -> Result<()> {
    app_config::register_groups(app_config)?;

    let mut the_table = Table::new();
    the_table
        .load_preset(UTF8_FULL)
        .set_header(vec!["group", "capacity", "available", "locked"]);

    for group in registered_groups() {
        let the_throttler = Throttler::lookup(&group)?;
        the_table.add_row(vec![
            Cell::new(&group),
            Cell::new(the_throttler.capacity()),
            Cell::new(the_throttler.available_permits()),
            Cell::new(the_throttler.is_locked()),
        ]);
    }
    println!("{the_table}");
    Ok(())
}
