//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment. Declares which throttler groups exist and how big they are,
//! plus how picky the S3 key validator should be, so none of it gets hardcoded at
//! whatever call site happened to run first.
//!
//! ```toml
//! [throttle_groups]
//! io = 4
//! s3_uploads = 16
//!
//! [key_validation]
//! level = "lenient"
//! allow_separator = true
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::s3_keys::{S3KeyValidator, ValidationLevel};
use crate::throttler::Throttler;

/// 📦 Everything kitbag reads from config. Every field has a default, so an empty
/// file (or no file at all) is a perfectly valid, perfectly boring config.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// 🚦 group name → capacity. Registered by [`register_groups`].
    #[serde(default, alias = "groups")]
    pub throttle_groups: BTreeMap<String, usize>,
    #[serde(default)]
    pub key_validation: KeyValidationConfig,
}

/// 🗝️ Knobs for the S3 key validator.
#[derive(Debug, Deserialize, Clone)]
pub struct KeyValidationConfig {
    #[serde(default)]
    pub level: ValidationLevel,
    #[serde(default = "default_allow_separator")]
    pub allow_separator: bool,
}

// -- 🛣️ full keys have slashes in them. that's what makes them keys and not filenames.
fn default_allow_separator() -> bool {
    true
}

impl Default for KeyValidationConfig {
    fn default() -> Self {
        Self {
            level: ValidationLevel::default(),
            allow_separator: default_allow_separator(),
        }
    }
}

impl KeyValidationConfig {
    /// 🏭 Turn the knobs into an actual validator.
    pub fn validator(&self) -> S3KeyValidator {
        S3KeyValidator::new(self.level, self.allow_separator)
    }
}

/// 🚀 Load the config — from a file, from env vars, or from the sheer power of defaults.
///
/// 🔧 Merges `KITBAG_*` environment variables with an optional TOML file.
/// Nested keys use a double underscore: `KITBAG_THROTTLE_GROUPS__IO=4`.
///   - `config_file_name` is `None` → env vars only.
///   - `config_file_name` is `Some` → env vars + TOML, merged. TOML wins on conflicts.
///
/// 💀 Errors if the merged config doesn't parse, with a message saying where we looked.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("KITBAG_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (KITBAG_*). \
             Check the TOML for typos and the env for stragglers.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (KITBAG_*). \
                 No file was provided — this one's all on the environment."
            .to_string(),
    };

    config.extract().context(context_msg)
}

/// 🚦 Build and register a throttler for every configured group, in name order.
///
/// 💀 Stops at the first bad entry (zero capacity, name already taken) and says which
/// one. Groups registered before the failure stay registered; the registry has no undo.
pub fn register_groups(config: &AppConfig) -> anyhow::Result<Vec<Arc<Throttler>>> {
    config
        .throttle_groups
        .iter()
        .map(|(group, capacity)| {
            Throttler::new(*capacity, Some(group)).with_context(|| {
                format!(
                    "💀 Couldn't register throttler group '{}' with capacity {}",
                    group, capacity
                )
            })
        })
        .collect()
}
