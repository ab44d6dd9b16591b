//! 💀 Errors — the typed kind, so callers can `match` instead of squinting at strings.
//!
//! 🧠 Knowledge graph:
//! - `ThrottleError`: construction + lookup failures from [`crate::throttler`]
//! - `KeyValidationError`: level parsing failures from [`crate::s3_keys`]
//! - App glue (`app_config`, the CLI) wraps these in `anyhow` with context.
//!
//! None of these are retried. They happen once, at the call site, loudly. 🦆

use thiserror::Error;

/// 🚦 Everything that can go sideways while building or finding a [`Throttler`](crate::Throttler).
///
/// Acquiring a permit never fails, it only waits. So the whole taxonomy lives at
/// construction and lookup time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThrottleError {
    /// Neither capacity nor group handed to the factory, or a capacity outside `1..=MAX`.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The group name is already taken. The registry was not touched.
    #[error("Throttler already exists with group '{group}'")]
    DuplicateGroup { group: String },
    /// Nobody ever registered a throttler under this name.
    #[error("No throttler registered for group '{group}'")]
    NotFound { group: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyValidationError {
    #[error("Level '{level}' is not supported. Try any in ({supported})")]
    UnknownLevel { level: String, supported: String },
}
