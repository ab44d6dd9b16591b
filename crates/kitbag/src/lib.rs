//! 🧰 kitbag — the drawer of small things every data pipeline ends up needing.
//!
//! 🚦 [`throttler`]: named-group concurrency limits, shared across call sites
//! 🗝️ [`s3_keys`]: S3 object key validation before anything hits the network
//! 📏 [`size`]: byte counts a human can read
//! 🔧 [`app_config`]: figment-backed config that declares throttler groups up front
//!
//! 🦆 The duck lives here now. It moved in with the semaphore.

pub mod app_config;
pub mod error;
pub mod s3_keys;
pub mod size;
pub mod throttler;

pub use error::{KeyValidationError, ThrottleError};
pub use s3_keys::{S3KeyValidator, ValidationLevel};
pub use size::convert_size;
pub use throttler::{ThrottlePermit, Throttler, registered_groups, throttler};
