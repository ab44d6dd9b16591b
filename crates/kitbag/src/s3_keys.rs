//! 🗝️ S3 key validation — the bouncer at the bucket door, checking every character's ID.
//!
//! Amazon's object key docs sort characters into "safe", "might need special handling",
//! and "please don't". This module checks a key against the first two piles, so a
//! pipeline can reject `~/weird^key` before it ever talks to S3.
//!
//! 🧠 Knowledge graph:
//! - `ValidationLevel::Safe`: letters, digits, `!-_.*'()`, plus `/` when separators are allowed
//! - `ValidationLevel::Lenient`: the safe set plus `&$@=;/:+ ,?`. `/` always allowed here.
//! - Levels parse from strings case-insensitively, so `"lenient"`, `"LENIENT"` and
//!   `"LeNiEnT"` all work in TOML, env vars, and CLI flags.
//!
//! ⚠️ Keys are checked as text. No length limits, no object lookups. That's S3's job. 🦆

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::KeyValidationError;

/// 🎚️ How picky the validator is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ValidationLevel {
    /// Characters the docs call safe. The "I never want to think about encoding" tier.
    #[default]
    Safe,
    /// Characters that work but may need special handling in URLs and tooling.
    Lenient,
}

impl ValidationLevel {
    pub const ALL: [ValidationLevel; 2] = [ValidationLevel::Safe, ValidationLevel::Lenient];

    /// 🏷️ The canonical upper-case name, same one the error message lists.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Lenient => "LENIENT",
        }
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ValidationLevel {
    type Err = KeyValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| KeyValidationError::UnknownLevel {
                level: s.to_string(),
                supported: Self::ALL.map(|level| level.as_str()).join(", "),
            })
    }
}

impl TryFrom<String> for ValidationLevel {
    type Error = KeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// -- 🔤 punctuation the docs bless at each level; letters and digits are always in
const SAFE_SPECIALS: &str = "!-_.*'()";
const LENIENT_SPECIALS: &str = "!-_.*'()&$@=;/:+ ,?";

/// 🗝️ Checks S3 keys against a [`ValidationLevel`].
///
/// `allow_separator` only matters at `Safe`. Turn it off when validating a single
/// path segment instead of a full key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3KeyValidator {
    level: ValidationLevel,
    pub allow_separator: bool,
}

impl Default for S3KeyValidator {
    fn default() -> Self {
        Self::new(ValidationLevel::Safe, true)
    }
}

impl S3KeyValidator {
    pub fn new(level: ValidationLevel, allow_separator: bool) -> Self {
        Self {
            level,
            allow_separator,
        }
    }

    pub fn level(&self) -> ValidationLevel {
        self.level
    }

    pub fn set_level(&mut self, level: ValidationLevel) {
        self.level = level;
    }

    /// ✅ True if every character of `key` is allowed at the current level.
    /// The empty key passes, there's nothing in it to object to.
    pub fn is_valid(&self, key: &str) -> bool {
        let the_offender = key.chars().find(|c| !self.allows(*c));
        if let Some(c) = the_offender {
            trace!("🚫 key {:?} rejected at {:?} (level {})", key, c, self.level);
        }
        the_offender.is_none()
    }

    /// 🛣️ Same as [`is_valid`](Self::is_valid), for paths. Platform separators become `/`
    /// first, so `data\2024\file.csv` on Windows is judged as `data/2024/file.csv`.
    pub fn is_valid_path(&self, key: &Path) -> bool {
        let the_rendered = key.to_string_lossy();
        if std::path::MAIN_SEPARATOR == '/' {
            self.is_valid(&the_rendered)
        } else {
            self.is_valid(&the_rendered.replace(std::path::MAIN_SEPARATOR, "/"))
        }
    }

    fn allows(&self, c: char) -> bool {
        if c.is_ascii_alphanumeric() {
            return true;
        }
        match self.level {
            ValidationLevel::Safe => {
                SAFE_SPECIALS.contains(c) || (self.allow_separator && c == '/')
            }
            ValidationLevel::Lenient => LENIENT_SPECIALS.contains(c),
        }
    }
}
