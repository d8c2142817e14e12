//! Lockdown level resolution.
//!
//! The `sys.lockdown` config value may be written as an integer, a boolean,
//! or a string. [`resolve`] turns whichever form is present into a
//! [`LockdownLevel`]. Unrecognized strings resolve to [`LockdownLevel::BASIC`]
//! so a typo never opens the interface up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::IntErrorKind;

/// Graded restriction posture.
///
/// The named levels are `DEMO` (-1), `OPEN` (0), `BASIC` (1) and `STRICT` (2).
/// Any other integer from the config passes through unclamped: values above
/// 2 behave as strict, values below -1 sit below demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockdownLevel(i64);

impl LockdownLevel {
    pub const DEMO: Self = Self(-1);
    pub const OPEN: Self = Self(0);
    pub const BASIC: Self = Self(1);
    pub const STRICT: Self = Self(2);

    pub const fn new(level: i64) -> Self {
        Self(level)
    }

    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for LockdownLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::DEMO => write!(f, "demo"),
            Self::OPEN => write!(f, "open"),
            Self::BASIC => write!(f, "basic"),
            Self::STRICT => write!(f, "strict"),
            Self(other) => write!(f, "{}", other),
        }
    }
}

/// The `sys.lockdown` value as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLockdown {
    Int(i64),
    /// Truncated toward zero. NaN is treated like an unknown word.
    Float(f64),
    Flag(bool),
    Text(String),
}

impl From<i64> for RawLockdown {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RawLockdown {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Resolve a raw lockdown value into a level.
///
/// Absent values mean [`LockdownLevel::OPEN`].
pub fn resolve(raw: Option<&RawLockdown>) -> LockdownLevel {
    match raw {
        None => LockdownLevel::OPEN,
        Some(RawLockdown::Int(level)) => LockdownLevel(*level),
        Some(RawLockdown::Float(level)) if level.is_nan() => LockdownLevel::BASIC,
        // `as` truncates and saturates at the i64 bounds
        Some(RawLockdown::Float(level)) => LockdownLevel(*level as i64),
        Some(RawLockdown::Flag(false)) => LockdownLevel::OPEN,
        Some(RawLockdown::Flag(true)) => LockdownLevel::BASIC,
        Some(RawLockdown::Text(text)) => resolve_str(text),
    }
}

fn resolve_str(text: &str) -> LockdownLevel {
    match text.trim().parse::<i64>() {
        Ok(level) => return LockdownLevel(level),
        // Out-of-range numbers still order correctly against the named levels.
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => return LockdownLevel(i64::MAX),
        Err(e) if *e.kind() == IntErrorKind::NegOverflow => return LockdownLevel(i64::MIN),
        Err(_) => {}
    }

    match text.to_lowercase().as_str() {
        "false" => LockdownLevel::OPEN,
        "true" => LockdownLevel::BASIC,
        "demo" => LockdownLevel::DEMO,
        "strict" => LockdownLevel::STRICT,
        _ => LockdownLevel::BASIC,
    }
}
