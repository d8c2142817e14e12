//! Lockdown threshold checks and the named command security classes.

use serde::Serialize;
use std::fmt;

use super::lockdown::LockdownLevel;

/// Message shown whenever a lockdown check refuses an action.
pub const LOCKDOWN_DENIAL_MESSAGE: &str = "In lockdown, doing nothing.";

/// A refused action: which check said no, and at what level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denial {
    pub message: String,
    pub predicate: String,
    pub level: LockdownLevel,
}

impl Denial {
    pub fn new(predicate: impl Into<String>, level: LockdownLevel) -> Self {
        Self {
            message: LOCKDOWN_DENIAL_MESSAGE.to_string(),
            predicate: predicate.into(),
            level,
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Anything that can allow or refuse an action at a given lockdown level.
///
/// Implementations must be pure and must never panic.
pub trait LockdownCheck {
    fn check(&self, level: LockdownLevel) -> Option<Denial>;
}

/// The three lockdown thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPredicate {
    /// Allowed only when fully open.
    Minimal,
    /// Refused at any level above open.
    Basic,
    /// Refused above basic.
    Strict,
}

impl SecurityPredicate {
    pub fn name(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Basic => "basic",
            Self::Strict => "strict",
        }
    }

    fn allows(self, level: LockdownLevel) -> bool {
        match self {
            Self::Minimal => level == LockdownLevel::OPEN,
            Self::Basic => level <= LockdownLevel::OPEN,
            Self::Strict => level <= LockdownLevel::BASIC,
        }
    }
}

impl LockdownCheck for SecurityPredicate {
    fn check(&self, level: LockdownLevel) -> Option<Denial> {
        if self.allows(level) {
            None
        } else {
            Some(Denial::new(self.name(), level))
        }
    }
}

pub fn minimal(level: LockdownLevel) -> Option<Denial> {
    SecurityPredicate::Minimal.check(level)
}

pub fn basic(level: LockdownLevel) -> Option<Denial> {
    SecurityPredicate::Basic.check(level)
}

pub fn strict(level: LockdownLevel) -> Option<Denial> {
    SecurityPredicate::Strict.check(level)
}

/// Ordered list of checks gating one category of operations.
pub type CommandSecurity = &'static [SecurityPredicate];

pub const ACCESS_FILESYSTEM: CommandSecurity = &[SecurityPredicate::Minimal];
pub const BROWSE_FILESYSTEM: CommandSecurity = &[SecurityPredicate::Basic];
pub const CHANGE_CONFIG: CommandSecurity = &[SecurityPredicate::Basic];
pub const CHANGE_CONTACTS: CommandSecurity = &[SecurityPredicate::Basic];
pub const CHANGE_GNUPG: CommandSecurity = &[SecurityPredicate::Basic];
pub const CHANGE_FILTERS: CommandSecurity = &[SecurityPredicate::Strict];
pub const CHANGE_SECURITY: CommandSecurity = &[SecurityPredicate::Minimal];
pub const CHANGE_TAGS: CommandSecurity = &[SecurityPredicate::Strict];
pub const COMPOSE_EMAIL: CommandSecurity = &[SecurityPredicate::Strict];
pub const CPU_INTENSIVE: CommandSecurity = &[SecurityPredicate::Basic];
pub const LIST_PRIVATE_DATA: CommandSecurity = &[SecurityPredicate::Minimal];
pub const TAG_EMAIL: CommandSecurity = &[SecurityPredicate::Strict];
pub const QUIT: CommandSecurity = &[SecurityPredicate::Minimal];

/// Every named class, keyed by its kebab-case name.
pub const COMMAND_SECURITY_CLASSES: &[(&str, CommandSecurity)] = &[
    ("access-filesystem", ACCESS_FILESYSTEM),
    ("browse-filesystem", BROWSE_FILESYSTEM),
    ("change-config", CHANGE_CONFIG),
    ("change-contacts", CHANGE_CONTACTS),
    ("change-gnupg", CHANGE_GNUPG),
    ("change-filters", CHANGE_FILTERS),
    ("change-security", CHANGE_SECURITY),
    ("change-tags", CHANGE_TAGS),
    ("compose-email", COMPOSE_EMAIL),
    ("cpu-intensive", CPU_INTENSIVE),
    ("list-private-data", LIST_PRIVATE_DATA),
    ("tag-email", TAG_EMAIL),
    ("quit", QUIT),
];

/// Look up a command security class by name.
pub fn command_security_class(name: &str) -> Option<CommandSecurity> {
    COMMAND_SECURITY_CLASSES
        .iter()
        .find(|(class, _)| *class == name)
        .map(|(_, list)| *list)
}
