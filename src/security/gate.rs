//! Command security gate.
//!
//! Evaluates an ordered list of lockdown checks and stops at the first
//! refusal. Commands opt in by declaring a [`CommandSecurity`] list; a
//! command that declares nothing is never refused here.

use tracing::{debug, warn};

use super::lockdown::LockdownLevel;
use super::predicates::{CommandSecurity, Denial, LockdownCheck};
use crate::config::Config;

/// Security hook for the command-dispatch layer.
pub trait SecuredCommand {
    /// Name used in log lines.
    fn name(&self) -> &str;

    /// The command's declared security class, if any.
    fn command_security(&self) -> Option<CommandSecurity>;

    /// Configuration the command runs against.
    fn config(&self) -> &Config;
}

/// Evaluate `checks` in order at `level`. Returns the first denial.
pub fn evaluate<C: LockdownCheck>(checks: &[C], level: LockdownLevel) -> Option<Denial> {
    checks.iter().find_map(|check| check.check(level))
}

/// Evaluate an optional list. `None` means the caller declared no class.
pub fn evaluate_optional<C: LockdownCheck>(
    checks: Option<&[C]>,
    level: LockdownLevel,
) -> Option<Denial> {
    checks.and_then(|checks| evaluate(checks, level))
}

/// Decide whether a command may run under its own config.
pub fn forbid_command<T: SecuredCommand + ?Sized>(command: &T) -> Option<Denial> {
    forbid_command_with(command, None, None)
}

/// Decide whether a command may run, optionally overriding the list of
/// checks or the config it is evaluated against.
pub fn forbid_command_with<T: SecuredCommand + ?Sized>(
    command: &T,
    checks: Option<CommandSecurity>,
    config: Option<&Config>,
) -> Option<Denial> {
    let checks = checks.or_else(|| command.command_security());
    let level = config.unwrap_or_else(|| command.config()).lockdown_level();

    let denial = evaluate_optional(checks, level);
    match &denial {
        Some(d) => warn!(
            "Command '{}' refused by {} check at lockdown level {}",
            command.name(),
            d.predicate,
            level
        ),
        None => debug!(
            "Command '{}' allowed at lockdown level {}",
            command.name(),
            level
        ),
    }
    denial
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SysConfig;
    use crate::security::lockdown::RawLockdown;
    use crate::security::predicates::{self, SecurityPredicate};
    use std::cell::Cell;

    /// Test double that counts how often it is consulted.
    struct CountingCheck {
        deny: bool,
        calls: Cell<usize>,
    }

    impl CountingCheck {
        fn new(deny: bool) -> Self {
            Self {
                deny,
                calls: Cell::new(0),
            }
        }
    }

    impl LockdownCheck for CountingCheck {
        fn check(&self, level: LockdownLevel) -> Option<Denial> {
            self.calls.set(self.calls.get() + 1);
            self.deny.then(|| Denial::new("counting", level))
        }
    }

    struct TestCommand {
        security: Option<CommandSecurity>,
        config: Config,
    }

    impl TestCommand {
        fn new(security: Option<CommandSecurity>, lockdown: &str) -> Self {
            let config = Config {
                sys: SysConfig {
                    lockdown: Some(RawLockdown::from(lockdown)),
                },
                ..Config::default()
            };
            Self { security, config }
        }
    }

    impl SecuredCommand for TestCommand {
        fn name(&self) -> &str {
            "test"
        }

        fn command_security(&self) -> Option<CommandSecurity> {
            self.security
        }

        fn config(&self) -> &Config {
            &self.config
        }
    }

    #[test]
    fn short_circuits_on_first_denial() {
        let checks = [CountingCheck::new(true), CountingCheck::new(true)];

        let denial = evaluate(&checks, LockdownLevel::STRICT);

        assert!(denial.is_some());
        assert_eq!(checks[0].calls.get(), 1);
        assert_eq!(checks[1].calls.get(), 0);
    }

    #[test]
    fn every_check_runs_when_all_allow() {
        let checks = [CountingCheck::new(false), CountingCheck::new(false)];
        assert!(evaluate(&checks, LockdownLevel::OPEN).is_none());
        assert_eq!(checks[0].calls.get(), 1);
        assert_eq!(checks[1].calls.get(), 1);
    }

    #[test]
    fn later_denial_is_returned() {
        let checks = [SecurityPredicate::Strict, SecurityPredicate::Basic];
        let denial = evaluate(&checks, LockdownLevel::BASIC).unwrap();
        assert_eq!(denial.predicate, "basic");
    }

    #[test]
    fn empty_and_missing_lists_allow() {
        let empty: [SecurityPredicate; 0] = [];
        assert!(evaluate(&empty, LockdownLevel::STRICT).is_none());
        assert!(evaluate_optional::<SecurityPredicate>(None, LockdownLevel::STRICT).is_none());
    }

    #[test]
    fn command_without_class_is_allowed() {
        let command = TestCommand::new(None, "strict");
        assert!(forbid_command(&command).is_none());
    }

    #[test]
    fn command_class_follows_config_level() {
        let command = TestCommand::new(Some(predicates::CHANGE_TAGS), "strict");
        assert!(forbid_command(&command).is_some());

        let command = TestCommand::new(Some(predicates::CHANGE_TAGS), "true");
        assert!(forbid_command(&command).is_none());
    }

    #[test]
    fn overrides_replace_declared_list_and_config() {
        let command = TestCommand::new(Some(predicates::QUIT), "false");
        let locked = Config {
            sys: SysConfig {
                lockdown: Some(RawLockdown::Int(2)),
            },
            ..Config::default()
        };

        assert!(forbid_command(&command).is_none());
        assert!(forbid_command_with(&command, None, Some(&locked)).is_some());
        assert!(
            forbid_command_with(&command, Some(predicates::CHANGE_CONFIG), Some(&locked)).is_some()
        );

        let demo = TestCommand::new(Some(predicates::QUIT), "demo");
        assert!(forbid_command(&demo).is_some());
        assert!(forbid_command_with(&demo, Some(predicates::CHANGE_CONFIG), None).is_none());
    }
}
