//! Config key authorization.
//!
//! Maps a dotted config key to the checks that must pass before it may be
//! changed. Rules are keyed by exact dotted paths or by `*.<segment>`
//! wildcards. Every prefix of the key is consulted, longest first, and for
//! each prefix the exact rule comes before the wildcard for its last
//! segment. For `a.b.c` the lookup order is:
//!
//! ```text
//! a.b.c, *.c, a.b, *.b, a, *.a
//! ```
//!
//! All matching lists are concatenated. A key matching no rule falls back
//! to [`CHANGE_CONFIG`].

use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

use super::gate;
use super::predicates::{
    ACCESS_FILESYSTEM, CHANGE_CONFIG, CHANGE_FILTERS, CHANGE_SECURITY, CHANGE_TAGS,
    CommandSecurity, Denial, SecurityPredicate,
};
use crate::config::Config;

static CONFIG_KEY_RULES: LazyLock<HashMap<&'static str, CommandSecurity>> = LazyLock::new(|| {
    HashMap::from([
        // Security critical
        ("homedir", CHANGE_SECURITY),
        ("master_key", CHANGE_SECURITY),
        ("sys", CHANGE_SECURITY),
        ("prefs.gpg_use_agent", CHANGE_SECURITY),
        ("prefs.gpg_recipient", CHANGE_SECURITY),
        ("prefs.encrypt_mail", CHANGE_SECURITY),
        ("prefs.encrypt_index", CHANGE_SECURITY),
        ("prefs.encrypt_vcards", CHANGE_SECURITY),
        ("prefs.encrypt_events", CHANGE_SECURITY),
        ("prefs.encrypt_misc", CHANGE_SECURITY),
        // Filesystem and local OS access
        ("prefs.open_in_browser", ACCESS_FILESYSTEM),
        ("prefs.rescan_command", ACCESS_FILESYSTEM),
        ("*.command", ACCESS_FILESYSTEM),
        // Sections with their own class
        ("tags", CHANGE_TAGS),
        ("filters", CHANGE_FILTERS),
    ])
});

/// The static rule table.
pub fn rules() -> &'static HashMap<&'static str, CommandSecurity> {
    &CONFIG_KEY_RULES
}

/// Collect the checks that govern changing `key`.
pub fn resolve(key: &str) -> Vec<SecurityPredicate> {
    let rules = rules();
    let mut parts: Vec<&str> = key.split('.').collect();
    let mut checks = Vec::new();

    while let Some(&last) = parts.last() {
        let path = parts.join(".");
        if let Some(list) = rules.get(path.as_str()) {
            debug!("Config key '{}' matched rule '{}'", key, path);
            checks.extend_from_slice(list);
        }

        let wildcard = format!("*.{}", last);
        if let Some(list) = rules.get(wildcard.as_str()) {
            debug!("Config key '{}' matched rule '{}'", key, wildcard);
            checks.extend_from_slice(list);
        }

        parts.pop();
    }

    if checks.is_empty() {
        checks.extend_from_slice(CHANGE_CONFIG);
    }
    checks
}

/// Decide whether `key` may be changed under `config`'s lockdown level.
pub fn forbid_config_change(config: &Config, key: &str) -> Option<Denial> {
    let checks = resolve(key);
    let level = config.lockdown_level();
    let denial = gate::evaluate(&checks, level);
    if let Some(ref d) = denial {
        tracing::warn!(
            "Change of config key '{}' refused by {} check at lockdown level {}",
            key,
            d.predicate,
            level
        );
    }
    denial
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SysConfig;
    use crate::security::lockdown::RawLockdown;
    use super::SecurityPredicate::*;

    fn config_at(lockdown: i64) -> Config {
        Config {
            sys: SysConfig {
                lockdown: Some(RawLockdown::Int(lockdown)),
            },
            ..Config::default()
        }
    }

    #[test]
    fn security_leaf_resolves_to_change_security() {
        assert_eq!(resolve("prefs.gpg_use_agent"), vec![Minimal]);
    }

    #[test]
    fn section_rule_applies_to_children() {
        assert_eq!(resolve("tags.something"), vec![Strict]);
        assert_eq!(resolve("filters.0.terms"), vec![Strict]);
        assert_eq!(resolve("sys.lockdown"), vec![Minimal]);
    }

    #[test]
    fn unmatched_key_falls_back_to_change_config() {
        assert_eq!(resolve("unrelated.key"), vec![Basic]);
        assert_eq!(resolve(""), vec![Basic]);
    }

    #[test]
    fn wildcard_matches_any_command_leaf() {
        assert_eq!(resolve("prefs.vcard.command"), vec![Minimal]);
        assert_eq!(resolve("command"), vec![Minimal]);
    }

    #[test]
    fn wildcard_applies_at_every_depth() {
        // `*.command` matches the middle segment once `x.command` is the
        // remaining path.
        assert_eq!(resolve("x.command.y"), vec![Minimal]);
    }

    #[test]
    fn matches_concatenate_in_lookup_order() {
        // tags.command -> exact miss, `*.command` hit, then `tags` hit.
        assert_eq!(resolve("tags.command"), vec![Minimal, Strict]);
        // prefs.rescan_command -> exact hit only.
        assert_eq!(resolve("prefs.rescan_command"), vec![Minimal]);
    }

    #[test]
    fn forbid_config_change_honors_lockdown() {
        let open = config_at(0);
        let basic = config_at(1);
        let strict = config_at(2);

        assert!(forbid_config_change(&open, "prefs.gpg_use_agent").is_none());
        assert!(forbid_config_change(&basic, "prefs.gpg_use_agent").is_some());

        assert!(forbid_config_change(&basic, "tags.inbox").is_none());
        assert!(forbid_config_change(&strict, "tags.inbox").is_some());

        assert!(forbid_config_change(&open, "unrelated.key").is_none());
        assert!(forbid_config_change(&basic, "unrelated.key").is_some());
    }

    #[test]
    fn rule_table_is_shared() {
        assert!(std::ptr::eq(rules(), rules()));
        assert!(rules().contains_key("*.command"));
    }
}
