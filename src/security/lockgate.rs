//! # lockgate security layer
//!
//! Every security decision the application makes goes through this
//! module, so the whole policy can be reviewed and tested in one place.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                 lockgate.rs (you are here)                       │
//! │                 Public API facade                                │
//! ├──────────────┬───────────────┬────────────────┬──────────────────┤
//! │ lockdown.rs  │ predicates.rs │ gate.rs        │ config_keys.rs   │
//! │ raw value →  │ minimal/basic │ first denial   │ dotted key →     │
//! │ level        │ /strict +     │ wins; command  │ checks (exact +  │
//! │              │ classes       │ hook           │ `*.leaf` rules)  │
//! ├──────────────┴──────┬────────┴────────────────┴──────────────────┤
//! │ csrf.rs + secret.rs │ fetch.rs + broker.rs                       │
//! │ time-bounded tokens │ web content policy, scoped broker context  │
//! ├─────────────────────┴────────────────────────────────────────────┤
//! │ audit.rs: append-only, hash-chained decision log                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Model
//!
//! 1. **Denials are values.** Checks return `Option<Denial>`; callers
//!    must look at the result. Only a fetch with web content disabled is
//!    an error.
//! 2. **Fail toward restriction.** Unknown lockdown strings resolve to
//!    basic, unknown config keys need the change-config class.
//! 3. **Opt-in classes.** A command that declares no security class is
//!    not refused by the gate.
//! 4. **No hidden globals.** The server secret is loaded once and passed
//!    to [`CsrfTokenService`] explicitly; the config-key rule table is
//!    static and immutable.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lockgate::security::{forbid_config_change, CsrfTokenService, ServerSecret};
//!
//! if let Some(denial) = forbid_config_change(&config, "prefs.gpg_use_agent") {
//!     return Err(anyhow::anyhow!(denial.message));
//! }
//!
//! let (secret, _) = ServerSecret::load_or_create(&config.paths.state_dir)?;
//! let csrf = CsrfTokenService::new(secret);
//! let token = csrf.generate(&session_id);
//! assert!(csrf.validate(&session_id, &token));
//! ```

// ── Lockdown ────────────────────────────────────────────────────────

pub use super::lockdown::{LockdownLevel, RawLockdown, resolve as resolve_lockdown};

pub use super::predicates::{
    ACCESS_FILESYSTEM, BROWSE_FILESYSTEM, CHANGE_CONFIG, CHANGE_CONTACTS, CHANGE_FILTERS,
    CHANGE_GNUPG, CHANGE_SECURITY, CHANGE_TAGS, COMMAND_SECURITY_CLASSES, COMPOSE_EMAIL,
    CPU_INTENSIVE, CommandSecurity, Denial, LIST_PRIVATE_DATA, LOCKDOWN_DENIAL_MESSAGE,
    LockdownCheck, QUIT, SecurityPredicate, TAG_EMAIL, basic, command_security_class, minimal,
    strict,
};

// ── Gates ───────────────────────────────────────────────────────────

pub use super::gate::{
    SecuredCommand, evaluate, evaluate_optional, forbid_command, forbid_command_with,
};

pub use super::config_keys::{
    forbid_config_change, resolve as resolve_config_key, rules as config_key_rules,
};

// ── Web Interface ───────────────────────────────────────────────────

pub use super::csrf::{CONTENT_SECURITY_POLICY, CSRF_VALIDITY, CsrfTokenService};
pub use super::secret::{ServerSecret, secret_file_path};

// ── Outbound Fetches ────────────────────────────────────────────────

pub use super::broker::{BrokerContext, BrokerError, Capability, ConnectionBroker, DirectBroker};
pub use super::fetch::{FetchError, SecureFetcher, connection_requirements};

// ── Audit Log ───────────────────────────────────────────────────────

pub use super::audit::{
    AuditAction, AuditEntry, GENESIS_HASH, append_audit_entry, append_audit_entry_with_detail,
    audit_file_path, read_audit_log, verify_audit_chain,
};
