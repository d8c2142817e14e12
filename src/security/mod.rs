//! Centralized security module for lockgate.
//!
//! See [`lockgate`] for the module overview, architecture diagram,
//! and public API documentation.

mod audit;
mod broker;
mod config_keys;
mod csrf;
mod fetch;
mod gate;
mod lockdown;
mod lockgate;
mod predicates;
mod secret;

// The lockgate.rs facade controls the entire public API surface.
pub use self::lockgate::*;
