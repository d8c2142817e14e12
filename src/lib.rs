//! lockgate - Lockdown policy and anti-forgery checks for local admin interfaces
//!
//! This crate provides:
//! - Lockdown level resolution and command security classes
//! - Config key authorization with exact and wildcard rules
//! - CSRF token minting and validation
//! - Policy-gated web fetches through a connection capability broker
//! - A hash-chained audit log of security decisions

pub mod config;
pub mod paths;
pub mod security;

pub use config::Config;
