//! Process-wide server secret.
//!
//! Generated once from the OS CSPRNG and stored in the state directory
//! (0600 on Unix). The secret is loaded at startup and handed to the
//! services that need it; nothing reads it from a global.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const SECRET_FILENAME: &str = "lockgate.secret";
const SECRET_LEN: usize = 32;

/// Shortest secret accepted from disk, in characters.
const MIN_SECRET_CHARS: usize = 16;

#[derive(Clone, PartialEq, Eq)]
pub struct ServerSecret(String);

impl ServerSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Generate a fresh random secret.
    pub fn generate() -> Self {
        let mut key = [0u8; SECRET_LEN];
        rand::rng().fill(&mut key);
        Self(URL_SAFE_NO_PAD.encode(key))
    }

    /// Read the secret from `state_dir`, creating it on first use.
    ///
    /// Returns the secret and whether it was newly created.
    pub fn load_or_create(state_dir: &Path) -> Result<(Self, bool)> {
        let path = secret_file_path(state_dir);

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = match options.open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Ok((Self::load(state_dir)?, false));
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to create server secret at {}", path.display())
                });
            }
        };

        let secret = Self::generate();
        file.write_all(secret.0.as_bytes())
            .and_then(|()| file.sync_all())
            .context("Failed to write server secret")?;

        tracing::info!("Generated server secret at {}", path.display());
        Ok((secret, true))
    }

    /// Read an existing secret from `state_dir`.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = secret_file_path(state_dir);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read server secret at {}", path.display()))?;
        let secret = content.trim();

        if secret.len() < MIN_SECRET_CHARS {
            anyhow::bail!(
                "Server secret at {} is too short ({} chars, expected at least {})",
                path.display(),
                secret.len(),
                MIN_SECRET_CHARS
            );
        }

        Ok(Self(secret.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServerSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServerSecret(<redacted>)")
    }
}

pub fn secret_file_path(state_dir: &Path) -> PathBuf {
    state_dir.join(SECRET_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_once_then_reused() {
        let tmp = tempfile::tempdir().unwrap();

        let (first, created) = ServerSecret::load_or_create(tmp.path()).unwrap();
        assert!(created);

        let (second, created) = ServerSecret::load_or_create(tmp.path()).unwrap();
        assert!(!created);
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn secret_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        ServerSecret::load_or_create(tmp.path()).unwrap();

        let perms = fs::metadata(secret_file_path(tmp.path()))
            .unwrap()
            .permissions();
        assert_eq!(perms.mode() & 0o777, 0o600);
    }

    #[test]
    fn existing_secret_is_never_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let stored = "an-existing-secret-value";
        fs::write(secret_file_path(tmp.path()), stored).unwrap();

        let (secret, created) = ServerSecret::load_or_create(tmp.path()).unwrap();
        assert!(!created);
        assert_eq!(secret.expose(), stored);
        assert_eq!(
            fs::read_to_string(secret_file_path(tmp.path())).unwrap(),
            stored
        );
    }

    #[test]
    fn missing_state_dir_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(ServerSecret::load_or_create(&tmp.path().join("absent")).is_err());
    }

    #[test]
    fn short_secret_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(secret_file_path(tmp.path()), "abc").unwrap();
        assert!(ServerSecret::load(tmp.path()).is_err());
    }

    #[test]
    fn generated_secrets_differ() {
        let a = ServerSecret::generate();
        let b = ServerSecret::generate();
        assert_ne!(a, b);
        assert_eq!(a.expose().len(), 43); // 32 bytes, base64url without padding
    }

    #[test]
    fn debug_redacts() {
        let secret = ServerSecret::new("hunter2hunter2hunter2");
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }
}
