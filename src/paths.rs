//! Where lockgate keeps its files.
//!
//! Two directories are used, both created owner-only (0700). The config
//! directory holds the user-editable `config.toml`. The state directory
//! holds the server secret and the audit log; the secret must survive
//! restarts or every outstanding CSRF token stops validating.
//!
//! `LOCKGATE_CONFIG_DIR` and `LOCKGATE_STATE_DIR` override the platform
//! defaults chosen by `etcetera`. Overrides must be absolute.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Resolved once at startup and carried on [`crate::Config`].
#[derive(Debug, Clone)]
pub struct Paths {
    /// Holds `config.toml`.
    pub config_dir: PathBuf,

    /// Holds the server secret and the audit log.
    pub state_dir: PathBuf,
}

impl Paths {
    /// Resolve from the process environment.
    pub fn resolve() -> Result<Self> {
        Self::resolve_with_env(|key| std::env::var(key))
    }

    /// Resolve with a custom environment lookup.
    pub fn resolve_with_env<F>(env_fn: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        use etcetera::BaseStrategy;

        let strategy = etcetera::choose_base_strategy()
            .map_err(|e| anyhow::anyhow!("Failed to determine base directories: {}", e))?;

        let config_dir = env_or(&env_fn, "LOCKGATE_CONFIG_DIR", || {
            strategy.config_dir().join("lockgate")
        });

        let state_dir = env_or(&env_fn, "LOCKGATE_STATE_DIR", || {
            // No state dir on macOS or Windows; the data dir stands in.
            let base_state = strategy.state_dir().unwrap_or_else(|| strategy.data_dir());
            base_state.join("lockgate")
        });

        Ok(Self {
            config_dir,
            state_dir,
        })
    }

    /// Place every directory under `root`.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            state_dir: root.join("state"),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// The secret that CSRF tokens are derived from.
    pub fn server_secret(&self) -> PathBuf {
        crate::security::secret_file_path(&self.state_dir)
    }

    pub fn audit_log(&self) -> PathBuf {
        crate::security::audit_file_path(&self.state_dir)
    }

    /// Create both directories, owner-only.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.state_dir] {
            create_private_dir(dir)?;
        }
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::resolve().unwrap_or_else(|_| {
            // No usable base directories; fall back to the home directory.
            let home = etcetera::home_dir().unwrap_or_else(|_| PathBuf::from("."));
            Self {
                config_dir: home.join(".config").join("lockgate"),
                state_dir: home.join(".local").join("state").join("lockgate"),
            }
        })
    }
}

/// Use `var` if it names an absolute path (after `~` expansion), else `default`.
fn env_or<F>(env_fn: &F, var: &str, default: impl FnOnce() -> PathBuf) -> PathBuf
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    env_fn(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(|v| PathBuf::from(shellexpand::tilde(&v).to_string()))
        .filter(|p| p.is_absolute())
        .unwrap_or_else(default)
}

fn create_private_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}
