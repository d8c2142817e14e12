pub mod audit;
pub mod check;
pub mod config;
pub mod csrf;
pub mod fetch;
pub mod paths;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use lockgate::config::Config;
use lockgate::paths::Paths;

#[derive(Parser)]
#[command(name = "lockgate")]
#[command(author, version, about = "Lockdown policy and anti-forgery checks for local admin interfaces")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(short, long, global = true, env = "LOCKGATE_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configuration management (changes are lockdown-checked)
    Config(config::ConfigArgs),

    /// Check whether a command security class is allowed right now
    Check(check::CheckArgs),

    /// CSRF token operations
    Csrf(csrf::CsrfArgs),

    /// Fetch a URL through the web content policy
    Fetch(fetch::FetchArgs),

    /// Security audit log
    Audit(audit::AuditArgs),

    /// Show resolved XDG directory paths
    Paths,
}

/// Default filter directive when `RUST_LOG` is unset.
///
/// Reads `logging.level` from the config file if one exists; never creates it.
pub fn log_directive(verbose: bool, config_path: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }

    let file = match config_path {
        Some(path) => Some(PathBuf::from(shellexpand::tilde(path).as_ref())),
        None => Config::config_path().ok(),
    };
    file.and_then(|path| Config::log_level_from(&path))
        .unwrap_or_else(|| "warn".to_string())
}

/// Load the config from `--config` if given, otherwise from the XDG location.
pub fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => {
            let expanded = shellexpand::tilde(path);
            let paths = Paths::resolve()?;
            paths.ensure_dirs()?;
            Config::load_from(Path::new(expanded.as_ref()), paths)
        }
        None => Config::load(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_wins_over_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"error\"\n").unwrap();
        let path = path.to_str().unwrap();

        assert_eq!(log_directive(true, Some(path)), "debug");
        assert_eq!(log_directive(false, Some(path)), "error");
    }

    #[test]
    fn missing_config_falls_back_to_warn() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.toml");

        assert_eq!(log_directive(false, path.to_str()), "warn");
        assert!(!path.exists());
    }
}
