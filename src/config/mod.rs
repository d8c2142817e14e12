use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::paths::Paths;
use crate::security::{LockdownLevel, RawLockdown, resolve_lockdown};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolved XDG-compliant paths (not serialized)
    #[serde(skip)]
    pub paths: Paths,

    /// File this config was loaded from, if it is not the XDG default
    #[serde(skip)]
    pub source: Option<PathBuf>,

    #[serde(default)]
    pub sys: SysConfig,

    #[serde(default)]
    pub prefs: PrefsConfig,

    #[serde(default)]
    pub net: NetConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SysConfig {
    /// Lockdown posture: an integer, `true`/`false`, `"demo"` or `"strict"`.
    /// Unset means fully open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lockdown: Option<RawLockdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefsConfig {
    /// Whether remote web content may be fetched: "off" | "on" | "anon"
    #[serde(default)]
    pub web_content: WebContent,

    #[serde(default = "default_true")]
    pub gpg_use_agent: bool,

    #[serde(default)]
    pub gpg_recipient: String,

    #[serde(default)]
    pub encrypt_mail: bool,

    #[serde(default)]
    pub encrypt_index: bool,

    /// Command used to open links in a browser (empty = system default)
    #[serde(default)]
    pub open_in_browser: String,

    /// Command run before rescanning mail sources
    #[serde(default)]
    pub rescan_command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetConfig {
    /// Proxy used when a fetch must not be trackable, e.g. "http://127.0.0.1:8118"
    #[serde(default)]
    pub anon_proxy: Option<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Default fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive. `RUST_LOG` and `--verbose` take
    /// precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Policy for fetching remote web content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebContent {
    #[default]
    Off,
    On,
    /// Allowed, but never over a trackable route.
    Anon,
}

impl WebContent {
    pub fn allows_fetch(self) -> bool {
        matches!(self, Self::On | Self::Anon)
    }
}

impl fmt::Display for WebContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::On => "on",
            Self::Anon => "anon",
        };
        f.write_str(name)
    }
}

impl FromStr for WebContent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "on" => Ok(Self::On),
            "anon" => Ok(Self::Anon),
            other => anyhow::bail!("Invalid web_content '{}': expected off, on or anon", other),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_user_agent() -> String {
    format!("lockgate/{}", env!("CARGO_PKG_VERSION"))
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            web_content: WebContent::default(),
            gpg_use_agent: default_true(),
            gpg_recipient: String::new(),
            encrypt_mail: false,
            encrypt_index: false,
            open_in_browser: String::new(),
            rescan_command: String::new(),
        }
    }
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            anon_proxy: None,
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Paths::resolve()?;
        paths.ensure_dirs()?;
        let path = paths.config_file();

        if !path.exists() {
            // Create default config file on first run
            let config = Config {
                paths,
                ..Config::default()
            };
            config.save_with_template()?;
            return Ok(config);
        }

        Self::load_from(&path, paths)
    }

    /// Load a config file from an explicit location.
    pub fn load_from(path: &Path, paths: Paths) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.paths = paths;
        if path != config.paths.config_file() {
            config.source = Some(path.to_path_buf());
        }

        if let Some(proxy) = config.net.anon_proxy.take() {
            config.net.anon_proxy = Some(shellexpand::env(&proxy)?.to_string());
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = self.file_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;

        Ok(())
    }

    /// Save config with a helpful template (for first-time setup)
    pub fn save_with_template(&self) -> Result<()> {
        let path = self.paths.config_file();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
        eprintln!("Created default config at {}", path.display());

        Ok(())
    }

    /// Where `save` writes: the file this config came from, or the XDG default.
    pub fn file_path(&self) -> PathBuf {
        self.source
            .clone()
            .unwrap_or_else(|| self.paths.config_file())
    }

    /// Read `logging.level` from `path` without creating anything on disk.
    ///
    /// Returns `None` if the file is missing or does not parse.
    pub fn log_level_from(path: &Path) -> Option<String> {
        let content = fs::read_to_string(path).ok()?;
        let config: Config = toml::from_str(&content).ok()?;
        Some(config.logging.level)
    }

    pub fn config_path() -> Result<PathBuf> {
        let paths = Paths::resolve()?;
        Ok(paths.config_file())
    }

    /// Current lockdown level, resolved from `sys.lockdown`.
    pub fn lockdown_level(&self) -> LockdownLevel {
        resolve_lockdown(self.sys.lockdown.as_ref())
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["sys", "lockdown"] => Ok(match &self.sys.lockdown {
                None => String::new(),
                Some(RawLockdown::Int(n)) => n.to_string(),
                Some(RawLockdown::Float(n)) => n.to_string(),
                Some(RawLockdown::Flag(b)) => b.to_string(),
                Some(RawLockdown::Text(s)) => s.clone(),
            }),
            ["prefs", "web_content"] => Ok(self.prefs.web_content.to_string()),
            ["prefs", "gpg_use_agent"] => Ok(self.prefs.gpg_use_agent.to_string()),
            ["prefs", "gpg_recipient"] => Ok(self.prefs.gpg_recipient.clone()),
            ["prefs", "encrypt_mail"] => Ok(self.prefs.encrypt_mail.to_string()),
            ["prefs", "encrypt_index"] => Ok(self.prefs.encrypt_index.to_string()),
            ["prefs", "open_in_browser"] => Ok(self.prefs.open_in_browser.clone()),
            ["prefs", "rescan_command"] => Ok(self.prefs.rescan_command.clone()),
            ["net", "anon_proxy"] => Ok(self.net.anon_proxy.clone().unwrap_or_default()),
            ["net", "user_agent"] => Ok(self.net.user_agent.clone()),
            ["net", "fetch_timeout_secs"] => Ok(self.net.fetch_timeout_secs.to_string()),
            ["logging", "level"] => Ok(self.logging.level.clone()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    /// Set a value by dotted key. Callers are expected to have passed the
    /// key through `forbid_config_change` first.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["sys", "lockdown"] => {
                self.sys.lockdown = match value.parse::<i64>() {
                    Ok(n) => Some(RawLockdown::Int(n)),
                    Err(_) if value.is_empty() => None,
                    Err(_) => Some(RawLockdown::Text(value.to_string())),
                }
            }
            ["prefs", "web_content"] => self.prefs.web_content = value.parse()?,
            ["prefs", "gpg_use_agent"] => self.prefs.gpg_use_agent = value.parse()?,
            ["prefs", "gpg_recipient"] => self.prefs.gpg_recipient = value.to_string(),
            ["prefs", "encrypt_mail"] => self.prefs.encrypt_mail = value.parse()?,
            ["prefs", "encrypt_index"] => self.prefs.encrypt_index = value.parse()?,
            ["prefs", "open_in_browser"] => self.prefs.open_in_browser = value.to_string(),
            ["prefs", "rescan_command"] => self.prefs.rescan_command = value.to_string(),
            ["net", "anon_proxy"] => {
                self.net.anon_proxy = Some(value.to_string()).filter(|v| !v.is_empty())
            }
            ["net", "user_agent"] => self.net.user_agent = value.to_string(),
            ["net", "fetch_timeout_secs"] => self.net.fetch_timeout_secs = value.parse()?,
            ["logging", "level"] => self.logging.level = value.to_string(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        Ok(())
    }
}

/// Default config template with helpful comments (used for first-time setup)
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# lockgate configuration
# Auto-created on first run. Edit as needed.

[sys]
# Lockdown posture:
#   false / 0   open, everything allowed
#   true / 1    basic, configuration and most commands locked
#   "strict"/2  strict, tagging, filters and composing locked too
#   "demo"/-1   demo, like open but security settings stay locked
# Unrecognized values are treated as basic.
# lockdown = "strict"

[prefs]
# Remote web content: off | on | anon (anon never uses a trackable route)
web_content = "off"

[net]
# Proxy used for anonymous fetches
# anon_proxy = "http://127.0.0.1:8118"
fetch_timeout_secs = 30

[logging]
# tracing filter directive, e.g. "info" or "lockgate=debug"
# Overridden by RUST_LOG and --verbose.
level = "warn"
"#;
