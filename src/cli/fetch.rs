//! CLI subcommand: `lockgate fetch`

use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use lockgate::security::{self, AuditAction, DirectBroker, FetchError, SecureFetcher};

#[derive(Args)]
pub struct FetchArgs {
    /// URL to fetch
    pub url: String,

    /// Never use a trackable connection route
    #[arg(long)]
    pub anonymous: bool,

    /// Timeout in seconds (default: net.fetch_timeout_secs)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Write the body to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
}

pub async fn run(args: FetchArgs, config_path: Option<&str>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.net.fetch_timeout_secs));

    let fetcher = SecureFetcher::new(Arc::new(DirectBroker::new(&config.net)));
    let body = match fetcher
        .fetch(&config.prefs, &args.url, timeout, args.anonymous)
        .await
    {
        Ok(body) => body,
        Err(err) => {
            if matches!(err, FetchError::Disabled | FetchError::Broker(_)) {
                security::append_audit_entry_with_detail(
                    &config.paths.state_dir,
                    AuditAction::FetchBlocked,
                    &args.url,
                    "cli",
                    Some(&err.to_string()),
                )?;
            }
            return Err(std::io::Error::from(err)).context(format!("Fetching {}", args.url));
        }
    };

    match args.output {
        Some(path) => {
            let path = shellexpand::tilde(&path).to_string();
            std::fs::write(&path, &body).with_context(|| format!("Failed to write {}", path))?;
            eprintln!("Wrote {} bytes to {}", body.len(), path);
        }
        None => std::io::stdout().write_all(&body)?,
    }

    Ok(())
}
