//! CLI subcommand: `lockgate audit`

use anyhow::Result;
use clap::{Args, Subcommand};

use lockgate::security;

#[derive(Args)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommands,
}

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Show the audit log
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Filter by action type (e.g., config_change_denied, csrf_rejected)
        #[arg(long)]
        filter: Option<String>,
    },

    /// Verify the hash chain
    Verify,
}

pub async fn run(args: AuditArgs, config_path: Option<&str>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let state_dir = &config.paths.state_dir;

    match args.command {
        AuditCommands::Show { json, filter } => {
            let mut entries = security::read_audit_log(state_dir)?;

            if let Some(ref wanted) = filter {
                entries.retain(|e| {
                    serde_json::to_value(e.action)
                        .ok()
                        .and_then(|v| v.as_str().map(|s| s == wanted))
                        .unwrap_or(false)
                });
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No audit log entries.");
                return Ok(());
            }

            println!("Security Audit Log ({} entries):", entries.len());
            for entry in &entries {
                let detail = entry
                    .detail
                    .as_deref()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default();
                println!(
                    "  {} {:?} {} [source: {}]{}",
                    entry.ts, entry.action, entry.subject, entry.source, detail
                );
            }
            Ok(())
        }
        AuditCommands::Verify => {
            let broken = security::verify_audit_chain(state_dir)?;
            if broken.is_empty() {
                println!("Chain integrity: INTACT");
                Ok(())
            } else {
                anyhow::bail!(
                    "Chain integrity: BROKEN at line(s) {:?}",
                    broken.iter().map(|i| i + 1).collect::<Vec<_>>()
                );
            }
        }
    }
}
