//! CLI subcommand: `lockgate csrf`
//!
//! Mints and verifies anti-forgery tokens with the server secret from the
//! state directory.

use anyhow::Result;
use clap::{Args, Subcommand};

use lockgate::config::Config;
use lockgate::security::{self, AuditAction, CsrfTokenService, ServerSecret};

#[derive(Args)]
pub struct CsrfArgs {
    #[command(subcommand)]
    pub command: CsrfCommands,
}

#[derive(Subcommand)]
pub enum CsrfCommands {
    /// Mint a token for a session
    Mint {
        /// Session id the token is bound to
        session: String,
    },

    /// Verify a token for a session
    Verify {
        /// Session id the token was minted for
        session: String,

        /// Token to check
        token: String,
    },

    /// Print the Content-Security-Policy header value
    Csp,
}

pub async fn run(args: CsrfArgs, config_path: Option<&str>) -> Result<()> {
    match args.command {
        CsrfCommands::Mint { session } => {
            let csrf = token_service(&super::load_config(config_path)?)?;
            println!("{}", csrf.generate(&session));
            Ok(())
        }
        CsrfCommands::Verify { session, token } => {
            let config = super::load_config(config_path)?;
            let csrf = token_service(&config)?;
            if csrf.validate(&session, &token) {
                println!("Token: VALID");
                return Ok(());
            }

            security::append_audit_entry(
                &config.paths.state_dir,
                AuditAction::CsrfRejected,
                &session,
                "cli",
            )?;
            anyhow::bail!("Token: INVALID");
        }
        CsrfCommands::Csp => {
            println!("{}", security::CONTENT_SECURITY_POLICY);
            Ok(())
        }
    }
}

fn token_service(config: &Config) -> Result<CsrfTokenService> {
    let state_dir = &config.paths.state_dir;
    let (secret, created) = ServerSecret::load_or_create(state_dir)?;
    if created {
        security::append_audit_entry(state_dir, AuditAction::SecretCreated, "", "cli")?;
    }
    Ok(CsrfTokenService::new(secret))
}
