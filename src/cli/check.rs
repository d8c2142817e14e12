//! CLI subcommand: `lockgate check`
//!
//! Asks the command security gate whether a command of the given class
//! may run under the current lockdown level.

use anyhow::Result;
use clap::Args;

use lockgate::config::Config;
use lockgate::security::{self, AuditAction, CommandSecurity, SecuredCommand};

#[derive(Args)]
pub struct CheckArgs {
    /// Command security class (e.g., change-tags, access-filesystem)
    pub class: Option<String>,

    /// Command name to record in the audit log
    #[arg(long, default_value = "cli-check")]
    pub command: String,

    /// List every class and whether it is currently allowed
    #[arg(long)]
    pub all: bool,
}

struct ClassCheck<'a> {
    name: &'a str,
    security: CommandSecurity,
    config: &'a Config,
}

impl SecuredCommand for ClassCheck<'_> {
    fn name(&self) -> &str {
        self.name
    }

    fn command_security(&self) -> Option<CommandSecurity> {
        Some(self.security)
    }

    fn config(&self) -> &Config {
        self.config
    }
}

pub async fn run(args: CheckArgs, config_path: Option<&str>) -> Result<()> {
    let config = super::load_config(config_path)?;

    if args.all {
        println!("Lockdown level: {}", config.lockdown_level());
        for &(class, checks) in security::COMMAND_SECURITY_CLASSES {
            let verdict = match security::evaluate(checks, config.lockdown_level()) {
                Some(_) => "refused",
                None => "allowed",
            };
            println!("  {:<20} {}", class, verdict);
        }
        return Ok(());
    }

    let Some(class) = args.class else {
        anyhow::bail!("Specify a command security class or --all");
    };
    let Some(checks) = security::command_security_class(&class) else {
        anyhow::bail!("Unknown command security class: {}", class);
    };

    let command = ClassCheck {
        name: &args.command,
        security: checks,
        config: &config,
    };

    if let Some(denial) = security::forbid_command(&command) {
        security::append_audit_entry_with_detail(
            &config.paths.state_dir,
            AuditAction::CommandDenied,
            &args.command,
            "cli",
            Some(&format!("class {} at lockdown level {}", class, denial.level)),
        )?;
        anyhow::bail!("{}", denial);
    }

    println!("Allowed: {} at lockdown level {}", class, config.lockdown_level());
    Ok(())
}
