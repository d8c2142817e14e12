use anyhow::Result;
use clap::Parser;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    // Initialize logging: RUST_LOG, then --verbose, then logging.level
    let log_level = cli::log_directive(cli.verbose, config_path);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config(args) => cli::config::run(args, config_path).await,
        Commands::Check(args) => cli::check::run(args, config_path).await,
        Commands::Csrf(args) => cli::csrf::run(args, config_path).await,
        Commands::Fetch(args) => cli::fetch::run(args, config_path).await,
        Commands::Audit(args) => cli::audit::run(args, config_path).await,
        Commands::Paths => cli::paths::run(),
    }
}
