mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, OutputFormat};
use msgraph_lite::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // CLIENT_ID / TENANT_ID may come from a .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "msgraph_lite=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    if !config.output.color {
        colored::control::set_override(false);
    }
    let format = OutputFormat::resolve(cli.format, &config.output.default_format);

    let result = match cli.command {
        Commands::Whoami => cli::whoami::execute(&cli.auth, &config, format).await,
        Commands::Teams(cmd) => cli::teams::execute(cmd, &cli.auth, &config, format).await,
        Commands::Chats(cmd) => cli::chats::execute(cmd, &cli.auth, &config, format).await,
        Commands::Mail(cmd) => cli::mail::execute(cmd, &cli.auth, &config, format).await,
        Commands::Calendar(cmd) => cli::calendar::execute(cmd, &cli.auth, &config, format).await,
        Commands::Scopes => cli::scopes::execute(format),
        Commands::Completions(cmd) => cli::completions::execute(cmd),
    };

    if let Err(e) = result {
        cli::output::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}
