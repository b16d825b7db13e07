use clap::Parser;

use livequery::cli::commands::{demo, init};
use livequery::cli::{Cli, Commands};
use livequery::{Settings, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    logging::init_with_config(&settings.logging);

    let mut stdout = std::io::stdout();
    match cli.command {
        Commands::Init { force } => init::run_init(force, &mut stdout)?,
        Commands::Config => init::run_config(&settings, cli.config.as_deref(), &mut stdout)?,
        Commands::Demo {
            updates,
            overflow,
            ownership,
        } => {
            let options = demo::DemoOptions {
                updates,
                overflow: overflow.unwrap_or(settings.loader.overflow),
                ownership: ownership.unwrap_or(settings.loader.ownership),
            };
            demo::run_demo(&settings.loader, &options, &mut stdout).await?;
        }
    }

    Ok(())
}
