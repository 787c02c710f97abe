use clap::Parser;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run().await?;

    Ok(())
}

/// Run the program
async fn run() -> color_eyre::eyre::Result<()> {
    let cli = r::Cli::parse();
    let config = r::config::Config::load(&cli.config_file)?;
    let globals = r::config::Globals::new(&cli, config);

    match cli.command {
        Some(r::Commands::Chat(options)) => {
            let span = tracing::span!(tracing::Level::INFO, "Chat");
            r::commands::chat::run(options, &globals)
                .instrument(span)
                .await?;
        }
        Some(r::Commands::Ingest(options)) => r::commands::ingest::run(options, &globals).await?,
        Some(r::Commands::Users(options)) => r::commands::users::run(options, &globals).await?,
        None => {
            color_eyre::eyre::bail!(
                "No subcommand provided. Use --help to see available subcommands."
            )
        }
    }

    Ok(())
}
