// Axon AI Tutor
// Main entry point for the axon binary

use clap::Parser;
use axon_engine::cli::{Cli, Command, ConfigAction};
use axon_engine::config::Config;
use axon_engine::handlers::{
    handle_ask, handle_chat, handle_config_show, handle_doctor, handle_secret, handle_transcribe,
    handle_translate, OutputFormat,
};
use axon_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(level);

    tracing::info!("Axon v{}", env!("CARGO_PKG_VERSION"));

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Ask(args) => {
            tracing::debug!("Asking: {}", args.question);
            handle_ask(args, &config, format).await
        }

        Command::Chat => handle_chat(&config).await,

        Command::Translate { text, from, to } => {
            handle_translate(text, from, to, &config, format).await
        }

        Command::Transcribe {
            file,
            language,
            variant,
            remote,
        } => {
            tracing::info!("Transcribing {}", file.display());
            handle_transcribe(&file, &language, variant.as_deref(), remote, &config, format).await
        }

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format),
            ConfigAction::Path => {
                let path = match &cli.config {
                    Some(path) => path.clone(),
                    None => Config::default_config_path()?,
                };
                println!("{}", path.display());
                Ok(())
            }
        },

        Command::Secret { action } => handle_secret(action, format),

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    }
}
