use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storyvoice_core::{SettingsManager, VoiceRequestRouter};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "storyvoice")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Narration synthesis server with provider fallback and caching")]
struct Args {
    /// Settings file (defaults to ~/.storyvoice/settings.toml)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Override the listen host from settings
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port from settings
    #[arg(long)]
    port: Option<u16>,

    /// Append logs to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // API keys may come from a .env file in the working directory.
    let dotenv = dotenvy::dotenv();

    setup_tracing(args.log_file.as_deref())?;
    if let Ok(path) = dotenv {
        info!("Loaded environment from {:?}", path);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    let manager = match args.settings {
        Some(path) => SettingsManager::from_path(path)?,
        None => SettingsManager::new()?,
    };
    info!("Using settings from {:?}", manager.path());

    let mut settings = manager.into_settings();
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    let router = VoiceRequestRouter::from_settings(&settings)?;
    let voice_info = router.voice_info();
    info!(
        available = voice_info.available,
        services = ?voice_info.services,
        cache_backend = ?settings.cache.backend,
        "Voice router configured"
    );

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    storyvoice_server::serve(Arc::new(router), &addr).await
}

fn setup_tracing(log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;

            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(file)
                        .with_ansi(false)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_thread_names(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .init();

            info!("Tracing initialized to {:?}", path);
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true))
                .with(filter)
                .init();
        }
    }

    Ok(())
}
