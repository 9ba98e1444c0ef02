use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracker_cli::{Cli, Command, run};
use tracker_client::{AttributesApi, ClientConfig, HttpAttributesClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "tracker v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match (&cli.config, &cli.command) {
        // The registry listing needs no server.
        (_, Command::Types) => ClientConfig::default(),
        (Some(path), _) => ClientConfig::load_from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        (None, _) => ClientConfig::load()?,
    };
    let api: Arc<dyn AttributesApi> = Arc::new(HttpAttributesClient::new(&config)?);

    let mut stdout = std::io::stdout().lock();
    run(&cli, api, &mut stdout).await
}
