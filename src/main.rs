use anyhow::{bail, Context};
use clap::Parser;
use forgesync::{read_config, ClientRegistry, ForgeConfig, ForgeMcpServer};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Forgesync - MCP server for repositories on self-hosted Git forges
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file listing forge instances
    #[arg(short, long, env = "FORGESYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of a single forge instance, used when no config file is given
    #[arg(long, env = "FORGESYNC_URL")]
    url: Option<String>,

    /// Access token for the single instance
    #[arg(long, env = "FORGESYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

async fn load_config(args: &Args) -> anyhow::Result<ForgeConfig> {
    if let Some(path) = &args.config {
        return read_config(path)
            .await
            .with_context(|| format!("failed to load config from {}", path.display()));
    }

    match &args.url {
        Some(url) => Ok(ForgeConfig::single(url.clone(), args.token.clone())),
        None => bail!("no forge configured: pass --config or --url (or set FORGESYNC_URL)"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("forgesync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args).await?;
    let registry = ClientRegistry::from_config(&config).context("invalid forge configuration")?;

    info!("Starting forgesync {}", forgesync::utils::FORGESYNC_VERSION);
    ForgeMcpServer::new(registry).run().await?;

    info!("forgesync stopped");
    Ok(())
}
