//! `sreeify` binary: transforms a document through the remote service.
//!
//! Reads the document from a file or standard input, writes the result to
//! standard output and exits non-zero on any failure.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, CliError};
use sreeify::{client::TransformClientBuilder, config::ClientConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "sreeify failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Some(addr) = cli.metrics_listen {
        install_metrics_exporter(addr)?;
    }
    let config = cli.apply(ClientConfig::from_env()?);
    let input = match &cli.input {
        Some(path) => tokio::fs::read(path).await?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin().read_to_end(&mut buf).await?;
            buf
        }
    };

    let client = TransformClientBuilder::from_config(config).connect().await?;
    let output = client.transform(input).await?;
    client.close().await;

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&output).await?;
    stdout.flush().await?;
    Ok(())
}

#[cfg(feature = "metrics")]
fn install_metrics_exporter(addr: std::net::SocketAddr) -> Result<(), CliError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| CliError::Metrics(err.to_string()))
}

#[cfg(not(feature = "metrics"))]
fn install_metrics_exporter(addr: std::net::SocketAddr) -> Result<(), CliError> {
    Err(CliError::Metrics(format!(
        "built without the metrics feature; cannot listen on {addr}"
    )))
}
