//! Command line interface for the `sreeify` binary.
//!
//! Flags override the values loaded from the environment.

use std::{io, net::SocketAddr, num::NonZeroUsize, path::PathBuf, time::Duration};

use clap::Parser;
use sreeify::{
    client::TransformError,
    config::{ClientConfig, ConfigError},
    transport::SecurityMode,
};

/// Command line arguments for the `sreeify` binary.
#[derive(Debug, Parser)]
#[command(
    name = "sreeify",
    version,
    about = "Send a document through the sreeify transform service"
)]
pub struct Cli {
    /// Service address as host:port.
    #[arg(long, value_name = "ADDR")]
    pub server: Option<String>,
    /// Connect over plaintext TCP.
    #[arg(long, conflicts_with = "tls")]
    pub insecure: bool,
    /// Connect over TLS using the system trust roots.
    #[arg(long)]
    pub tls: bool,
    /// Largest chunk of payload per frame, in bytes.
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<NonZeroUsize>,
    /// Request deadline in seconds; 0 waits indefinitely.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Serve Prometheus metrics on this address.
    #[arg(long, value_name = "ADDR")]
    pub metrics_listen: Option<SocketAddr>,
    /// File to transform; standard input when omitted.
    pub input: Option<PathBuf>,
}

impl Cli {
    /// Apply flag overrides on top of `config`.
    #[must_use]
    pub fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(server) = &self.server {
            config.server.clone_from(server);
        }
        if self.insecure {
            config.security = SecurityMode::Plaintext;
        }
        if self.tls {
            config.security = SecurityMode::Tls;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(secs) = self.timeout {
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        config
    }
}

/// Failures reported by the binary before it exits non-zero.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Loading or validating configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Connecting or transforming failed.
    #[error(transparent)]
    Transform(#[from] TransformError),
    /// Reading input or writing output failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// The metrics exporter could not be installed.
    #[error("failed to start metrics exporter: {0}")]
    Metrics(String),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;
    use rstest::rstest;
    use sreeify::{config::ClientConfig, transport::SecurityMode};

    use super::Cli;

    #[test]
    fn flags_override_environment() {
        let cli = Cli::parse_from([
            "sreeify",
            "--server",
            "localhost:7000",
            "--insecure",
            "--chunk-size",
            "4096",
            "--timeout",
            "0",
            "page.html",
        ]);
        let config = cli.apply(ClientConfig::new("elsewhere:443"));
        assert_eq!(config.server, "localhost:7000");
        assert_eq!(config.security, SecurityMode::Plaintext);
        assert_eq!(config.chunk_size.get(), 4096);
        assert_eq!(config.request_timeout, None);
        assert_eq!(
            cli.input.as_deref(),
            Some(std::path::Path::new("page.html"))
        );
    }

    #[test]
    fn no_flags_keep_loaded_values() {
        let cli = Cli::parse_from(["sreeify"]);
        let mut loaded = ClientConfig::new("svc:443");
        loaded.security = SecurityMode::Plaintext;
        loaded.request_timeout = Some(Duration::from_secs(9));
        let config = cli.apply(loaded);
        assert_eq!(config.server, "svc:443");
        assert_eq!(config.security, SecurityMode::Plaintext);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(9)));
        assert!(cli.input.is_none());
    }

    #[rstest]
    #[case(&["sreeify", "--insecure", "--tls"])]
    #[case(&["sreeify", "--chunk-size", "0"])]
    #[case(&["sreeify", "--timeout", "soon"])]
    fn invalid_flags_are_rejected(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
