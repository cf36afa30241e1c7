//! Builder for [`TransformClient`].

use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use super::{TransformClient, TransformError};
use crate::{
    config::ClientConfig,
    transport::{BackoffConfig, Connector, SecurityMode},
};

/// Configures and connects a [`TransformClient`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use sreeify::client::TransformClientBuilder;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), sreeify::client::TransformError> {
/// let client = TransformClientBuilder::new("127.0.0.1:9000")
///     .insecure(true)
///     .request_timeout(Some(Duration::from_secs(5)))
///     .connect()
///     .await?;
/// # let _ = client;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TransformClientBuilder {
    config: ClientConfig,
    tls_config: Option<Arc<rustls::ClientConfig>>,
}

impl TransformClientBuilder {
    /// Start from the defaults for `server`.
    #[must_use]
    pub fn new(server: impl Into<String>) -> Self { Self::from_config(ClientConfig::new(server)) }

    /// Start from an existing configuration, such as one loaded with
    /// [`ClientConfig::from_env`].
    #[must_use]
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            tls_config: None,
        }
    }

    /// Use plaintext TCP when `insecure` is set, TLS otherwise.
    #[must_use]
    pub fn insecure(self, insecure: bool) -> Self {
        self.security(SecurityMode::from_insecure(insecure))
    }

    /// Select plaintext or TLS explicitly.
    #[must_use]
    pub fn security(mut self, security: SecurityMode) -> Self {
        self.config.security = security;
        self
    }

    /// Trust the roots in `config` instead of the system store. Implies TLS.
    #[must_use]
    pub fn tls_config(mut self, config: Arc<rustls::ClientConfig>) -> Self {
        self.config.security = SecurityMode::Tls;
        self.tls_config = Some(config);
        self
    }

    /// Set the largest chunk of payload carried per frame.
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: NonZeroUsize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    /// Set the largest frame accepted in either direction.
    #[must_use]
    pub fn max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.config.max_frame_length = max_frame_length;
        self
    }

    /// Set the keepalive period; `None` disables pings.
    #[must_use]
    pub fn ping_interval(mut self, period: Option<Duration>) -> Self {
        self.config.ping_interval = period;
        self
    }

    /// Set the per-request deadline; `None` waits indefinitely.
    #[must_use]
    pub fn request_timeout(mut self, deadline: Option<Duration>) -> Self {
        self.config.request_timeout = deadline;
        self
    }

    /// Replace the back-off used when dialling.
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Cap the number of parts accepted for one response.
    #[must_use]
    pub fn max_parts(mut self, max_parts: NonZeroUsize) -> Self {
        self.config.max_parts = max_parts;
        self
    }

    /// Configuration assembled so far.
    #[must_use]
    pub fn config(&self) -> &ClientConfig { &self.config }

    /// Validate the configuration and dial the service.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Config`] for an unusable configuration and
    /// [`TransformError::Connect`] if the service cannot be reached.
    pub async fn connect(self) -> Result<TransformClient, TransformError> {
        self.config.validate()?;
        let connector = match (self.config.security, self.tls_config) {
            (SecurityMode::Tls, Some(tls)) => {
                Connector::with_tls_config(self.config.server.clone(), tls)?
            }
            (security, _) => Connector::new(self.config.server.clone(), security)?,
        }
        .backoff(self.config.backoff)
        .max_frame_length(self.config.max_frame_length);
        TransformClient::connect_with(self.config, connector).await
    }
}

#[cfg(test)]
mod tests {
    use std::{num::NonZeroUsize, time::Duration};

    use super::TransformClientBuilder;
    use crate::{client::TransformError, config::ConfigError, transport::SecurityMode};

    #[test]
    fn setters_update_config() {
        let builder = TransformClientBuilder::new("localhost:9000")
            .insecure(true)
            .chunk_size(NonZeroUsize::new(512).expect("non-zero"))
            .ping_interval(None)
            .request_timeout(Some(Duration::from_secs(3)));
        let config = builder.config();
        assert_eq!(config.server, "localhost:9000");
        assert_eq!(config.security, SecurityMode::Plaintext);
        assert_eq!(config.chunk_size.get(), 512);
        assert_eq!(config.ping_interval, None);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn connect_rejects_chunk_larger_than_frame() {
        let err = TransformClientBuilder::new("127.0.0.1:1")
            .insecure(true)
            .max_frame_length(1024)
            .connect()
            .await
            .expect_err("chunk cannot fit in a frame");
        assert!(matches!(
            err,
            TransformError::Config(ConfigError::ChunkExceedsFrame { .. })
        ));
    }
}
