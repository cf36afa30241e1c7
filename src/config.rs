//! Client configuration.
//!
//! [`ClientConfig`] collects everything needed to dial the transform
//! service and drive requests over it. Values come from
//! [`TransformClientBuilder`](crate::client::TransformClientBuilder) setters
//! or from the process environment via [`ClientConfig::from_env`].

use std::{num::NonZeroUsize, time::Duration};

use tracing::info;

use crate::{
    fragment::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_PARTS},
    frame::MAX_FRAME_OVERHEAD,
    transport::{BackoffConfig, DEFAULT_MAX_FRAME_LENGTH, SecurityMode},
};

/// Transform service dialled when `SREEIFIER_SERVER` is unset.
pub const DEFAULT_SERVER: &str = "sreeifier-vvgwyvu7bq-as.a.run.app:443";
/// Default keepalive period.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(15);
/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable naming the service `host:port`.
pub const ENV_SERVER: &str = "SREEIFIER_SERVER";
/// Environment variable selecting plaintext; anything but `false` does.
pub const ENV_INSECURE: &str = "INSECURE";
/// Environment variable holding the chunk size in bytes.
pub const ENV_CHUNK_SIZE: &str = "SREEIFY_CHUNK_SIZE";
/// Environment variable holding the keepalive period in seconds.
pub const ENV_PING_INTERVAL: &str = "SREEIFY_PING_INTERVAL_SECS";
/// Environment variable holding the request deadline in seconds.
pub const ENV_REQUEST_TIMEOUT: &str = "SREEIFY_REQUEST_TIMEOUT_SECS";

/// Errors raised while loading or validating a [`ClientConfig`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    /// A single chunk could not fit inside one frame.
    #[error(
        "chunk size {chunk_size} plus {overhead} bytes of framing exceeds the maximum frame \
         length {max_frame_length}"
    )]
    ChunkExceedsFrame {
        chunk_size: usize,
        overhead: usize,
        max_frame_length: usize,
    },
}

/// Settings for one transform client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Service address as `host:port`.
    pub server: String,
    /// Plaintext or TLS.
    pub security: SecurityMode,
    /// Largest chunk of payload carried by one frame.
    pub chunk_size: NonZeroUsize,
    /// Largest frame accepted in either direction.
    pub max_frame_length: usize,
    /// Keepalive period; `None` disables pings.
    pub ping_interval: Option<Duration>,
    /// Per-request deadline; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Largest `total_parts` accepted for an inbound response.
    pub max_parts: NonZeroUsize,
    /// Back-off between dial attempts.
    pub backoff: BackoffConfig,
}

impl ClientConfig {
    /// Configuration for `server` with every other setting at its default.
    ///
    /// # Examples
    ///
    /// ```
    /// use sreeify::{config::ClientConfig, transport::SecurityMode};
    ///
    /// let config = ClientConfig::new("127.0.0.1:9000");
    /// assert_eq!(config.security, SecurityMode::Tls);
    /// assert!(config.validate().is_ok());
    /// ```
    #[must_use]
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            security: SecurityMode::Tls,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            ping_interval: Some(DEFAULT_PING_INTERVAL),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            max_parts: DEFAULT_MAX_PARTS,
            backoff: BackoffConfig::default(),
        }
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is malformed or the result
    /// fails [`ClientConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// Unset variables fall back to their defaults, and each fallback is
    /// logged. `INSECURE` selects plaintext unless it is exactly `false`.
    /// A zero keepalive period or deadline disables that feature.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is malformed or the result
    /// fails [`ClientConfig::validate`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use sreeify::{config::ClientConfig, transport::SecurityMode};
    ///
    /// let config = ClientConfig::from_lookup(|key| match key {
    ///     "SREEIFIER_SERVER" => Some("localhost:8081".to_owned()),
    ///     "INSECURE" => Some("false".to_owned()),
    ///     "SREEIFY_REQUEST_TIMEOUT_SECS" => Some("0".to_owned()),
    ///     _ => None,
    /// })
    /// .expect("valid environment");
    /// assert_eq!(config.server, "localhost:8081");
    /// assert_eq!(config.security, SecurityMode::Tls);
    /// assert_eq!(config.request_timeout, None);
    /// assert_eq!(config.ping_interval, Some(Duration::from_secs(15)));
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = lookup(ENV_SERVER).unwrap_or_else(|| {
            info!(key = ENV_SERVER, default = DEFAULT_SERVER, "using default");
            DEFAULT_SERVER.to_owned()
        });
        let insecure = match lookup(ENV_INSECURE) {
            Some(value) => value != "false",
            None => {
                info!(key = ENV_INSECURE, default = true, "using default");
                true
            }
        };
        let mut config = Self::new(server);
        config.security = SecurityMode::from_insecure(insecure);

        if let Some(raw) = lookup(ENV_CHUNK_SIZE) {
            let bytes = parse_number(ENV_CHUNK_SIZE, &raw)?;
            config.chunk_size = NonZeroUsize::new(bytes).ok_or_else(|| ConfigError::Invalid {
                key: ENV_CHUNK_SIZE,
                value: raw.clone(),
                reason: "must be greater than zero".to_owned(),
            })?;
        } else {
            info!(key = ENV_CHUNK_SIZE, default = DEFAULT_CHUNK_SIZE.get(), "using default");
        }
        if let Some(raw) = lookup(ENV_PING_INTERVAL) {
            config.ping_interval = parse_seconds(ENV_PING_INTERVAL, &raw)?;
        } else {
            info!(
                key = ENV_PING_INTERVAL,
                default = DEFAULT_PING_INTERVAL.as_secs(),
                "using default"
            );
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT) {
            config.request_timeout = parse_seconds(ENV_REQUEST_TIMEOUT, &raw)?;
        } else {
            info!(
                key = ENV_REQUEST_TIMEOUT,
                default = DEFAULT_REQUEST_TIMEOUT.as_secs(),
                "using default"
            );
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that one encoded chunk always fits inside a frame.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ChunkExceedsFrame`] otherwise.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let needed = self.chunk_size.get().saturating_add(MAX_FRAME_OVERHEAD);
        if needed > self.max_frame_length {
            return Err(ConfigError::ChunkExceedsFrame {
                chunk_size: self.chunk_size.get(),
                overhead: MAX_FRAME_OVERHEAD,
                max_frame_length: self.max_frame_length,
            });
        }
        Ok(())
    }
}

fn parse_number(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|err: std::num::ParseIntError| ConfigError::Invalid {
        key,
        value: raw.to_owned(),
        reason: err.to_string(),
    })
}

fn parse_seconds(key: &'static str, raw: &str) -> Result<Option<Duration>, ConfigError> {
    let secs = u64::try_from(parse_number(key, raw)?).map_err(|err| ConfigError::Invalid {
        key,
        value: raw.to_owned(),
        reason: err.to_string(),
    })?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
