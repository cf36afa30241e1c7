//! Dialing the transform service with retry and back-off.

use std::{fmt, io, sync::Arc};

use log::warn;
use rustls::{ClientConfig, pki_types::ServerName};
use tokio::{net::TcpStream, time::sleep};
use tokio_rustls::TlsConnector;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::info;

use super::{BackoffConfig, ConnectError, TransportStream, server_name, split_target, tls};

/// Default ceiling on a single length-delimited frame (4 MiB).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 4 * 1024 * 1024;

/// Framed duplex connection to the transform service.
pub type FramedTransport = Framed<TransportStream, LengthDelimitedCodec>;

/// How the connection is protected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SecurityMode {
    /// Unencrypted TCP.
    Plaintext,
    /// TLS verified against the system trust roots.
    #[default]
    Tls,
}

impl SecurityMode {
    /// Select [`SecurityMode::Plaintext`] when `insecure` is set.
    #[must_use]
    pub const fn from_insecure(insecure: bool) -> Self {
        if insecure { Self::Plaintext } else { Self::Tls }
    }
}

#[derive(Clone)]
struct TlsSettings {
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

/// Establishes framed connections to one target.
///
/// # Examples
///
/// ```no_run
/// use sreeify::transport::{Connector, SecurityMode};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), sreeify::transport::ConnectError> {
/// let connector = Connector::new("127.0.0.1:9000", SecurityMode::Plaintext)?;
/// let _framed = connector.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Connector {
    target: String,
    backoff: BackoffConfig,
    max_frame_length: usize,
    tls: Option<TlsSettings>,
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("target", &self.target)
            .field("tls", &self.tls.is_some())
            .field("backoff", &self.backoff)
            .field("max_frame_length", &self.max_frame_length)
            .finish()
    }
}

impl Connector {
    /// Prepare a connector for `target` (`host:port`).
    ///
    /// TLS connectors load the system trust roots eagerly so a broken store
    /// fails here rather than on every dial.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] when the target is malformed, the host is not
    /// a valid server name, or no trust roots are available.
    pub fn new(target: impl Into<String>, security: SecurityMode) -> Result<Self, ConnectError> {
        let target = target.into();
        let tls = match security {
            SecurityMode::Plaintext => {
                split_target(&target)?;
                None
            }
            SecurityMode::Tls => Some(Self::tls_settings(&target, tls::system_client_config()?)?),
        };
        Ok(Self {
            target,
            backoff: BackoffConfig::default(),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            tls,
        })
    }

    /// Prepare a TLS connector that trusts the roots in `config` instead of
    /// the system store.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] when the target or server name is invalid.
    pub fn with_tls_config(
        target: impl Into<String>,
        config: Arc<ClientConfig>,
    ) -> Result<Self, ConnectError> {
        let target = target.into();
        let tls = Self::tls_settings(&target, config)?;
        Ok(Self {
            target,
            backoff: BackoffConfig::default(),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            tls: Some(tls),
        })
    }

    fn tls_settings(target: &str, config: Arc<ClientConfig>) -> Result<TlsSettings, ConnectError> {
        let (host, _) = split_target(target)?;
        Ok(TlsSettings {
            connector: TlsConnector::from(config),
            server_name: server_name(host)?,
        })
    }

    /// Replace the back-off applied between dial attempts.
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the largest frame accepted in either direction.
    #[must_use]
    pub fn max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }

    /// Target this connector dials.
    #[must_use]
    pub fn target(&self) -> &str { &self.target }

    /// Dial until a connection is established or attempts run out.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Exhausted`] carrying the last I/O error once
    /// `max_attempts` dials have failed.
    pub async fn connect(&self) -> Result<FramedTransport, ConnectError> {
        let backoff = self.backoff.normalized();
        let mut retry = 0_u32;
        loop {
            match self.dial().await {
                Ok(stream) => {
                    info!(
                        target_addr = %self.target,
                        tls = stream.is_tls(),
                        attempts = retry + 1,
                        "connected to transform service"
                    );
                    return Ok(Framed::new(stream, self.codec()));
                }
                Err(error) => {
                    let attempts = retry + 1;
                    if attempts >= backoff.max_attempts {
                        return Err(ConnectError::Exhausted {
                            target: self.target.clone(),
                            attempts,
                            source: error,
                        });
                    }
                    let delay = backoff.jittered(retry);
                    warn!(
                        "connect error: target={}, attempt={attempts}, error={error}, \
                         retry_in={delay:?}",
                        self.target
                    );
                    sleep(delay).await;
                    retry += 1;
                }
            }
        }
    }

    async fn dial(&self) -> io::Result<TransportStream> {
        let tcp = TcpStream::connect(self.target.as_str()).await?;
        tcp.set_nodelay(true)?;
        match &self.tls {
            None => Ok(TransportStream::Plain(tcp)),
            Some(tls) => {
                let stream = tls.connector.connect(tls.server_name.clone(), tcp).await?;
                Ok(TransportStream::Tls(Box::new(stream)))
            }
        }
    }

    fn codec(&self) -> LengthDelimitedCodec {
        LengthDelimitedCodec::builder()
            .max_frame_length(self.max_frame_length)
            .new_codec()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::net::TcpListener;

    use super::{Connector, SecurityMode};
    use crate::transport::{BackoffConfig, ConnectError};

    fn quick_backoff(max_attempts: u32) -> BackoffConfig {
        BackoffConfig {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            max_attempts,
            ..BackoffConfig::default()
        }
    }

    #[test]
    fn insecure_flag_selects_plaintext() {
        assert_eq!(SecurityMode::from_insecure(true), SecurityMode::Plaintext);
        assert_eq!(SecurityMode::from_insecure(false), SecurityMode::Tls);
    }

    #[test]
    fn plaintext_connector_validates_target() {
        let err = Connector::new("missing-port", SecurityMode::Plaintext)
            .expect_err("target without port rejected");
        assert!(matches!(err, ConnectError::InvalidTarget { .. }));
    }

    #[tokio::test]
    async fn plaintext_connect_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });

        let connector = Connector::new(addr.to_string(), SecurityMode::Plaintext)
            .expect("valid target")
            .backoff(quick_backoff(1));
        let framed = connector.connect().await.expect("connect");
        assert!(!framed.get_ref().is_tls());
        accept.await.expect("join accept").expect("accept");
    }

    #[tokio::test]
    async fn connect_gives_up_after_max_attempts() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind placeholder listener");
        let addr = listener.local_addr().expect("listener address");
        drop(listener);

        let connector = Connector::new(addr.to_string(), SecurityMode::Plaintext)
            .expect("valid target")
            .backoff(quick_backoff(3));
        let err = connector.connect().await.expect_err("nothing listening");
        assert!(matches!(err, ConnectError::Exhausted { attempts: 3, .. }));
    }
}
