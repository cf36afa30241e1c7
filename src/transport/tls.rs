//! TLS client configuration backed by the system trust store.

use std::sync::Arc;

use rustls::{ClientConfig, RootCertStore, pki_types::ServerName};
use tracing::debug;

use super::ConnectError;

/// Build a client configuration trusting the platform's root certificates.
///
/// # Errors
///
/// Returns [`ConnectError::TrustRoots`] if the store cannot be read and
/// [`ConnectError::NoTrustRoots`] if it holds no usable certificate.
pub fn system_client_config() -> Result<Arc<ClientConfig>, ConnectError> {
    let certs = rustls_native_certs::load_native_certs().map_err(ConnectError::TrustRoots)?;
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    debug!(added, ignored, "loaded system trust roots");
    if added == 0 {
        return Err(ConnectError::NoTrustRoots);
    }
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(Arc::new(config))
}

/// Split `target` into its host and port.
///
/// IPv6 literals may be bracketed (`[::1]:443`); the brackets are removed
/// from the returned host.
///
/// # Errors
///
/// Returns [`ConnectError::InvalidTarget`] when the port is missing or not a
/// valid `u16`, or the host is empty.
///
/// # Examples
///
/// ```
/// use sreeify::transport::split_target;
///
/// assert_eq!(
///     split_target("example.org:443").expect("valid"),
///     ("example.org", 443)
/// );
/// assert_eq!(split_target("[::1]:8443").expect("valid"), ("::1", 8443));
/// assert!(split_target("example.org").is_err());
/// ```
pub fn split_target(target: &str) -> Result<(&str, u16), ConnectError> {
    let invalid = || ConnectError::InvalidTarget {
        target: target.to_owned(),
    };
    let (host, port) = target.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    let host = host
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host, port))
}

/// Convert `host` into a TLS server name used for SNI and verification.
///
/// # Errors
///
/// Returns [`ConnectError::InvalidServerName`] when `host` is neither a DNS
/// name nor an IP address.
pub fn server_name(host: &str) -> Result<ServerName<'static>, ConnectError> {
    ServerName::try_from(host)
        .map(|name| name.to_owned())
        .map_err(|_| ConnectError::InvalidServerName {
            host: host.to_owned(),
        })
}
