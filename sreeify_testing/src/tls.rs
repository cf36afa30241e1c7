//! Throwaway TLS identities for loopback tests.
//!
//! [`TestIdentity::generate`] mints a self-signed certificate for
//! `localhost`. The server half feeds [`ServerOptions::tls`] and the client
//! half trusts only that certificate, so handshakes succeed without touching
//! the system trust store.
//!
//! [`ServerOptions::tls`]: crate::ServerOptions::tls

use std::{io, sync::Arc};

use rustls::{
    ClientConfig,
    RootCertStore,
    ServerConfig,
    pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer},
};

/// Host name the generated certificate is valid for.
pub const TEST_HOST: &str = "localhost";

/// Matching server and client TLS configurations.
#[derive(Clone, Debug)]
pub struct TestIdentity {
    server: Arc<ServerConfig>,
    client: Arc<ClientConfig>,
}

impl TestIdentity {
    /// Generate a fresh self-signed certificate for [`TEST_HOST`].
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be generated or rustls
    /// rejects it.
    pub fn generate() -> io::Result<Self> {
        let cert = rcgen::generate_simple_self_signed(vec![TEST_HOST.to_owned()])
            .map_err(io::Error::other)?;
        let cert_der = CertificateDer::from(cert.serialize_der().map_err(io::Error::other)?);
        let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
            cert.serialize_private_key_der(),
        ));

        let server = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der.clone()], key_der)
            .map_err(io::Error::other)?;

        let mut roots = RootCertStore::empty();
        roots.add(cert_der).map_err(io::Error::other)?;
        let client = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            server: Arc::new(server),
            client: Arc::new(client),
        })
    }

    /// Configuration presenting the certificate to clients.
    #[must_use]
    pub fn server_config(&self) -> Arc<ServerConfig> { Arc::clone(&self.server) }

    /// Configuration trusting only the generated certificate.
    #[must_use]
    pub fn client_config(&self) -> Arc<ClientConfig> { Arc::clone(&self.client) }
}
