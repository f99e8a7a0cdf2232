//! Configuration for the greeter client.

use std::path::PathBuf;
use std::time::Duration;

/// Address of the greeter service.
pub const DEFAULT_ADDRESS: &str = "localhost:50051";

/// Name the server certificate must be issued for.
pub const DEFAULT_DOMAIN_NAME: &str = "localhost";

/// Name sent in the request when none is given.
pub const DEFAULT_NAME: &str = "world";

/// Client certificate, signed by the intermediate CA.
pub const DEFAULT_CERT_PATH: &str = "../cert_key/4_client/certs/localhost.cert.pem";

/// Private key matching [`DEFAULT_CERT_PATH`].
pub const DEFAULT_KEY_PATH: &str = "../cert_key/4_client/private/localhost.key.pem";

/// Root and intermediate CA certificates, concatenated.
pub const DEFAULT_CA_CHAIN_PATH: &str = "../cert_key/2_intermediate/certs/ca-chain.cert.pem";

/// Deadline for the greeting call, measured from the start of the call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(1);

/// Longest call deadline that can be sent to the server.
pub const MAX_CALL_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on establishing the TCP connection and TLS session.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to reach the greeter service over mutual TLS.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// PEM file holding the client certificate, optionally followed by
    /// intermediates.
    pub cert_path: PathBuf,

    /// PEM file holding the client private key.
    pub key_path: PathBuf,

    /// PEM file holding the CA certificates used to verify the server.
    pub ca_chain_path: PathBuf,

    /// `host:port` of the server. A full `https://` URI is accepted as well.
    pub address: String,

    /// Hostname the server certificate is verified against.
    pub domain_name: String,

    /// Deadline for the call.
    pub call_timeout: Duration,

    /// Deadline for establishing the channel.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cert_path: DEFAULT_CERT_PATH.into(),
            key_path: DEFAULT_KEY_PATH.into(),
            ca_chain_path: DEFAULT_CA_CHAIN_PATH.into(),
            address: DEFAULT_ADDRESS.to_owned(),
            domain_name: DEFAULT_DOMAIN_NAME.to_owned(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with the default paths, address and timeouts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the client certificate and private key files.
    pub fn with_identity(
        mut self,
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        self.cert_path = cert_path.into();
        self.key_path = key_path.into();
        self
    }

    /// Set the CA chain file.
    pub fn with_ca_chain(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_chain_path = path.into();
        self
    }

    /// Set the server address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set the hostname the server certificate must match.
    pub fn with_domain_name(mut self, domain_name: impl Into<String>) -> Self {
        self.domain_name = domain_name.into();
        self
    }

    /// Set the call deadline.
    ///
    /// Deadlines longer than [`MAX_CALL_TIMEOUT`] are still enforced locally,
    /// but only [`MAX_CALL_TIMEOUT`] is sent to the server.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the connect deadline.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The URI the channel connects to.
    pub(crate) fn endpoint_uri(&self) -> String {
        if self.address.starts_with("https://") {
            self.address.clone()
        } else {
            format!("https://{}", self.address)
        }
    }
}
