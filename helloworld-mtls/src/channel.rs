//! The mutually authenticated channel to the greeter service.

use std::future::Future;

use tokio::runtime::{Builder, Runtime};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

use crate::{ClientConfig, CredentialPair, Error, TrustAnchors};

/// One TLS-secured HTTP/2 connection, together with the runtime driving it.
///
/// Dropping the value closes the connection.
#[derive(Debug)]
pub struct SecureChannel {
    // Fields drop in declaration order; the channel has to go before the
    // runtime its background task lives on.
    channel: Channel,
    rt: Runtime,
}

impl SecureChannel {
    /// Connect to `config.address`, blocking until the TLS session is up.
    ///
    /// The client presents `credentials` when the server asks for a
    /// certificate, and accepts the server only if its chain leads to one of
    /// `trust` and names `config.domain_name`. The platform trust store is
    /// never consulted.
    pub fn open(
        config: &ClientConfig,
        credentials: &CredentialPair,
        trust: &TrustAnchors,
    ) -> Result<Self, Error> {
        let rt = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::channel_open(&config.address, e))?;

        let endpoint = Endpoint::from_shared(config.endpoint_uri())
            .map_err(|e| Error::channel_open(&config.address, e))?
            .connect_timeout(config.connect_timeout)
            .tls_config(tls_config(config, credentials, trust))
            .map_err(|e| Error::channel_open(&config.address, e))?;

        tracing::debug!(uri = %endpoint.uri(), domain = %config.domain_name, "connecting");

        let channel = rt
            .block_on(endpoint.connect())
            .map_err(|e| Error::channel_open(&config.address, e))?;

        Ok(Self { channel, rt })
    }

    pub(crate) fn channel(&self) -> Channel {
        self.channel.clone()
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.rt.block_on(future)
    }
}

fn tls_config(
    config: &ClientConfig,
    credentials: &CredentialPair,
    trust: &TrustAnchors,
) -> ClientTlsConfig {
    ClientTlsConfig::new()
        .domain_name(config.domain_name.clone())
        .ca_certificate(trust.ca_certificate())
        .identity(credentials.identity())
}
