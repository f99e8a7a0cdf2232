//! A `helloworld.Greeter` client secured with mutual TLS.
//!
//! The client authenticates itself with a certificate issued by an
//! intermediate CA, verifies the server against that CA chain only, and
//! makes exactly one `SayHello` call.
//!
//! ```no_run
//! use helloworld_mtls::ClientConfig;
//!
//! let config = ClientConfig::new()
//!     .with_identity("client.cert.pem", "client.key.pem")
//!     .with_ca_chain("ca-chain.cert.pem");
//!
//! let greeting = helloworld_mtls::run(&config, Some("Alice".to_owned()))?;
//! println!("Greeting: {greeting}");
//! # Ok::<(), helloworld_mtls::Error>(())
//! ```
//!
//! Every step fails fast: credentials and trust anchors are loaded before a
//! connection is attempted, and nothing is retried.

pub mod channel;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod trust;

#[cfg(test)]
pub(crate) mod testutil;

/// Generated `helloworld` messages and service stubs.
pub mod pb {
    tonic::include_proto!("helloworld");
}

pub use channel::SecureChannel;
pub use config::ClientConfig;
pub use credentials::CredentialPair;
pub use error::Error;
pub use trust::TrustAnchors;

/// Load credentials and trust anchors, connect, and greet `name`.
///
/// `name` defaults to [`config::DEFAULT_NAME`]. Returns the server's greeting.
pub fn run(config: &ClientConfig, name: Option<String>) -> Result<String, Error> {
    let credentials = CredentialPair::load(&config.cert_path, &config.key_path)?;
    tracing::info!(chain_len = credentials.chain_len(), "credentials loaded");

    let trust = TrustAnchors::load(&config.ca_chain_path)?;
    tracing::info!(anchors = trust.len(), "trust anchors built");

    let channel = SecureChannel::open(config, &credentials, &trust)?;
    tracing::info!(addr = %config.address, "channel open");

    let name = name.unwrap_or_else(|| config::DEFAULT_NAME.to_owned());
    let message = client::say_hello(&channel, name, config.call_timeout)?;
    tracing::info!("call complete");

    Ok(message)
}
