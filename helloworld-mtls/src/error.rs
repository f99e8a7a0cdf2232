//! Error types for the greeter client.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every way a greeter run can fail.
///
/// None of these are recovered from; the binary reports the error and exits.
#[derive(Debug, Error)]
pub enum Error {
    /// The client certificate or private key could not be loaded.
    #[error("failed to load client credentials from {}", path.display())]
    CredentialLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The CA chain file could not be read.
    #[error("failed to read CA chain from {}", path.display())]
    TrustChainRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The CA chain did not contain a single usable certificate.
    #[error("failed to parse any trust anchor from the CA chain ({rejected} rejected)")]
    TrustChainParse { rejected: usize },

    /// The secured channel could not be established.
    #[error("failed to connect to {addr}")]
    ChannelOpen {
        addr: String,
        #[source]
        source: BoxError,
    },

    /// The call did not complete before its deadline.
    #[error("call did not complete within {timeout:?}")]
    CallTimeout { timeout: Duration },

    /// The call completed with a non-OK status.
    #[error("call failed with status {:?}", .0.code())]
    CallRemote(#[source] tonic::Status),
}

impl Error {
    /// Name of the stage that failed, suitable as a log field.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::CredentialLoad { .. } => "credentials",
            Error::TrustChainRead { .. } | Error::TrustChainParse { .. } => "trust",
            Error::ChannelOpen { .. } => "channel",
            Error::CallTimeout { .. } | Error::CallRemote(_) => "call",
        }
    }

    pub(crate) fn credential_load(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Error::CredentialLoad {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn channel_open(addr: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::ChannelOpen {
            addr: addr.into(),
            source: source.into(),
        }
    }
}

/// Renders an error and all of its sources on one line, joined by `": "`.
pub fn display_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
