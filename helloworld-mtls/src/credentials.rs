//! Loading of the client certificate and private key.

use std::fmt;
use std::fs;
use std::path::Path;

use rustls::crypto::ring::sign::any_supported_type;
use rustls::pki_types::{pem::PemObject as _, CertificateDer, PrivateKeyDer};
use tonic::transport::Identity;

use crate::Error;

/// A client certificate chain and its private key.
///
/// The PEM text is kept as read so it can be handed to the transport
/// unchanged. Both halves have been decoded once to make sure they are
/// usable before any connection is attempted.
#[derive(Clone)]
pub struct CredentialPair {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
    chain_len: usize,
}

impl CredentialPair {
    /// Read and check a PEM certificate file and a PEM private key file.
    ///
    /// The certificate file must hold at least one certificate; the first is
    /// the leaf and any that follow are sent to the server as intermediates.
    /// The key may be PKCS#1, PKCS#8 or SEC1 encoded and must be a key type
    /// the TLS stack can sign with.
    pub fn load(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<Self, Error> {
        let cert_path = cert_path.as_ref();
        let key_path = key_path.as_ref();

        let cert_pem = fs::read(cert_path).map_err(|e| Error::credential_load(cert_path, e))?;
        let key_pem = fs::read(key_path).map_err(|e| Error::credential_load(key_path, e))?;

        let chain_len = check_chain(&cert_pem).map_err(|e| Error::credential_load(cert_path, e))?;
        check_key(&key_pem).map_err(|e| Error::credential_load(key_path, e))?;

        tracing::debug!(
            cert = %cert_path.display(),
            key = %key_path.display(),
            chain_len,
            "loaded client credentials"
        );

        Ok(Self {
            cert_pem,
            key_pem,
            chain_len,
        })
    }

    /// Number of certificates presented to the server, leaf included.
    pub fn chain_len(&self) -> usize {
        self.chain_len
    }

    pub(crate) fn identity(&self) -> Identity {
        Identity::from_pem(&self.cert_pem, &self.key_pem)
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("chain_len", &self.chain_len)
            .field("key", &"<redacted>")
            .finish()
    }
}

fn check_chain(pem: &[u8]) -> Result<usize, crate::error::BoxError> {
    let chain = CertificateDer::pem_slice_iter(pem).collect::<Result<Vec<_>, _>>()?;
    if chain.is_empty() {
        return Err("no PEM encoded certificate found".into());
    }
    Ok(chain.len())
}

fn check_key(pem: &[u8]) -> Result<(), crate::error::BoxError> {
    let key = PrivateKeyDer::from_pem_slice(pem)?;
    any_supported_type(&key)?;
    Ok(())
}
