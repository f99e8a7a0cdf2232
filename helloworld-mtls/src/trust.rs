//! The set of certificate authorities the server certificate is verified against.

use std::fs;
use std::path::Path;

use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;
use rustls::pki_types::pem::{self as pki_pem, SectionKind};
use tonic::transport::Certificate;

use crate::Error;

/// Trust anchors built from a PEM CA chain.
///
/// Only certificates that parse as X.509 are kept. An anchor set is never
/// empty.
#[derive(Debug, Clone)]
pub struct TrustAnchors {
    certs: Vec<CertificateDer<'static>>,
}

impl TrustAnchors {
    /// Read a CA chain file and build the anchor set from it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let pem = fs::read(path).map_err(|source| Error::TrustChainRead {
            path: path.to_owned(),
            source,
        })?;

        let anchors = Self::from_pem(&pem)?;
        tracing::debug!(path = %path.display(), anchors = anchors.len(), "loaded CA chain");
        Ok(anchors)
    }

    /// Build the anchor set from one or more concatenated PEM certificates.
    ///
    /// Blocks other than `CERTIFICATE` are ignored. Blocks that fail to
    /// decode and certificates that do not parse are skipped, and decoding
    /// carries on with the next block. Fails if no certificate was accepted.
    pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self, Error> {
        let mut roots = RootCertStore::empty();
        let mut certs = Vec::new();
        let mut rejected = 0;

        for section in pem_sections(pem.as_ref()) {
            let der = match pki_pem::from_buf(&mut &section[..]) {
                Ok(Some((SectionKind::Certificate, der))) => der,
                Ok(_) => continue,
                Err(error) => {
                    tracing::debug!(%error, "skipping malformed PEM block in CA chain");
                    rejected += 1;
                    continue;
                }
            };

            let cert = CertificateDer::from(der);
            match roots.add(cert.clone()) {
                Ok(()) => certs.push(cert),
                Err(error) => {
                    tracing::debug!(%error, "skipping unparsable CA certificate");
                    rejected += 1;
                }
            }
        }

        if certs.is_empty() {
            return Err(Error::TrustChainParse { rejected });
        }

        Ok(Self { certs })
    }

    /// Number of accepted anchors.
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// Whether the set holds no anchors. A successfully built set never does.
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// The accepted anchors re-encoded as one PEM bundle.
    pub(crate) fn ca_certificate(&self) -> Certificate {
        let blocks = self
            .certs
            .iter()
            .map(|cert| pem::Pem::new("CERTIFICATE", cert.as_ref()))
            .collect::<Vec<_>>();
        Certificate::from_pem(pem::encode_many(&blocks))
    }
}

/// Splits `input` into `-----BEGIN` .. `-----END ...-----` blocks so that a
/// block which fails to decode does not hide the ones after it. Text outside
/// blocks is dropped. An unterminated block runs to the end of the input.
fn pem_sections(input: &[u8]) -> impl Iterator<Item = &[u8]> {
    const BEGIN: &[u8] = b"-----BEGIN";
    const END: &[u8] = b"-----END";

    let mut rest = input;
    std::iter::from_fn(move || {
        let start = find(rest, BEGIN)?;
        let block = &rest[start..];
        let len = match find(&block[BEGIN.len()..], END) {
            Some(end) => {
                let end = BEGIN.len() + end;
                block[end..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(block.len(), |nl| end + nl + 1)
            }
            None => block.len(),
        };
        rest = &block[len..];
        Some(&block[..len])
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
