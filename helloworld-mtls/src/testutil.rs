//! Test utilities: a throwaway PKI and a mutual-TLS greeter server.

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair,
    KeyUsagePurpose,
};
use tempfile::TempDir;
use tokio::{net::TcpListener, runtime::Runtime, sync::oneshot};
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};
use tonic::{Request, Response, Status};

use crate::ClientConfig;
use crate::pb::{
    HelloReply, HelloRequest,
    greeter_server::{Greeter, GreeterServer},
};

/// Root CA → intermediate CA → leaves, written out as PEM files the way the
/// client expects to find them.
pub(crate) struct Pki {
    dir: TempDir,
    /// Client leaf followed by the intermediate.
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
    /// Intermediate followed by the root.
    pub ca_chain: PathBuf,
    /// Server leaf followed by the intermediate.
    pub server_cert: String,
    pub server_key: String,
}

impl Pki {
    /// Generate a PKI whose server certificate is issued for `localhost`.
    pub(crate) fn generate() -> Self {
        let dir = tempfile::tempdir().unwrap();

        let root_key = KeyPair::generate().unwrap();
        let root_params = ca_params("Greeter Test Root CA");
        let root_cert = root_params.self_signed(&root_key).unwrap();
        let root = Issuer::new(root_params, root_key);

        let intermediate_key = KeyPair::generate().unwrap();
        let intermediate_params = ca_params("Greeter Test Intermediate CA");
        let intermediate_cert = intermediate_params
            .signed_by(&intermediate_key, &root)
            .unwrap();
        let intermediate = Issuer::new(intermediate_params, intermediate_key);

        let server_key = KeyPair::generate().unwrap();
        let server_cert = leaf_params(ExtendedKeyUsagePurpose::ServerAuth)
            .signed_by(&server_key, &intermediate)
            .unwrap();

        let client_key = KeyPair::generate().unwrap();
        let client_cert = leaf_params(ExtendedKeyUsagePurpose::ClientAuth)
            .signed_by(&client_key, &intermediate)
            .unwrap();

        let client_chain = format!("{}{}", client_cert.pem(), intermediate_cert.pem());
        let ca_chain = format!("{}{}", intermediate_cert.pem(), root_cert.pem());

        Self {
            client_cert: write_file(&dir, "localhost.cert.pem", client_chain),
            client_key: write_file(&dir, "localhost.key.pem", client_key.serialize_pem()),
            ca_chain: write_file(&dir, "ca-chain.cert.pem", ca_chain),
            server_cert: format!("{}{}", server_cert.pem(), intermediate_cert.pem()),
            server_key: server_key.serialize_pem(),
            dir,
        }
    }

    /// A path inside the PKI directory.
    pub(crate) fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `contents` to a file inside the PKI directory.
    pub(crate) fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        write_file(&self.dir, name, contents)
    }

    /// Client configuration pointing at this PKI and at `addr`.
    pub(crate) fn client_config(&self, addr: SocketAddr) -> ClientConfig {
        ClientConfig::new()
            .with_identity(&self.client_cert, &self.client_key)
            .with_ca_chain(&self.ca_chain)
            .with_address(addr.to_string())
            .with_domain_name("localhost")
            .with_connect_timeout(Duration::from_secs(2))
    }

    fn ca_pem(&self) -> String {
        fs::read_to_string(&self.ca_chain).unwrap()
    }
}

fn write_file(dir: &TempDir, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn ca_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::default();
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params
}

fn leaf_params(usage: ExtendedKeyUsagePurpose) -> CertificateParams {
    let mut params = CertificateParams::new(vec!["localhost".to_owned()]).unwrap();
    params.distinguished_name.push(DnType::CommonName, "localhost");
    params.extended_key_usages = vec![usage];
    params
}

struct MyGreeter {
    delay: Duration,
}

#[tonic::async_trait]
impl Greeter for MyGreeter {
    async fn say_hello(&self, req: Request<HelloRequest>) -> Result<Response<HelloReply>, Status> {
        let presented = req.peer_certs().map_or(0, |certs| certs.len());
        if presented == 0 {
            return Err(Status::unauthenticated("no client certificate"));
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let name = req.into_inner().name;
        if name.is_empty() {
            return Err(Status::invalid_argument("name must not be empty"));
        }

        Ok(Response::new(HelloReply {
            message: format!("Hello {name}!"),
        }))
    }
}

/// Options for [`TestServer`].
#[derive(Default)]
pub(crate) struct TestServerBuilder {
    delay: Duration,
}

impl TestServerBuilder {
    /// Wait this long before answering each call.
    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Start serving on an ephemeral port with the server identity of `pki`,
    /// requiring client certificates issued under its CA chain.
    pub(crate) fn spawn(self, pki: &Pki) -> TestServer {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();

        let tls = ServerTlsConfig::new()
            .identity(Identity::from_pem(&pki.server_cert, &pki.server_key))
            .client_ca_root(Certificate::from_pem(pki.ca_pem()));

        // Bind to an ephemeral port (random free port assigned by OS)
        let listener = rt.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
        let addr = listener.local_addr().unwrap();
        let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);

        let (tx, rx) = oneshot::channel::<()>();
        let svc = GreeterServer::new(MyGreeter { delay: self.delay });

        rt.spawn(async move {
            let res = Server::builder()
                .tls_config(tls)
                .unwrap()
                .add_service(svc)
                .serve_with_incoming_shutdown(incoming, async {
                    let _ = rx.await;
                })
                .await;
            if let Err(e) = res {
                eprintln!("Server error: {e}");
            }
        });

        TestServer {
            addr,
            shutdown: Some(tx),
            rt: Some(rt),
        }
    }
}

/// A greeter server running on its own runtime until dropped.
pub(crate) struct TestServer {
    /// Server address.
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    rt: Option<Runtime>,
}

impl TestServer {
    pub(crate) fn builder() -> TestServerBuilder {
        TestServerBuilder::default()
    }

    pub(crate) fn spawn(pki: &Pki) -> Self {
        Self::builder().spawn(pki)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(rt) = self.rt.take() {
            rt.shutdown_timeout(Duration::from_secs(1));
        }
    }
}
