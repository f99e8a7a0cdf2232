use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use helloworld_mtls::config::MAX_CALL_TIMEOUT;
use helloworld_mtls::{ClientConfig, Error, error::display_chain};
use tracing_subscriber::EnvFilter;

/// Say hello to a greeter service over mutual TLS.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Name to greet.
    #[arg(default_value = helloworld_mtls::config::DEFAULT_NAME)]
    name: String,

    /// Client certificate (PEM), optionally followed by intermediates.
    #[arg(long, default_value = helloworld_mtls::config::DEFAULT_CERT_PATH)]
    cert: PathBuf,

    /// Client private key (PEM).
    #[arg(long, default_value = helloworld_mtls::config::DEFAULT_KEY_PATH)]
    key: PathBuf,

    /// CA certificates (PEM) the server certificate must chain to.
    #[arg(long = "ca-chain", default_value = helloworld_mtls::config::DEFAULT_CA_CHAIN_PATH)]
    ca_chain: PathBuf,

    /// Server address as `host:port`.
    #[arg(long, default_value = helloworld_mtls::config::DEFAULT_ADDRESS)]
    addr: String,

    /// Name the server certificate must be issued for.
    #[arg(long = "domain-name", default_value = helloworld_mtls::config::DEFAULT_DOMAIN_NAME)]
    domain_name: String,

    /// Call deadline in milliseconds, at most one day.
    #[arg(
        long = "timeout-ms",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..=MAX_CALL_TIMEOUT.as_millis() as u64),
    )]
    timeout_ms: u64,
}

impl Args {
    fn into_parts(self) -> (ClientConfig, String) {
        let config = ClientConfig::new()
            .with_identity(self.cert, self.key)
            .with_ca_chain(self.ca_chain)
            .with_address(self.addr)
            .with_domain_name(self.domain_name)
            .with_call_timeout(Duration::from_millis(self.timeout_ms));
        (config, self.name)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (config, name) = Args::parse().into_parts();

    let result = helloworld_mtls::run(&config, Some(name));
    report(result, &mut io::stdout().lock())
}

/// Print the greeting to `out`, or log the failure; returns the exit code.
fn report(result: Result<String, Error>, out: &mut impl Write) -> ExitCode {
    match result {
        Ok(message) => match writeln!(out, "Greeting: {message}") {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!(%err, "failed to write greeting");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            tracing::error!(stage = err.stage(), "{}", display_chain(&err));
            ExitCode::FAILURE
        }
    }
}
