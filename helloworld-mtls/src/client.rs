//! The single greeting call.

use std::time::{Duration, Instant};

use tonic::{Code, Request};

use crate::config::MAX_CALL_TIMEOUT;
use crate::pb::{HelloRequest, greeter_client::GreeterClient};
use crate::{Error, SecureChannel};

/// Call `SayHello` for `name` over `channel` and return the greeting.
///
/// The call is abandoned once `timeout` has passed since it started. The
/// same deadline, capped at [`MAX_CALL_TIMEOUT`], is sent to the server in
/// the `grpc-timeout` header.
pub fn say_hello(
    channel: &SecureChannel,
    name: impl Into<String>,
    timeout: Duration,
) -> Result<String, Error> {
    let mut client = GreeterClient::new(channel.channel());
    let request = hello_request(name.into(), timeout);

    tracing::info!(name = %request.get_ref().name, ?timeout, "sending request");

    let started = Instant::now();
    let result = channel.block_on(async {
        tokio::time::timeout(timeout, client.say_hello(request)).await
    });

    match result {
        Ok(Ok(response)) => {
            let message = response.into_inner().message;
            tracing::debug!(elapsed = ?started.elapsed(), "got a response");
            Ok(message)
        }
        Ok(Err(status))
            if status.code() == Code::DeadlineExceeded || started.elapsed() >= timeout =>
        {
            tracing::debug!(%status, "deadline reached");
            Err(Error::CallTimeout { timeout })
        }
        Ok(Err(status)) => Err(Error::CallRemote(status)),
        Err(_elapsed) => Err(Error::CallTimeout { timeout }),
    }
}

pub(crate) fn hello_request(name: String, timeout: Duration) -> Request<HelloRequest> {
    let mut request = Request::new(HelloRequest { name });
    request.set_timeout(timeout.min(MAX_CALL_TIMEOUT));
    request
}
