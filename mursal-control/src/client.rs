//! Client for connecting to the control socket

use std::time::Duration;

use tokio::net::UnixStream;

use crate::{
    ControlError, Request, Response, Result,
    framing::{self, MAX_RESPONSE_FRAME},
};

/// Client for communicating with the mursal control server
pub struct ControlClient {
    socket_path: String,
    timeout: Duration,
}

impl ControlClient {
    /// Create a new control client with the given socket path
    #[must_use]
    pub fn new(socket_path: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a request and receive a response
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails, the protocol is
    /// violated, or the exchange times out.
    pub async fn send_request(&self, request: Request) -> Result<Response> {
        tokio::time::timeout(self.timeout, self.exchange(request))
            .await
            .map_err(|_| ControlError::Timeout)?
    }

    async fn exchange(&self, request: Request) -> Result<Response> {
        tracing::debug!(socket = %self.socket_path, "Connecting to control socket");
        let mut stream = UnixStream::connect(&self.socket_path).await?;

        framing::write_frame(&mut stream, &request).await?;
        framing::read_frame(&mut stream, MAX_RESPONSE_FRAME).await
    }
}
