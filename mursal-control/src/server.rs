//! Control server
//!
//! One Unix domain socket, one request/response exchange per connection.
//! Command semantics live entirely in the [`CommandHandler`]; this module
//! only owns the socket lifecycle (stale-socket reclaim, owner-only
//! permissions, shutdown cleanup) and the framed exchange.

use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    net::{UnixListener, UnixStream},
    sync::broadcast,
};

use crate::{
    ControlError, Request, Response, Result,
    framing::{self, MAX_REQUEST_FRAME},
};

/// A connection must complete its whole exchange within this window.
const EXCHANGE_DEADLINE: Duration = Duration::from_secs(30);

/// Handler trait for processing control requests
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle a request and return a response
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be processed
    async fn handle_request(&self, request: Request) -> Result<Response>;
}

/// Control server listening on a Unix domain socket
pub struct ControlServer {
    socket_path: String,
    handler: Arc<dyn CommandHandler>,
}

impl ControlServer {
    /// Create a new control server
    #[must_use]
    pub fn new(socket_path: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            socket_path: socket_path.into(),
            handler,
        }
    }

    /// Run until a shutdown signal is received.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be claimed or bound.
    pub async fn serve(
        &self,
        mut shutdown: broadcast::Receiver<mursal_common::Signal>,
    ) -> Result<()> {
        let listener = self.bind().await?;
        tracing::info!(socket = %self.socket_path, "Control server listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            let handler = Arc::clone(&self.handler);
                            tokio::spawn(exchange(stream, handler));
                        }
                        Err(e) => {
                            tracing::error!(socket = %self.socket_path, error = %e, "Accept failed");
                        }
                    }
                }
                sig = shutdown.recv() => {
                    match sig {
                        Ok(mursal_common::Signal::Shutdown | mursal_common::Signal::Finalised) => {
                            tracing::info!("Control server shutting down");
                        }
                        Err(e) => {
                            tracing::error!("Control server shutdown channel error: {e}");
                        }
                    }
                    break;
                }
            }
        }

        let _ = tokio::fs::remove_file(&self.socket_path).await;
        Ok(())
    }

    /// Claim the socket path and bind the listener.
    ///
    /// A leftover socket file is only an error while something answers on
    /// it; a dead one is reclaimed so a crashed instance never wedges its
    /// successor.
    async fn bind(&self) -> Result<UnixListener> {
        let path = Path::new(&self.socket_path);

        if path.exists() {
            if UnixStream::connect(path).await.is_ok() {
                return Err(ControlError::Io(std::io::Error::new(
                    std::io::ErrorKind::AddrInUse,
                    format!("another instance owns {}", self.socket_path),
                )));
            }
            tracing::info!(socket = %self.socket_path, "Reclaiming stale socket");
            tokio::fs::remove_file(path).await?;
        }

        let listener = UnixListener::bind(path)?;
        self.restrict_to_owner().await?;
        Ok(listener)
    }

    /// The control surface is administrative: owner read/write only.
    async fn restrict_to_owner(&self) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = tokio::fs::metadata(&self.socket_path).await?.permissions();
            perms.set_mode(0o600);
            tokio::fs::set_permissions(&self.socket_path, perms).await?;
        }
        Ok(())
    }
}

/// Run one request/response exchange, bounded by a single deadline.
async fn exchange(mut stream: UnixStream, handler: Arc<dyn CommandHandler>) {
    let result = tokio::time::timeout(EXCHANGE_DEADLINE, async {
        let request: Request = framing::read_frame(&mut stream, MAX_REQUEST_FRAME).await?;
        tracing::trace!(request = ?request, "Control request received");

        let response = handler
            .handle_request(request)
            .await
            .unwrap_or_else(|e| Response::error(e.to_string()));

        framing::write_frame(&mut stream, &response).await
    })
    .await
    .map_err(|_| ControlError::Timeout)
    .and_then(|inner| inner);

    if let Err(e) = result {
        tracing::debug!(error = %e, "Control exchange failed");
    }
}
