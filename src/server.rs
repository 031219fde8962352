//! TCP server side: the connection acceptor and per-connection value
//! stream handlers.
//!
//! The acceptor binds one listening socket and spawns a task per accepted
//! connection, so the accept loop never waits on handler work. Each handler
//! owns its connection exclusively; there is no state shared between them.

use crate::config::Config;
use crate::protocol;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Server instance
pub struct Server {
    addr: String,
    idle_timeout: Option<Duration>,
    connection_limit: Arc<Semaphore>,
}

impl Server {
    /// Create a new server instance listening on `port`.
    pub fn new(config: &Config, port: u16) -> Self {
        Server {
            addr: format!("{}:{}", config.bind_host, port),
            idle_timeout: (config.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(config.idle_timeout_secs)),
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
        }
    }

    /// Bind the listening socket and begin accepting connections.
    ///
    /// Does not return under normal operation; `Err` means the server
    /// could not start or the accept loop hit a non-recoverable failure.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(ServerError::Bind)?;
        info!(address = %self.addr, "Server listening");

        self.serve(listener).await
    }

    async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        loop {
            // Wait for a connection slot
            let permit = self
                .connection_limit
                .clone()
                .acquire_owned()
                .await
                .expect("connection semaphore is never closed");

            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(peer = %addr, "New connection");

                    let idle_timeout = self.idle_timeout;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, idle_timeout).await {
                            debug!(error = %e, "Connection error");
                        }
                        drop(permit);
                    });
                }
                Err(e) if is_transient_accept_error(&e) => {
                    warn!(error = %e, "Transient accept failure, continuing");
                }
                Err(e) => return Err(ServerError::Accept(e)),
            }
        }
    }
}

/// Accept errors that concern one would-be connection rather than the
/// listening socket itself; the loop keeps serving after these.
fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::Interrupted
    )
}

/// Handle a single client connection: one request byte in, one value
/// line out, until the peer closes or I/O fails.
async fn handle_connection(
    mut stream: TcpStream,
    idle_timeout: Option<Duration>,
) -> io::Result<()> {
    let mut buf = [0u8; 1];

    loop {
        let n = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.read(&mut buf)).await {
                Ok(result) => result?,
                Err(_) => {
                    debug!("Idle timeout, closing connection");
                    return Ok(());
                }
            },
            None => stream.read(&mut buf).await?,
        };

        // A zero-length read is the transport's end-of-stream signal, not
        // a request for index 0.
        if n == 0 {
            debug!("Connection closed by client");
            return Ok(());
        }

        let value = protocol::fib_binet(buf[0]);
        stream
            .write_all(protocol::format_response(value).as_bytes())
            .await?;
    }
}

/// Fatal server errors
#[derive(Debug)]
pub enum ServerError {
    /// The listening socket could not be bound; the server never starts.
    Bind(io::Error),
    /// The accept loop failed on the listening socket; the server stops.
    Accept(io::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Bind(e) => write!(f, "Failed to bind listening socket: {}", e),
            ServerError::Accept(e) => write!(f, "Failed to accept connection: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}
