//! Client driver: reads integer indices line by line, sends each as a
//! single request byte, and prints the server's response lines.
//!
//! Strictly sequential: the next input line is not touched until the
//! response for the previous request has been printed. There is no
//! timeout on the response read; a silent server blocks the driver.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{lookup_host, TcpStream};
use tracing::debug;

/// Run the driver against `host:port`, feeding it lines from `input`.
///
/// A blank line or end of input closes the connection and returns
/// normally. Lines that do not parse as an integer, are negative, or do
/// not fit in one request byte are skipped without sending anything.
pub async fn run<R>(host: &str, port: u16, mut input: R) -> Result<(), ClientError>
where
    R: AsyncBufRead + Unpin,
{
    let mut addrs = lookup_host((host, port))
        .await
        .map_err(|_| ClientError::UnknownHost(host.to_string()))?;
    let addr = addrs
        .next()
        .ok_or_else(|| ClientError::UnknownHost(host.to_string()))?;

    let stream = TcpStream::connect(addr)
        .await
        .map_err(ClientError::Connect)?;
    debug!(peer = %addr, "Connected");

    let (reader, mut writer) = stream.into_split();
    let mut responses = BufReader::new(reader);
    let mut line = String::new();
    let mut response = String::new();

    loop {
        line.clear();
        let n = input.read_line(&mut line).await.map_err(ClientError::Io)?;
        if n == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            // Blank line ends the session.
            break;
        }

        // Only values that fit in one request byte go on the wire.
        let index: u8 = match trimmed.parse::<i64>() {
            Ok(v) if (0..=255).contains(&v) => v as u8,
            _ => continue,
        };

        writer.write_all(&[index]).await.map_err(ClientError::Io)?;

        response.clear();
        let n = responses
            .read_line(&mut response)
            .await
            .map_err(ClientError::Io)?;
        if n == 0 {
            debug!("Server closed the connection");
            break;
        }

        println!("{}", response.trim_end());
    }

    Ok(())
}

/// Client-side failures
#[derive(Debug)]
pub enum ClientError {
    /// The host name did not resolve to any address.
    UnknownHost(String),
    /// The connection could not be established.
    Connect(io::Error),
    /// The connection failed after it was established.
    Io(io::Error),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::UnknownHost(host) => write!(f, "Unknown host '{}'", host),
            ClientError::Connect(e) => write!(f, "Failed to connect: {}", e),
            ClientError::Io(e) => write!(f, "Connection error: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio_test::assert_ok;

    /// A one-connection server that answers each request byte with the
    /// computed value line, then reports every byte it received.
    async fn spawn_scripted_server() -> (std::net::SocketAddr, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.push(buf[0]);
                let value = protocol::fib_binet(buf[0]);
                stream
                    .write_all(protocol::format_response(value).as_bytes())
                    .await
                    .unwrap();
            }
            received
        });

        (addr, handle)
    }

    #[tokio::test]
    async fn test_sends_valid_indices_in_order() {
        let (addr, server) = spawn_scripted_server().await;

        let input = &b"0\n10\n255\n\n"[..];
        tokio_test::assert_ok!(run("127.0.0.1", addr.port(), input).await);

        assert_eq!(server.await.unwrap(), vec![0, 10, 255]);
    }

    #[tokio::test]
    async fn test_unusable_lines_produce_no_traffic() {
        let (addr, server) = spawn_scripted_server().await;

        // Non-integer, negative, and oversized lines are all skipped.
        let input = &b"abc\n-5\n256\n3.14\n\n"[..];
        tokio_test::assert_ok!(run("127.0.0.1", addr.port(), input).await);

        assert_eq!(server.await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn test_blank_line_stops_before_later_input() {
        let (addr, server) = spawn_scripted_server().await;

        // The 7 after the blank line must never be sent.
        let input = &b"3\n\n7\n"[..];
        run("127.0.0.1", addr.port(), input).await.unwrap();

        assert_eq!(server.await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_input_eof_ends_session() {
        let (addr, server) = spawn_scripted_server().await;

        let input = &b"2\n"[..];
        run("127.0.0.1", addr.port(), input).await.unwrap();

        assert_eq!(server.await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        // Bind then drop to get a port that is very likely closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let input = &b"1\n"[..];
        match run("127.0.0.1", port, input).await {
            Err(ClientError::Connect(_)) => {}
            other => panic!("unexpected: {:?}", other.map(|_| "connected")),
        }
    }

    #[tokio::test]
    async fn test_unresolvable_host_fails() {
        let input = &b"1\n"[..];
        match run("definitely-not-a-real-host.invalid", 80, input).await {
            Err(ClientError::UnknownHost(host)) => {
                assert_eq!(host, "definitely-not-a-real-host.invalid");
            }
            other => panic!("unexpected: {:?}", other.map(|_| "connected")),
        }
    }
}
