//! Overlay web server
//!
//! Serves the browser overlay, a JSON snapshot of the counter, and a
//! server-sent event stream that pushes every published change.
//!
//! Each connection runs in its own task and talks to the poller only through
//! the [`DeathCounter`] hub.

pub mod http;

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::hub::DeathCounter;
use http::{EVENT_STREAM_HEAD, Request, RequestError, Response, read_request_head, sse_frame};

/// Time allowed for a client to send its request head.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

const OVERLAY_HTML: &str = include_str!("overlay.html");

#[derive(Debug, Error)]
pub enum WebError {
    #[error("failed to bind web server on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },
}

pub struct WebServer {
    listener: TcpListener,
    counter: Arc<DeathCounter>,
}

impl WebServer {
    /// Bind on all interfaces. Port 0 picks a free port.
    pub async fn bind(port: u16, counter: Arc<DeathCounter>) -> Result<Self, WebError> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(|source| WebError::Bind { port, source })?;
        Ok(Self { listener, counter })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` changes or its sender is dropped.
    ///
    /// Open event streams observe the same signal and close themselves.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) {
        if let Ok(addr) = self.local_addr() {
            info!(%addr, "Web server listening");
        }

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let counter = Arc::clone(&self.counter);
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, counter, shutdown).await {
                                debug!(%peer, error = %e, "Connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
                _ = shutdown.changed() => break,
            }
        }

        debug!("Web server stopped");
    }
}

async fn handle_connection(
    stream: TcpStream,
    counter: Arc<DeathCounter>,
    shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = match tokio::time::timeout(READ_TIMEOUT, read_request_head(&mut reader)).await {
        Ok(Ok(request)) => request,
        Ok(Err(RequestError::Closed)) | Err(_) => return Ok(()),
        Ok(Err(RequestError::Io(e))) => return Err(e),
        Ok(Err(RequestError::TooLarge)) => {
            return respond(&mut writer, Response::error(431, "Request Header Fields Too Large"))
                .await;
        }
        Ok(Err(RequestError::Malformed)) => {
            return respond(&mut writer, Response::error(400, "Bad Request")).await;
        }
    };

    if request.method != "GET" {
        return respond(&mut writer, Response::error(405, "Method Not Allowed")).await;
    }

    match request.path.as_str() {
        "/api/events" => stream_events(reader, writer, &counter, shutdown).await,
        _ => respond(&mut writer, route(&request, &counter)?).await,
    }
}

fn route(request: &Request, counter: &DeathCounter) -> io::Result<Response> {
    let response = match request.path.as_str() {
        "/" | "/index.html" => Response::ok("text/html; charset=utf-8", OVERLAY_HTML),
        "/api/deaths" => Response::json(&counter.get())?,
        _ => Response::error(404, "Not Found"),
    };
    debug!(path = %request.path, status = response.status(), "HTTP request");
    Ok(response)
}

async fn respond<W: AsyncWrite + Unpin>(writer: &mut W, response: Response) -> io::Result<()> {
    writer.write_all(&response.to_bytes()).await?;
    writer.shutdown().await
}

/// Push the current snapshot, then one frame per hub wakeup, until the client
/// goes away or the server shuts down.
async fn stream_events<R, W>(
    mut reader: R,
    mut writer: W,
    counter: &Arc<DeathCounter>,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // Subscribe before the first frame so no update can fall in between
    let mut subscription = counter.subscribe();
    debug!(subscriber = ?subscription.id(), "Event stream opened");

    writer.write_all(EVENT_STREAM_HEAD).await?;
    send_snapshot(&mut writer, counter).await?;

    let mut discard = [0u8; 256];
    loop {
        tokio::select! {
            notified = subscription.notified() => {
                if !notified {
                    break;
                }
                send_snapshot(&mut writer, counter).await?;
            }
            read = reader.read(&mut discard) => match read {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            },
            _ = shutdown.changed() => break,
        }
    }

    debug!(subscriber = ?subscription.id(), "Event stream closed");
    Ok(())
}

async fn send_snapshot<W: AsyncWrite + Unpin>(
    writer: &mut W,
    counter: &DeathCounter,
) -> io::Result<()> {
    let frame = sse_frame(&counter.get())?;
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

    struct TestServer {
        addr: SocketAddr,
        counter: Arc<DeathCounter>,
        _shutdown: watch::Sender<bool>,
    }

    async fn start() -> TestServer {
        let counter = Arc::new(DeathCounter::new());
        let server = WebServer::bind(0, Arc::clone(&counter)).await.unwrap();
        let port = server.local_addr().unwrap().port();
        let (tx, rx) = watch::channel(false);
        tokio::spawn(server.serve(rx));

        TestServer {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
            counter,
            _shutdown: tx,
        }
    }

    async fn get(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    async fn read_line<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> String {
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line))
            .await
            .expect("timed out waiting for line")
            .unwrap();
        line
    }

    async fn wait_for_subscribers(counter: &DeathCounter, expected: usize) {
        for _ in 0..200 {
            if counter.subscriber_count() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {expected} subscribers, found {}",
            counter.subscriber_count()
        );
    }

    #[tokio::test]
    async fn test_deaths_snapshot() {
        let server = start().await;
        server.counter.update(12, "Tarnished");

        let response = get(server.addr, "GET /api/deaths HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: application/json\r\n"));
        assert!(response.ends_with("{\"deaths\":12,\"name\":\"Tarnished\"}"));
    }

    #[tokio::test]
    async fn test_overlay_page() {
        let server = start().await;
        let response = get(server.addr, "GET / HTTP/1.1\r\n\r\n").await;
        assert!(response.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(response.contains("/api/events"));
    }

    #[tokio::test]
    async fn test_unknown_path_and_method() {
        let server = start().await;
        let response = get(server.addr, "GET /nope HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));

        let response = get(server.addr, "POST /api/deaths HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));

        let response = get(server.addr, "garbage\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn test_event_stream_pushes_updates() {
        let server = start().await;
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream
            .write_all(b"GET /api/events HTTP/1.1\r\nAccept: text/event-stream\r\n\r\n")
            .await
            .unwrap();
        let mut reader = tokio::io::BufReader::new(stream);

        let mut head = Vec::new();
        loop {
            let line = read_line(&mut reader).await;
            if line == "\r\n" {
                break;
            }
            head.push(line);
        }
        assert_eq!(head[0], "HTTP/1.1 200 OK\r\n");
        assert!(head.contains(&"Content-Type: text/event-stream\r\n".to_string()));
        assert!(head.contains(&"Cache-Control: no-cache\r\n".to_string()));
        assert!(head.contains(&"Connection: keep-alive\r\n".to_string()));

        // Initial snapshot
        assert_eq!(read_line(&mut reader).await, "data: {\"deaths\":0,\"name\":\"\"}\n");
        assert_eq!(read_line(&mut reader).await, "\n");

        wait_for_subscribers(&server.counter, 1).await;
        server.counter.update(5, "X");

        assert_eq!(read_line(&mut reader).await, "data: {\"deaths\":5,\"name\":\"X\"}\n");
        assert_eq!(read_line(&mut reader).await, "\n");

        // Nothing else is pending
        let mut extra = String::new();
        let idle =
            tokio::time::timeout(Duration::from_millis(100), reader.read_line(&mut extra)).await;
        assert!(idle.is_err(), "unexpected frame: {extra:?}");
    }

    #[tokio::test]
    async fn test_disconnect_unsubscribes() {
        let server = start().await;
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream
            .write_all(b"GET /api/events HTTP/1.1\r\n\r\n")
            .await
            .unwrap();

        wait_for_subscribers(&server.counter, 1).await;
        drop(stream);
        wait_for_subscribers(&server.counter, 0).await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_streams() {
        let counter = Arc::new(DeathCounter::new());
        let server = WebServer::bind(0, Arc::clone(&counter)).await.unwrap();
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, server.local_addr().unwrap().port()));
        let (tx, rx) = watch::channel(false);
        let serve = tokio::spawn(server.serve(rx));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /api/events HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        wait_for_subscribers(&counter, 1).await;

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), serve)
            .await
            .expect("server should stop")
            .unwrap();
        wait_for_subscribers(&counter, 0).await;
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let counter = Arc::new(DeathCounter::new());
        let first = WebServer::bind(0, Arc::clone(&counter)).await.unwrap();
        let port = first.local_addr().unwrap().port();

        let err = WebServer::bind(port, counter).await.err().expect("port in use");
        assert!(matches!(err, WebError::Bind { port: p, .. } if p == port));
    }
}
