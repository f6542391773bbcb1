//! Just enough HTTP/1.1 for the overlay endpoints.
//!
//! Requests are read head-only (the endpoints take no body). Plain responses
//! are sent with `Content-Length` and `Connection: close`; the event stream
//! is delimited by closing the connection.

use std::io;

use deathwatch_types::DeathSnapshot;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Upper bound on the request line plus headers.
pub const MAX_HEAD_BYTES: usize = 8 * 1024;

pub const EVENT_STREAM_HEAD: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-Type: text/event-stream\r\n\
Cache-Control: no-cache\r\n\
Connection: keep-alive\r\n\
\r\n";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("connection closed before a request was received")]
    Closed,

    #[error("request head exceeds the size limit")]
    TooLarge,

    #[error("malformed request head")]
    Malformed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Request target with any query string removed
    pub path: String,
}

/// Read a request line and its headers, up to the blank line.
pub async fn read_request_head<R>(reader: &mut R) -> Result<Request, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = reader.take(MAX_HEAD_BYTES as u64);
    let mut line = String::new();
    let mut request: Option<Request> = None;

    loop {
        line.clear();
        let read = match limited.read_line(&mut line).await {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(RequestError::Malformed);
            }
            Err(e) => return Err(e.into()),
        };

        if read == 0 || !line.ends_with('\n') {
            return Err(match (&request, limited.limit()) {
                (_, 0) => RequestError::TooLarge,
                (None, _) if line.is_empty() => RequestError::Closed,
                _ => RequestError::Malformed,
            });
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        match request {
            None => request = Some(parse_request_line(trimmed)?),
            Some(_) if trimmed.is_empty() => break,
            // Header contents are not needed by any route
            Some(_) => {}
        }
    }

    request.ok_or(RequestError::Malformed)
}

fn parse_request_line(line: &str) -> Result<Request, RequestError> {
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(RequestError::Malformed);
    };

    if !version.starts_with("HTTP/1.") {
        return Err(RequestError::Malformed);
    }

    let path = target.split('?').next().unwrap_or(target);
    Ok(Request {
        method: method.to_string(),
        path: path.to_string(),
    })
}

/// A complete, non-streaming response.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    reason: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Response {
    pub fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            reason: "OK",
            content_type,
            body: body.into(),
        }
    }

    pub fn error(status: u16, reason: &'static str) -> Self {
        Self {
            status,
            reason,
            content_type: "text/plain; charset=utf-8",
            body: format!("{status} {reason}\n").into_bytes(),
        }
    }

    pub fn json(snapshot: &DeathSnapshot) -> serde_json::Result<Self> {
        Ok(Self::ok("application/json", serde_json::to_vec(snapshot)?))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            self.reason,
            self.content_type,
            self.body.len()
        );
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

/// One server-sent event carrying `snapshot` as JSON.
pub fn sse_frame(snapshot: &DeathSnapshot) -> serde_json::Result<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(snapshot)?))
}
