//! Minimal HTTP/1.1 framing for the stream endpoint
//!
//! Only the request line is interpreted. The 200 response carries no
//! `Content-Length` and no chunked encoding: the body runs until the server
//! closes the connection.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

/// Largest request head accepted
pub const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Value of the `Server` header
pub const SERVER_NAME: &str = concat!("wavcast/", env!("CARGO_PKG_VERSION"));

/// Response statuses used by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotImplemented,
    ServiceUnavailable,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotImplemented => 501,
            Status::ServiceUnavailable => 503,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotImplemented => "Not Implemented",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// Parsed request line and headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Parse a request head (without the terminating blank line)
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| Error::BadRequest("request head is not UTF-8".into()))?;

        let mut lines = text.split('\n').map(|l| l.trim_end_matches('\r'));

        let request_line = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| Error::BadRequest("empty request line".into()))?;

        let mut parts = request_line.split_whitespace();
        let (method, path, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(p), Some(v)) if parts.next().is_none() => (m, p, v),
            _ => {
                return Err(Error::BadRequest(format!(
                    "malformed request line: {:?}",
                    request_line
                )))
            }
        };

        if !version.starts_with("HTTP/") {
            return Err(Error::BadRequest(format!("unsupported version: {}", version)));
        }

        let headers = lines
            .filter(|l| !l.is_empty())
            .filter_map(|l| {
                let (name, value) = l.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();

        Ok(Self {
            method: method.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            headers,
        })
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// Read until the blank line that ends a request head
///
/// Bytes after the head are discarded; the endpoint takes no body.
pub async fn read_request_head<R>(reader: &mut R) -> Result<RequestHead>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(1024);
    let mut scanned = 0;

    loop {
        if let Some(end) = find_head_end(&buf, scanned) {
            return RequestHead::parse(&buf[..end]);
        }
        // A terminator may straddle two reads
        scanned = buf.len().saturating_sub(3);

        if buf.len() >= MAX_REQUEST_HEAD {
            return Err(Error::BadRequest("request head too large".into()));
        }

        let n = reader.read_buf(&mut buf).await?;
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before request head",
            )));
        }
    }
}

/// Offset of the head terminator (`\r\n\r\n` or bare `\n\n`)
fn find_head_end(buf: &[u8], from: usize) -> Option<usize> {
    let from = from.min(buf.len());
    (from..buf.len()).find_map(|i| {
        if buf[i..].starts_with(b"\r\n\r\n") || buf[i..].starts_with(b"\n\n") {
            Some(i)
        } else {
            None
        }
    })
}

/// Response head for the audio stream
pub fn stream_response_head() -> Bytes {
    Bytes::from(format!(
        "HTTP/1.1 200 OK\r\nServer: {}\r\nContent-Type: audio/wav\r\n\r\n",
        SERVER_NAME
    ))
}

/// Complete plain-text error response
pub fn error_response(status: Status) -> Bytes {
    let body = format!("{} {}\n", status.code(), status.reason());
    Bytes::from(format!(
        "HTTP/1.1 {} {}\r\nServer: {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status.code(),
        status.reason(),
        SERVER_NAME,
        body.len(),
        body
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_parse_get() {
        let head = RequestHead::parse(
            b"GET /stream.wav HTTP/1.1\r\nHost: localhost:6000\r\nUser-Agent: mpv\r\n",
        )
        .unwrap();

        assert!(head.is_get());
        assert_eq!(head.path, "/stream.wav");
        assert_eq!(head.version, "HTTP/1.1");
        assert_eq!(head.header("user-agent"), Some("mpv"));
        assert_eq!(head.header("HOST"), Some("localhost:6000"));
        assert_eq!(head.header("accept"), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            RequestHead::parse(b""),
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            RequestHead::parse(b"GET /\r\n"),
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            RequestHead::parse(b"GET / FTP/1.0\r\n"),
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            RequestHead::parse(&[0xff, 0xfe, b'\r', b'\n']),
            Err(Error::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_read_head_across_reads() {
        let mut reader = Builder::new()
            .read(b"POST /x HT")
            .read(b"TP/1.1\r\nHost: a\r")
            .read(b"\n\r\nbody")
            .build();

        let head = read_request_head(&mut reader).await.unwrap();
        assert_eq!(head.method, "POST");
        assert!(!head.is_get());
        assert_eq!(head.header("host"), Some("a"));
    }

    #[tokio::test]
    async fn test_read_head_bare_newlines() {
        let mut reader = Builder::new().read(b"GET / HTTP/1.0\n\n").build();

        let head = read_request_head(&mut reader).await.unwrap();
        assert_eq!(head.version, "HTTP/1.0");
    }

    #[tokio::test]
    async fn test_read_head_eof() {
        let mut reader = Builder::new().read(b"GET / HTTP/1.1\r\n").build();

        let err = read_request_head(&mut reader).await.unwrap_err();
        assert!(err.is_disconnect());
    }

    #[tokio::test]
    async fn test_read_head_too_large() {
        let filler = vec![b'a'; MAX_REQUEST_HEAD];
        let mut reader = Builder::new().read(&filler).build();

        let err = read_request_head(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn test_stream_head() {
        let head = stream_response_head();
        let text = std::str::from_utf8(&head).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("\r\nContent-Type: audio/wav\r\n"));
        assert!(!text.contains("Content-Length"));
        assert!(!text.contains("Transfer-Encoding"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_error_response() {
        let response = error_response(Status::NotImplemented);
        let text = std::str::from_utf8(&response).unwrap();

        assert!(text.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
        assert!(text.contains("Content-Length: 20\r\n"));
        assert!(text.ends_with("\r\n\r\n501 Not Implemented\n"));
    }
}
