//! # Minimal HTTP/1.1 Wire Codec
//!
//! A hand-rolled encoder/decoder for the narrow HTTP subset this cache
//! speaks: a client sends a bodyless `GET` for one path and reads back a
//! status line, a `Content-Length` header, and a body. No chunked
//! transfer, no keep-alive negotiation beyond what `Connection: keep-alive`
//! implies, no redirects — a general-purpose HTTP client is out of scope
//! (`A4` in the design notes), the same way the teacher reaches for a
//! purpose-built RESP2 codec instead of pulling in a full protocol crate.

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use geecache_common::GeecacheError;

/// Builds a bodyless `GET` request for `path` against `host`.
pub fn encode_get(path: &str, host: &str) -> Vec<u8> {
    format!(
        "GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: keep-alive\r\nAccept: */*\r\n\r\n"
    )
    .into_bytes()
}

/// A parsed HTTP response: status code and body.
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

/// Writes `request` and reads back one response from `reader`.
pub async fn roundtrip(stream: &mut TcpStream, request: &[u8]) -> Result<Response, GeecacheError> {
    stream.write_all(request).await?;
    stream.flush().await?;

    let mut reader = BufReader::new(stream);
    let mut header_buf = Vec::with_capacity(512);
    read_headers(&mut reader, &mut header_buf).await?;

    let header_text = String::from_utf8_lossy(&header_buf);
    let mut lines = header_text.split("\r\n");
    let status_line = lines.next().ok_or_else(|| malformed("missing status line"))?;
    let status = parse_status(status_line)?;

    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().map_err(|_| malformed("bad content-length"))?;
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    Ok(Response {
        status,
        body: Bytes::from(body),
    })
}

async fn read_headers(
    reader: &mut BufReader<&mut TcpStream>,
    buf: &mut Vec<u8>,
) -> Result<(), GeecacheError> {
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            return Err(malformed("connection closed before headers completed"));
        }
        buf.push(byte[0]);
        if buf.ends_with(b"\r\n\r\n") {
            buf.truncate(buf.len() - 4);
            return Ok(());
        }
        if buf.len() > 64 * 1024 {
            return Err(malformed("response headers too large"));
        }
    }
}

fn parse_status(status_line: &str) -> Result<u16, GeecacheError> {
    status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| malformed("bad status line"))
}

fn malformed(detail: &str) -> GeecacheError {
    GeecacheError::PeerFetch(format!("malformed HTTP response: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_get_builds_expected_request_line() {
        let request = encode_get("/_geecache/scores/tom", "127.0.0.1:9090");
        let text = String::from_utf8(request).unwrap();
        assert!(text.starts_with("GET /_geecache/scores/tom HTTP/1.1\r\n"));
        assert!(text.contains("Host: 127.0.0.1:9090\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn parse_status_reads_the_numeric_code() {
        assert_eq!(parse_status("HTTP/1.1 200 OK").unwrap(), 200);
        assert_eq!(parse_status("HTTP/1.1 404 Not Found").unwrap(), 404);
        assert!(parse_status("garbage").is_err());
    }
}
