//! # HTTP Server
//!
//! Accepts connections, parses the one request shape this cache's wire
//! binding supports — `GET <base>/<group>/<key>` — and dispatches to the
//! matching [`Group`] in the registry with minimal overhead.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, warn};

use geecache_common::GeecacheError;
use geecache_engine::Registry;

/// Binds `addr` and serves requests against `registry` until the process
/// is stopped.
///
/// Each accepted connection is handled on its own task; a single
/// connection is read and responded to sequentially (no pipelining),
/// matching the request/response shape the client side assumes.
pub async fn serve(addr: &str, base_path: Arc<str>, registry: Arc<Registry>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "geecache server listening");
    serve_listener(listener, base_path, registry).await
}

/// Like [`serve`], but against an already-bound listener. Lets tests bind
/// to an ephemeral port (`"127.0.0.1:0"`) and learn the real address via
/// `TcpListener::local_addr` before serving on it.
pub async fn serve_listener(
    listener: TcpListener,
    base_path: Arc<str>,
    registry: Arc<Registry>,
) -> std::io::Result<()> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let registry = registry.clone();
        let base_path = base_path.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, &base_path, registry).await {
                warn!(%peer_addr, %err, "connection ended with an error");
            }
        });
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    base_path: &str,
    registry: Arc<Registry>,
) -> std::io::Result<()> {
    let mut buffer = BytesMut::with_capacity(4 * 1024);

    loop {
        let request_line = match read_request_line(&mut stream, &mut buffer).await? {
            Some(line) => line,
            None => return Ok(()),
        };

        let response = match parse_path(&request_line, base_path) {
            Some((group, key)) => dispatch(&registry, &group, &key).await,
            None => http_response(400, b"bad request"),
        };

        stream.write_all(&response).await?;
    }
}

/// Reads bytes until a full request (terminated by `\r\n\r\n`, since this
/// binding never sends a request body) has arrived, then extracts and
/// returns the request line, leaving any pipelined bytes in `buffer` for
/// the next iteration.
async fn read_request_line(
    stream: &mut TcpStream,
    buffer: &mut BytesMut,
) -> std::io::Result<Option<String>> {
    loop {
        if let Some(pos) = find_subslice(buffer, b"\r\n\r\n") {
            let head = buffer.split_to(pos + 4);
            let text = String::from_utf8_lossy(&head);
            let request_line = text.lines().next().unwrap_or_default().to_string();
            return Ok(Some(request_line));
        }

        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parses `"GET <base><group>/<key> HTTP/1.1"` into `(group, key)`.
fn parse_path(request_line: &str, base_path: &str) -> Option<(String, String)> {
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?;
    if method != "GET" {
        return None;
    }
    let path = parts.next()?;

    let trimmed = path.strip_prefix(base_path.trim_end_matches('/'))?;
    let trimmed = trimmed.strip_prefix('/')?;
    let (group, key) = trimmed.split_once('/')?;
    if group.is_empty() || key.is_empty() {
        return None;
    }
    Some((decode_segment(group), decode_segment(key)))
}

/// Reverses the percent-encoding the client side applies to path
/// segments.
fn decode_segment(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(value) = u8::from_str_radix(hex, 16) {
                    out.push(value);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

async fn dispatch(registry: &Registry, group: &str, key: &str) -> Vec<u8> {
    let Some(group_handle) = registry.get(group) else {
        return http_response(
            GeecacheError::NoSuchGroup(group.to_string()).status_code(),
            format!("no such group: {group}").as_bytes(),
        );
    };

    match group_handle.get(key).await {
        Ok(value) => http_response(200, value.as_bytes()),
        Err(err) => {
            error!(%group, %key, %err, "group read failed");
            http_response(err.status_code(), err.to_string().as_bytes())
        }
    }
}

fn http_response(status: u16, body: &[u8]) -> Vec<u8> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let content_type = if status == 200 {
        "application/octet-stream"
    } else {
        "text/plain"
    };
    let mut response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: keep-alive\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_path_extracts_group_and_key() {
        let parsed = parse_path("GET /_geecache/scores/tom HTTP/1.1", "/_geecache/");
        assert_eq!(parsed, Some(("scores".to_string(), "tom".to_string())));
    }

    #[test]
    fn parse_path_rejects_non_get() {
        assert_eq!(parse_path("POST /_geecache/scores/tom HTTP/1.1", "/_geecache/"), None);
    }

    #[test]
    fn parse_path_rejects_missing_key() {
        assert_eq!(parse_path("GET /_geecache/scores HTTP/1.1", "/_geecache/"), None);
    }

    #[test]
    fn decode_segment_reverses_percent_encoding() {
        assert_eq!(decode_segment("a%2Fb"), "a/b");
    }

    #[test]
    fn http_response_sets_content_length() {
        let response = http_response(200, b"hello");
        let text = String::from_utf8_lossy(&response);
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: application/octet-stream\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("hello"));
    }
}
