//! HTTP Upgrade Request Handling
//!
//! A client opens a session by sending an HTTP/1.1 `GET` request asking to
//! switch to the WebSocket protocol. The request head is parsed and checked
//! with the WebSocket codec's own handshake routines, then the path is
//! matched against the served prefix. Every refusal maps to a client-error
//! status, so a request that is not a valid upgrade is answered instead of
//! dropped.
//!
//! ## Parsing
//!
//! Like the command parser, the head parser is incremental:
//!
//! - `Ok(Some((request, consumed)))` - a complete head was parsed
//! - `Ok(None)` - the terminating blank line has not arrived yet
//! - `Err(e)` - the head is malformed or too large
//!
//! ## Example Request
//!
//! ```text
//! GET / HTTP/1.1
//! Host: localhost:8080
//! Upgrade: websocket
//! Connection: Upgrade
//! Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==
//! Sec-WebSocket-Version: 13
//! ```

use thiserror::Error;
use tokio_tungstenite::tungstenite::error::{CapacityError, ProtocolError};
use tokio_tungstenite::tungstenite::handshake::machine::TryParse;
use tokio_tungstenite::tungstenite::handshake::server::{create_response, write_response};
use tokio_tungstenite::tungstenite::Error as WsError;

pub use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

/// The only WebSocket protocol version we speak.
pub const WEBSOCKET_VERSION: &str = "13";

/// Reasons an upgrade request is refused.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// The request head could not be parsed
    #[error("malformed request: {0}")]
    Malformed(String),

    /// The request head exceeds the configured limit
    #[error("request head too large: {size} bytes (max: {max})")]
    HeadTooLarge { size: usize, max: usize },

    /// More header lines than the codec accepts
    #[error("too many headers")]
    TooManyHeaders,

    /// The client sent data before the handshake was answered
    #[error("unexpected data after request head")]
    TrailingData,

    /// Only GET can be upgraded
    #[error("method not allowed")]
    MethodNotAllowed,

    /// The request path is outside the served prefix
    #[error("no websocket endpoint at {0}")]
    NotFound(String),

    /// The request does not ask for a websocket upgrade
    #[error("not a websocket upgrade request")]
    NotUpgrade,

    /// The `Sec-WebSocket-Key` header is missing
    #[error("missing Sec-WebSocket-Key header")]
    MissingKey,

    /// The client asked for a protocol version other than 13
    #[error("unsupported websocket version: {0}")]
    UnsupportedVersion(String),

    /// The client went away before sending a complete head
    #[error("connection closed before request was complete")]
    Closed,

    /// The client did not finish the handshake in time
    #[error("handshake timed out")]
    Timeout,

    /// I/O error while reading the head or writing the reply
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<WsError> for UpgradeError {
    fn from(e: WsError) -> Self {
        match e {
            WsError::Protocol(ProtocolError::WrongHttpMethod) => UpgradeError::MethodNotAllowed,
            WsError::Protocol(ProtocolError::WrongHttpVersion) => {
                UpgradeError::Malformed("websocket upgrade requires HTTP/1.1".to_string())
            }
            WsError::Protocol(
                ProtocolError::MissingConnectionUpgradeHeader
                | ProtocolError::MissingUpgradeWebSocketHeader,
            ) => UpgradeError::NotUpgrade,
            WsError::Protocol(ProtocolError::MissingSecWebSocketKey) => UpgradeError::MissingKey,
            WsError::Protocol(ProtocolError::MissingSecWebSocketVersionHeader) => {
                UpgradeError::UnsupportedVersion("none".to_string())
            }
            WsError::Protocol(ProtocolError::JunkAfterRequest) => UpgradeError::TrailingData,
            WsError::Capacity(CapacityError::TooManyHeaders) => UpgradeError::TooManyHeaders,
            WsError::Io(e) => UpgradeError::Io(e),
            other => UpgradeError::Malformed(other.to_string()),
        }
    }
}

impl UpgradeError {
    /// The HTTP status sent back for this error, if the client can still
    /// be answered.
    pub fn status(&self) -> Option<(u16, &'static str)> {
        match self {
            UpgradeError::Malformed(_)
            | UpgradeError::TrailingData
            | UpgradeError::NotUpgrade
            | UpgradeError::MissingKey => Some((400, "Bad Request")),
            UpgradeError::NotFound(_) => Some((404, "Not Found")),
            UpgradeError::MethodNotAllowed => Some((405, "Method Not Allowed")),
            UpgradeError::UnsupportedVersion(_) => Some((426, "Upgrade Required")),
            UpgradeError::HeadTooLarge { .. } | UpgradeError::TooManyHeaders => {
                Some((431, "Request Header Fields Too Large"))
            }
            UpgradeError::Closed | UpgradeError::Timeout | UpgradeError::Io(_) => None,
        }
    }

    /// Builds the complete HTTP response that rejects the request.
    pub fn rejection(&self) -> Option<String> {
        let (code, phrase) = self.status()?;
        let body = self.to_string();

        let mut response = format!("HTTP/1.1 {} {}\r\n", code, phrase);
        if matches!(self, UpgradeError::UnsupportedVersion(_)) {
            response.push_str(&format!("Sec-WebSocket-Version: {}\r\n", WEBSOCKET_VERSION));
        }
        if matches!(self, UpgradeError::MethodNotAllowed) {
            response.push_str("Allow: GET\r\n");
        }
        response.push_str("Connection: close\r\n");
        response.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        response.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
        response.push_str(&body);

        Some(response)
    }
}

/// Attempts to parse a request head from the buffer.
///
/// # Arguments
///
/// * `buf` - Bytes received so far
/// * `max` - Largest head accepted, terminator included
pub fn parse_request_head(
    buf: &[u8],
    max: usize,
) -> Result<Option<(Request, usize)>, UpgradeError> {
    match Request::try_parse(buf)? {
        Some((size, _)) if size > max => Err(UpgradeError::HeadTooLarge { size, max }),
        Some((size, request)) => Ok(Some((request, size))),
        None if buf.len() >= max => Err(UpgradeError::HeadTooLarge {
            size: buf.len(),
            max,
        }),
        None => Ok(None),
    }
}

/// Checks that `request` is a websocket upgrade for a path under `prefix`
/// and builds the `101 Switching Protocols` reply.
pub fn accept_response(request: &Request, prefix: &str) -> Result<Response, UpgradeError> {
    let response = create_response(request).map_err(|e| match e {
        WsError::Protocol(ProtocolError::MissingSecWebSocketVersionHeader) => {
            let offered = request
                .headers()
                .get("Sec-WebSocket-Version")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("none");
            UpgradeError::UnsupportedVersion(offered.to_string())
        }
        e => e.into(),
    })?;

    let path = request.uri().path();
    if !path_matches(path, prefix) {
        return Err(UpgradeError::NotFound(path.to_string()));
    }

    Ok(response)
}

/// Serializes the reply head for the wire.
pub fn encode_response(response: &Response) -> Result<Vec<u8>, UpgradeError> {
    let mut head = Vec::with_capacity(128);
    write_response(&mut head, response)?;
    Ok(head)
}

/// Returns true if `path` is `prefix` itself or lies beneath it.
fn path_matches(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.starts_with('/');
    }

    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 8 * 1024;

    fn upgrade_head(path: &str) -> String {
        format!(
            "GET {} HTTP/1.1\r\n\
             Host: localhost:8080\r\n\
             Upgrade: websocket\r\n\
             Connection: keep-alive, Upgrade\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
             Sec-WebSocket-Version: 13\r\n\r\n",
            path
        )
    }

    fn parse(head: &str) -> Request {
        parse_request_head(head.as_bytes(), MAX).unwrap().unwrap().0
    }

    fn check(head: &str, prefix: &str) -> Result<Response, UpgradeError> {
        accept_response(&parse(head), prefix)
    }

    #[test]
    fn test_parse_complete_head() {
        let head = upgrade_head("/");
        let (request, consumed) = parse_request_head(head.as_bytes(), MAX).unwrap().unwrap();

        assert_eq!(consumed, head.len());
        assert_eq!(request.uri().path(), "/");
        assert_eq!(request.headers()["upgrade"], "websocket");

        let response = accept_response(&request, "/").unwrap();
        assert_eq!(response.status().as_u16(), 101);
        assert_eq!(
            response.headers()["Sec-WebSocket-Accept"],
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn test_encode_response() {
        let response = check(&upgrade_head("/"), "/").unwrap();
        let head = String::from_utf8(encode_response(&response).unwrap()).unwrap();

        assert!(head.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(head.contains("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_parse_incomplete_head() {
        let head = upgrade_head("/");
        let partial = &head.as_bytes()[..head.len() - 2];
        assert!(parse_request_head(partial, MAX).unwrap().is_none());
    }

    #[test]
    fn test_consumed_excludes_trailing_bytes() {
        let head = upgrade_head("/");
        let mut data = head.clone().into_bytes();
        data.extend_from_slice(b"extra");
        let (_, consumed) = parse_request_head(&data, MAX).unwrap().unwrap();
        assert_eq!(consumed, head.len());
    }

    #[test]
    fn test_head_too_large() {
        let data = vec![b'a'; 64];
        let err = parse_request_head(&data, 32).unwrap_err();
        assert!(matches!(err, UpgradeError::HeadTooLarge { max: 32, .. }));
        assert_eq!(err.status().map(|s| s.0), Some(431));

        let head = upgrade_head("/");
        let err = parse_request_head(head.as_bytes(), head.len() - 1).unwrap_err();
        assert!(matches!(err, UpgradeError::HeadTooLarge { .. }));
    }

    #[test]
    fn test_too_many_headers() {
        let mut head = String::from("GET / HTTP/1.1\r\n");
        for i in 0..200 {
            head.push_str(&format!("X-Filler-{}: {}\r\n", i, i));
        }
        head.push_str("\r\n");

        let err = parse_request_head(head.as_bytes(), 64 * 1024).unwrap_err();
        assert!(matches!(err, UpgradeError::TooManyHeaders));
        assert_eq!(err.status().map(|s| s.0), Some(431));
    }

    #[test]
    fn test_invalid_request_line() {
        let err = parse_request_head(b"NONSENSE\r\n\r\n", MAX).unwrap_err();
        assert!(matches!(err, UpgradeError::Malformed(_)));
        assert_eq!(err.status().map(|s| s.0), Some(400));
    }

    #[test]
    fn test_invalid_header_line() {
        let err = parse_request_head(b"GET / HTTP/1.1\r\nno-colon\r\n\r\n", MAX).unwrap_err();
        assert!(matches!(err, UpgradeError::Malformed(_)));
    }

    #[test]
    fn test_plain_get_is_not_upgrade() {
        let err = check("GET / HTTP/1.1\r\nHost: localhost\r\n\r\n", "/").unwrap_err();
        assert!(matches!(err, UpgradeError::NotUpgrade));
        assert_eq!(err.status(), Some((400, "Bad Request")));
    }

    #[test]
    fn test_upgrade_header_must_be_exactly_websocket() {
        let head = upgrade_head("/").replace("Upgrade: websocket", "Upgrade: websocket, foo");
        let err = check(&head, "/").unwrap_err();
        assert!(matches!(err, UpgradeError::NotUpgrade));
        assert!(err
            .rejection()
            .unwrap()
            .starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_post_is_rejected() {
        let head = upgrade_head("/").replacen("GET", "POST", 1);
        let err = parse_request_head(head.as_bytes(), MAX).unwrap_err();
        assert!(matches!(err, UpgradeError::MethodNotAllowed));
        assert!(err.rejection().unwrap().contains("Allow: GET"));
    }

    #[test]
    fn test_missing_key() {
        let head = upgrade_head("/").replace("Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n", "");
        let err = check(&head, "/").unwrap_err();
        assert!(matches!(err, UpgradeError::MissingKey));
    }

    #[test]
    fn test_unsupported_version() {
        let head = upgrade_head("/").replace("Version: 13", "Version: 8");
        let err = check(&head, "/").unwrap_err();
        assert!(matches!(err, UpgradeError::UnsupportedVersion(ref v) if v == "8"));
        let response = err.rejection().unwrap();
        assert!(response.starts_with("HTTP/1.1 426 Upgrade Required\r\n"));
        assert!(response.contains("Sec-WebSocket-Version: 13\r\n"));

        let head = upgrade_head("/").replace("Sec-WebSocket-Version: 13\r\n", "");
        let err = check(&head, "/").unwrap_err();
        assert!(matches!(err, UpgradeError::UnsupportedVersion(ref v) if v == "none"));
    }

    #[test]
    fn test_http_10_rejected() {
        let head = upgrade_head("/").replacen("HTTP/1.1", "HTTP/1.0", 1);
        let err = parse_request_head(head.as_bytes(), MAX).unwrap_err();
        assert!(matches!(err, UpgradeError::Malformed(_)));
    }

    #[test]
    fn test_path_prefix() {
        assert!(check(&upgrade_head("/anything?x=1"), "/").is_ok());
        assert!(check(&upgrade_head("/ws"), "/ws").is_ok());
        assert!(check(&upgrade_head("/ws/state"), "/ws/").is_ok());

        let err = check(&upgrade_head("/wsx"), "/ws").unwrap_err();
        assert!(matches!(err, UpgradeError::NotFound(ref p) if p == "/wsx"));
        assert_eq!(err.status().map(|s| s.0), Some(404));
    }

    #[test]
    fn test_rejection_format() {
        let response = UpgradeError::NotUpgrade.rejection().unwrap();
        let body = "not a websocket upgrade request";
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert!(response.ends_with(&format!("\r\n\r\n{}", body)));
    }

    #[test]
    fn test_every_handshake_protocol_error_has_a_status() {
        let errors = [
            ProtocolError::WrongHttpMethod,
            ProtocolError::WrongHttpVersion,
            ProtocolError::MissingConnectionUpgradeHeader,
            ProtocolError::MissingUpgradeWebSocketHeader,
            ProtocolError::MissingSecWebSocketVersionHeader,
            ProtocolError::MissingSecWebSocketKey,
            ProtocolError::JunkAfterRequest,
            ProtocolError::CustomResponseSuccessful,
        ];
        for e in errors {
            let mapped = UpgradeError::from(WsError::Protocol(e));
            assert!(mapped.status().is_some(), "{:?}", mapped);
        }
    }

    #[test]
    fn test_transport_errors_have_no_rejection() {
        assert!(UpgradeError::Closed.rejection().is_none());
        assert!(UpgradeError::Timeout.rejection().is_none());
    }
}
