//! Accept Loop and Upgrade Handshake
//!
//! The accept loop owns the listening socket while the server runs. For
//! every incoming TCP connection it spawns a task that reads the HTTP
//! request head, validates it, performs the WebSocket handshake and then
//! runs a [`ConnectionSession`](crate::connection::ConnectionSession).
//!
//! ```text
//!  Listening ──accept──> Read head ──> Validate ──ok──> 101 ──> Session
//!      ▲                     │              │
//!      │                 timeout/EOF    reject 4xx
//!      └──────────── (loop never waits on a client) ──────────────┘
//! ```
//!
//! The request head is read and answered here rather than inside the codec,
//! so every refused request gets a real HTTP status. Once the `101` reply is
//! written the socket is handed to the codec as an established WebSocket.

use crate::commands::CommandRouter;
use crate::connection::{handle_connection, ConnectionStats};
use crate::protocol::upgrade::{accept_response, encode_response, parse_request_head, Request};
use crate::protocol::UpgradeError;
use crate::server::config::ServerConfig;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Initial capacity for the request head buffer.
const INITIAL_HEAD_CAPACITY: usize = 1024;

/// Everything a connection task needs, shared with the accept loop.
#[derive(Clone)]
pub(crate) struct AcceptContext {
    pub config: Arc<ServerConfig>,
    pub router: CommandRouter,
    pub stats: Arc<ConnectionStats>,
    pub cancel: CancellationToken,
}

/// Accepts connections until cancelled, then hands the listener back so
/// the caller decides when the socket is released.
pub(crate) async fn accept_loop(listener: TcpListener, ctx: AcceptContext) -> TcpListener {
    debug!("Accept loop started");

    loop {
        let accepted = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => None,
            result = listener.accept() => Some(result),
        };

        match accepted {
            None => break,
            Some(Ok((stream, peer))) => {
                trace!(client = %peer, "TCP connection accepted");
                let ctx = ctx.clone();
                tokio::spawn(serve_connection(stream, peer, ctx));
            }
            Some(Err(e)) => {
                error!(error = %e, "Failed to accept connection");
                tokio::select! {
                    _ = ctx.cancel.cancelled() => break,
                    _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                }
            }
        }
    }

    info!("Accept loop stopped");
    listener
}

/// Upgrades one connection and runs its session.
async fn serve_connection(stream: TcpStream, peer: SocketAddr, ctx: AcceptContext) {
    let timeout = ctx.config.handshake_timeout;

    let handshake = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => {
            debug!(client = %peer, "Handshake abandoned, server stopping");
            return;
        }
        result = tokio::time::timeout(timeout, upgrade(stream, &ctx.config)) => result,
    };

    let ws = match handshake.unwrap_or_else(|_| Err(UpgradeError::Timeout)) {
        Ok(ws) => ws,
        Err(e) => {
            ctx.stats.handshake_rejected();
            debug!(client = %peer, error = %e, "Handshake failed");
            return;
        }
    };

    // No new sessions once the server is stopping.
    if ctx.cancel.is_cancelled() {
        return;
    }

    handle_connection(ws, peer, ctx.router, ctx.cancel, ctx.stats).await;
}

/// Validates the upgrade request on `stream` and completes the handshake.
///
/// A refused request is answered with its client-error status before the
/// error is returned.
pub async fn upgrade<S>(
    mut stream: S,
    config: &ServerConfig,
) -> Result<WebSocketStream<S>, UpgradeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(INITIAL_HEAD_CAPACITY);

    let accepted = match read_request_head(&mut stream, &mut buf, config.max_request_head).await
    {
        // A client must wait for the reply before sending frames.
        Ok((_, consumed)) if buf.len() > consumed => Err(UpgradeError::TrailingData),
        Ok((request, _)) => {
            accept_response(&request, &config.path).and_then(|r| encode_response(&r))
        }
        Err(e) => Err(e),
    };

    let reply = match accepted {
        Ok(reply) => reply,
        Err(e) => {
            reject(&mut stream, &e).await;
            return Err(e);
        }
    };

    stream.write_all(&reply).await?;
    stream.flush().await?;

    let ws_config = Some(config.websocket_config());
    Ok(WebSocketStream::from_raw_socket(stream, Role::Server, ws_config).await)
}

/// Reads from `reader` into `buf` until a complete request head is
/// available. Returns the request and the length of its head.
pub async fn read_request_head<R>(
    reader: &mut R,
    buf: &mut BytesMut,
    max: usize,
) -> Result<(Request, usize), UpgradeError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(parsed) = parse_request_head(buf, max)? {
            return Ok(parsed);
        }

        if buf.capacity() - buf.len() < 512 {
            buf.reserve(INITIAL_HEAD_CAPACITY);
        }

        let n = reader.read_buf(buf).await?;
        if n == 0 {
            return Err(UpgradeError::Closed);
        }
        trace!(bytes = n, buffered = buf.len(), "Read request head data");
    }
}

/// Answers a refused request with its HTTP status, if it can be answered.
pub async fn reject<W>(writer: &mut W, error: &UpgradeError)
where
    W: AsyncWrite + Unpin,
{
    let Some(response) = error.rejection() else {
        return;
    };

    if let Err(e) = writer.write_all(response.as_bytes()).await {
        trace!(error = %e, "Failed to write rejection");
        return;
    }
    let _ = writer.shutdown().await;
}
