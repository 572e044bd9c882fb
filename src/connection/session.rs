//! Connection Session Module
//!
//! This module handles one upgraded WebSocket connection.
//! Each client gets its own session task that runs in a loop,
//! reading messages and sending responses.
//!
//! ## Session Lifecycle
//!
//! ```text
//! 1. Upgrade handshake completes (server module)
//!        │
//!        ▼
//! 2. ConnectionSession spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop (Open)        │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Wait for next message   │◄├──── cancellation
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Route text message      │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Send response frame     │◄├──── cancellation
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Close frame / cancellation / transport error (Closing)
//!        │
//!        ▼
//! 5. Session consumed, socket released (Closed)
//! ```
//!
//! Messages from one client are handled strictly one at a time, so
//! responses always leave in the order their commands arrived.
//! Fragmented frames are reassembled by the codec before they reach us.

use crate::commands::CommandRouter;
use crate::connection::stats::ConnectionStats;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// How long a shutdown close frame may take to flush.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Close reason sent when the server stops.
const SHUTDOWN_REASON: &str = "server shutting down";

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closing,
    Closed,
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed the connection
    ClientClosed,
    /// The server was stopped
    Cancelled,
}

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// WebSocket or underlying I/O failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

impl ConnectionError {
    /// Returns true if the client simply went away.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ConnectionError::WebSocket(WsError::Protocol(
                ProtocolError::ResetWithoutClosingHandshake,
            )) => true,
            ConnectionError::WebSocket(WsError::Io(io_err)) => matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

/// Handles a single upgraded client connection.
///
/// The session owns its WebSocket stream; running it consumes the session,
/// so the socket is released exactly once whichever way the loop ends.
pub struct ConnectionSession<S> {
    /// The upgraded connection
    ws: WebSocketStream<S>,

    /// Client's address (for logging)
    peer: SocketAddr,

    /// Router shared across connections
    router: CommandRouter,

    /// Raised by the server on stop
    cancel: CancellationToken,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    state: SessionState,
}

impl<S> ConnectionSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new session for an upgraded connection.
    pub fn new(
        ws: WebSocketStream<S>,
        peer: SocketAddr,
        router: CommandRouter,
        cancel: CancellationToken,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            ws,
            peer,
            router,
            cancel,
            stats,
            state: SessionState::Open,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the session until the client leaves, the transport fails, or
    /// the server is stopped.
    pub async fn run(mut self) -> Result<SessionEnd, ConnectionError> {
        info!(client = %self.peer, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(SessionEnd::ClientClosed) => {
                info!(client = %self.peer, "Client disconnected gracefully")
            }
            Ok(SessionEnd::Cancelled) => {
                debug!(client = %self.peer, "Session closed by server shutdown")
            }
            Err(e) if e.is_disconnect() => {
                debug!(client = %self.peer, error = %e, "Client disconnected abruptly")
            }
            Err(e) => warn!(client = %self.peer, error = %e, "Connection error"),
        }

        self.state = SessionState::Closed;
        self.stats.connection_closed();
        result
    }

    /// The main read-route-respond loop.
    async fn main_loop(&mut self) -> Result<SessionEnd, ConnectionError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                next = self.ws.next() => Some(next),
            };

            let message = match next {
                None => return Ok(self.close_for_shutdown().await),
                Some(None) => return Ok(SessionEnd::ClientClosed),
                Some(Some(Ok(message))) => message,
                Some(Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed))) => {
                    return Ok(SessionEnd::ClientClosed)
                }
                Some(Some(Err(e))) => return Err(e.into()),
            };

            match message {
                Message::Text(text) => {
                    self.stats.bytes_read(text.len());
                    trace!(client = %self.peer, bytes = text.len(), "Received message");

                    let response = self.router.dispatch(text.as_str());
                    self.stats.message_processed();

                    if !self.send_response(response.into_string()).await? {
                        return Ok(self.close_for_shutdown().await);
                    }
                }
                Message::Close(frame) => {
                    debug!(client = %self.peer, frame = ?frame, "Close frame received");
                    self.finish_close().await;
                    return Ok(SessionEnd::ClientClosed);
                }
                Message::Binary(data) => {
                    debug!(client = %self.peer, bytes = data.len(), "Ignoring binary message");
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    trace!(client = %self.peer, "Control frame");
                }
            }
        }
    }

    /// Sends one response frame. Returns false if the server was stopped
    /// before the send finished.
    async fn send_response(&mut self, text: String) -> Result<bool, ConnectionError> {
        let len = text.len();

        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.ws.send(Message::text(text)) => Some(result),
        };

        match sent {
            None => Ok(false),
            Some(result) => {
                result?;
                self.stats.bytes_written(len);
                trace!(client = %self.peer, bytes = len, "Sent response");
                Ok(true)
            }
        }
    }

    /// Completes a close handshake the client started.
    async fn finish_close(&mut self) {
        self.state = SessionState::Closing;

        // The codec has queued the close reply; flushing sends it.
        match self.ws.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {}
            Err(e) => trace!(client = %self.peer, error = %e, "Close reply failed"),
        }
    }

    /// Tells the client the server is going away.
    async fn close_for_shutdown(&mut self) -> SessionEnd {
        self.state = SessionState::Closing;

        let frame = CloseFrame {
            code: CloseCode::Away,
            reason: SHUTDOWN_REASON.into(),
        };

        match tokio::time::timeout(CLOSE_TIMEOUT, self.ws.close(Some(frame))).await {
            Ok(Ok(())) => trace!(client = %self.peer, "Shutdown close frame sent"),
            Ok(Err(e)) => trace!(client = %self.peer, error = %e, "Shutdown close failed"),
            Err(_) => debug!(client = %self.peer, "Shutdown close timed out"),
        }

        SessionEnd::Cancelled
    }
}

/// Runs a session to completion.
///
/// This is a convenience function that creates a [`ConnectionSession`]
/// and runs it, swallowing the result once it has been logged.
pub async fn handle_connection<S>(
    ws: WebSocketStream<S>,
    peer: SocketAddr,
    router: CommandRouter,
    cancel: CancellationToken,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let session = ConnectionSession::new(ws, peer, router, cancel, stats);
    let _ = session.run().await;
}
