//! WebSocket listener that turns server notifications into board refreshes.
//!
//! The backend pushes JSON [`ServerMessage`]s over a WebSocket. Messages
//! that touch tasks are forwarded to a [`RefreshHandle`]; everything else
//! is logged and dropped. The listener reconnects after the socket closes
//! and requests one refresh per reconnect, since notifications sent while
//! it was away are lost. It exits once the board it feeds is unmounted.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use taskboard_proto::codec;
use taskboard_proto::notification::ServerMessage;

use crate::board::RefreshHandle;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Timeout for establishing the WebSocket connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How often an idle connection checks whether its board still exists.
const LIVENESS_INTERVAL: Duration = Duration::from_millis(500);

/// Reconnect policy for [`spawn_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Pause between a lost connection and the next attempt.
    pub reconnect_delay: Duration,
    /// Consecutive failed connection attempts before giving up; `None`
    /// retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
            max_attempts: Some(10),
        }
    }
}

/// What a single frame asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameAction {
    Refresh,
    Ignore,
    Close,
}

/// Spawns a task that listens on `url` and refreshes the board behind
/// `handle` whenever a task changes on the server.
///
/// The task ends when the board is unmounted, or after
/// [`ListenerConfig::max_attempts`] consecutive connection failures.
pub fn spawn_listener(url: Url, handle: RefreshHandle, config: ListenerConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut failures = 0u32;
        let mut connected_before = false;

        while handle.is_mounted() {
            match connect(&url).await {
                Some(ws) => {
                    failures = 0;
                    tracing::info!(url = %redacted(&url), "notification socket connected");
                    if connected_before && !handle.refresh() {
                        break;
                    }
                    connected_before = true;
                    read_loop(ws, &handle).await;
                }
                None => {
                    failures += 1;
                    if config.max_attempts.is_some_and(|max| failures >= max) {
                        tracing::warn!(
                            attempts = failures,
                            "notification socket unreachable, giving up"
                        );
                        break;
                    }
                }
            }
            if !handle.is_mounted() {
                break;
            }
            tokio::time::sleep(config.reconnect_delay).await;
        }
        tracing::debug!("notification listener exiting");
    })
}

async fn connect(url: &Url) -> Option<WsStream> {
    match tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str())).await {
        Ok(Ok((ws, _response))) => Some(ws),
        Ok(Err(e)) => {
            tracing::warn!(url = %redacted(url), err = %e, "notification socket connect failed");
            None
        }
        Err(_) => {
            tracing::warn!(url = %redacted(url), "notification socket connect timed out");
            None
        }
    }
}

/// Reads frames until the socket closes or the board goes away.
async fn read_loop(ws: WsStream, handle: &RefreshHandle) {
    let (_sink, mut reader) = ws.split();
    let mut liveness = tokio::time::interval(LIVENESS_INTERVAL);

    loop {
        tokio::select! {
            frame = reader.next() => {
                let action = match frame {
                    Some(Ok(message)) => classify(&message),
                    Some(Err(e)) => {
                        tracing::warn!(err = %e, "notification socket read error");
                        FrameAction::Close
                    }
                    None => FrameAction::Close,
                };
                match action {
                    FrameAction::Refresh => {
                        if !handle.refresh() {
                            return;
                        }
                    }
                    FrameAction::Ignore => {}
                    FrameAction::Close => {
                        tracing::info!("notification socket closed");
                        return;
                    }
                }
            }
            _ = liveness.tick() => {
                if !handle.is_mounted() {
                    return;
                }
            }
        }
    }
}

fn classify(message: &Message) -> FrameAction {
    let payload: &[u8] = match message {
        Message::Text(text) => text.as_bytes(),
        Message::Binary(data) => &data[..],
        Message::Close(_) => return FrameAction::Close,
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return FrameAction::Ignore,
    };
    match codec::decode_server_message(payload) {
        Ok(msg) if msg.requests_board_refresh() => {
            tracing::debug!(?msg, "task notification received");
            FrameAction::Refresh
        }
        Ok(ServerMessage::AiProgress { status, .. }) => {
            tracing::trace!(status = ?status, "ignoring ai progress");
            FrameAction::Ignore
        }
        Ok(msg) => {
            tracing::trace!(?msg, "ignoring notification");
            FrameAction::Ignore
        }
        Err(e) => {
            tracing::warn!(err = %e, "malformed notification frame, skipping");
            FrameAction::Ignore
        }
    }
}

/// The URL without its query, which may carry a token.
fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
