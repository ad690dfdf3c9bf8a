//! Dashboard WebSocket endpoint.
//!
//! One long-lived socket per dashboard session. The server pushes hub
//! events as JSON text frames; the only inbound traffic is a text ping,
//! answered with a pong message. Authentication happens in the session
//! middleware before the upgrade (403 without a valid cookie).

use crate::api::AppState;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;

/// GET /ws - Upgrade to the dashboard event stream
pub async fn websocket_endpoint(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| client_connection(socket, state))
}

/// Pump hub events to the socket and answer inbound pings until either
/// side goes away.
async fn client_connection(socket: WebSocket, state: AppState) {
    let hub = state.downloader.hub();
    let (session_id, mut events) = hub.connect().await;
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let frame = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to serialize dashboard event");
                        continue;
                    }
                };
                if sink.send(WsMessage::Text(frame)).await.is_err() {
                    break;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        tracing::debug!(session_id, received = %text, "WebSocket message from client");
                        let pong = json!({
                            "type": "pong",
                            "message": "Server received your message"
                        });
                        if sink.send(WsMessage::Text(pong.to_string())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(session_id, error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    hub.disconnect(session_id).await;
}
