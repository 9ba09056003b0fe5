//! WebSocket push endpoint for display and join clients.
//!
//! Each connection first receives a `status` snapshot, then every claim or
//! reset broadcast by the [`ClaimStore`](crate::store::ClaimStore). Incoming
//! text is ignored; the socket only needs to stay open.
//!
//! ```text
//! ┌─────────────┐   POST /claim    ┌────────────┐
//! │ Join client │ ───────────────→ │ ClaimStore │
//! └─────────────┘                  └─────┬──────┘
//!                                        │ broadcast
//! ┌─────────────┐   /ws/display          ▼
//! │   Display   │ ←──────────────── push session
//! └─────────────┘
//! ```

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use shield_protocol::PushMessage;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::api::AppState;
use crate::store::ClaimStore;

/// WebSocket handler for pushed claim updates
pub async fn ws_display_handler(
    ws: WebSocketUpgrade,
    State(store): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_display_socket(socket, store))
}

async fn handle_display_socket(mut socket: WebSocket, store: AppState) {
    let (state, mut events) = store.subscribe().await;
    info!("Push client connected");

    if let Err(e) = send_message(&mut socket, &PushMessage::status(&state)).await {
        warn!("Failed to send initial status: {}", e);
        return;
    }

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Ignoring client message: {}", text);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Push client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = socket.send(Message::Pong(data)).await {
                            warn!("Failed to send pong: {}", e);
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("Push socket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            event = events.recv() => {
                let Some(message) = outbound(&store, event).await else {
                    break;
                };
                if let Err(e) = send_message(&mut socket, &message).await {
                    debug!("Failed to push update: {}", e);
                    break;
                }
            }
        }
    }
}

/// Message to forward for a broadcast receive. A lagged receiver gets the
/// current state instead of the events it missed; `None` ends the session.
async fn outbound(
    store: &ClaimStore,
    event: Result<PushMessage, RecvError>,
) -> Option<PushMessage> {
    match event {
        Ok(message) => Some(message),
        Err(RecvError::Lagged(skipped)) => {
            warn!("Push client lagged by {} events, resending status", skipped);
            Some(PushMessage::status(&store.state().await))
        }
        Err(RecvError::Closed) => None,
    }
}

async fn send_message(socket: &mut WebSocket, message: &PushMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    socket.send(Message::Text(json)).await
}
