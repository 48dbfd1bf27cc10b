//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::session::registry::OUTBOUND_BUFFER;
use crate::session::SessionEvent;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Per-connection outbound channel; the gateway pushes, the writer
    // task drains. A lagging client skips the oldest messages.
    let (outbound_tx, mut outbound_rx) = broadcast::channel::<ServerMsg>(OUTBOUND_BUFFER);

    if !state
        .gateway
        .send(SessionEvent::Connected {
            conn_id,
            outbound: outbound_tx,
        })
        .await
    {
        error!(conn_id = %conn_id, "Gateway is down, dropping connection");
        return;
    }

    // Writer task: gateway pushes -> WebSocket
    let writer_conn_id = conn_id;
    let writer_handle = tokio::spawn(async move {
        loop {
            match outbound_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(conn_id = %writer_conn_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        conn_id = %writer_conn_id,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                    // Continue - don't disconnect for lag
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(conn_id = %writer_conn_id, "Outbound channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> gateway
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(msg) => {
                    if !state
                        .gateway
                        .send(SessionEvent::Inbound { conn_id, msg })
                        .await
                    {
                        debug!(conn_id = %conn_id, "Gateway closed, ending session");
                        break;
                    }
                }
                Err(e) => {
                    warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Teardown: the gateway removes the player, announces the sign-out
    // and unregisters the connection
    let _ = state
        .gateway
        .send(SessionEvent::Disconnected { conn_id })
        .await;

    writer_handle.abort();
    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
