use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use lovebug_common::UpdateMessage;

use crate::registry::ConnectionRegistry;
use crate::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    client_id: Option<String>,
}

/// `GET /ws` — upgrade to the live update channel. An optional `client_id`
/// query param identifies the client for targeted sends.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let registry = state.registry.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, registry, params.client_id))
}

async fn handle_socket(
    socket: WebSocket,
    registry: Arc<ConnectionRegistry>,
    client_id: Option<String>,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let id = registry.register(tx, client_id).await;

    // Pump: frames queued by the registry → socket. Ends when the registry
    // drops this channel or the peer goes away.
    let mut pump = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Receive loop: frame content is not interpreted — any inbound text
    // gets a keepalive pong back to this client only.
    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(_))) => {
                    registry.touch(id).await;
                    registry
                        .send_personal(id, &UpdateMessage::pong("연결 유지됨"))
                        .await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = &mut pump => break,
        }
    }

    registry.unregister(id).await;
    pump.abort();
}
