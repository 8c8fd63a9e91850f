/// Streaming endpoint: `/ws`.
///
/// A client is subscribed to the hub only once the upgrade handshake has
/// completed. Its task forwards each broadcast snapshot as a text frame and
/// reads inbound frames purely to notice disconnects. The subscription is
/// released when either side goes away.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::{debug, info};

use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let hub = state.hub().clone();
    let mut sub = hub.subscribe();
    info!(
        subscriber = sub.id,
        subscribers = hub.subscriber_count(),
        "WebSocket client connected"
    );

    loop {
        tokio::select! {
            payload = sub.rx.recv() => {
                match payload {
                    Some(payload) => {
                        // axum 0.7's Message::Text owns a String: one copy per subscriber
                        if socket.send(Message::Text(payload.to_string())).await.is_err() {
                            break;
                        }
                    }
                    // Hub dropped us (lagging) or is shutting down
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    hub.unsubscribe(sub.id);
    info!(subscriber = sub.id, "WebSocket client disconnected");
    debug!(subscribers = hub.subscriber_count(), "subscriber count after disconnect");
}
