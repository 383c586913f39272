//! WebSocket — push day-record updates to the user's connected clients.

use std::sync::Arc;

use axum::{
    extract::{ws::Message, ws::WebSocket, Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};

use kibun_core::store::validate_user;

use super::api::DEFAULT_USER;
use super::error::ApiError;
use super::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

#[derive(Deserialize)]
struct WsQuery {
    user: Option<String>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let user = q
        .user
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_USER.to_string());
    validate_user(&user)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user, state)))
}

async fn handle_socket(mut socket: WebSocket, user: String, state: Arc<AppState>) {
    let mut rx = state.journal.store.subscribe();
    info!("WebSocket client connected for {}", user);

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) if event.user() == user => {
                        match serde_json::to_string(&event.to_ws_json()) {
                            Ok(json) => {
                                if socket.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => error!("Failed to serialize event: {}", e),
                        }
                    }
                    Ok(_) => {} // another user's update
                    Err(RecvError::Lagged(n)) => {
                        info!("WebSocket lagged {} events", n);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            // Incoming messages from client (keep-alive)
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }

    info!("WebSocket client disconnected for {}", user);
}
