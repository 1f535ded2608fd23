//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::GameHandle;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Per-connection outbound queue depth
const OUTBOUND_QUEUE: usize = 256;

/// WebSocket upgrade handler. Connections are anonymous; each gets a fresh id.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let player_id = Uuid::new_v4();
    let rate_limit = state.config.input_rate_limit;
    ws.on_upgrade(move |socket| handle_socket(socket, player_id, state.game, rate_limit))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, player_id: Uuid, game: GameHandle, rate_limit: u32) {
    info!(player_id = %player_id, "New WebSocket connection");

    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
    if !game.connect(player_id, outbound_tx).await {
        error!(player_id = %player_id, "Game loop unavailable, closing connection");
        return;
    }

    run_session(player_id, socket, &game, outbound_rx, rate_limit).await;

    // Cleanup on disconnect
    game.disconnect(player_id).await;

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: Uuid,
    socket: WebSocket,
    game: &GameHandle,
    mut outbound_rx: mpsc::Receiver<ServerMsg>,
    rate_limit: u32,
) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let rate_limiter = ConnectionRateLimiter::new(rate_limit);

    // Spawn writer task: game loop -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> game loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(player_id = %player_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        if !game.client_message(player_id, msg).await {
                            debug!(player_id = %player_id, "Game loop closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(
                            player_id = %player_id,
                            category = "malformed",
                            error = %e,
                            "Failed to parse client message"
                        );
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
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
