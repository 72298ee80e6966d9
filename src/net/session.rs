//! One WebSocket session: handshake, inbound dispatch, and a dedicated
//! writer draining the session's bounded outbound queue.

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::game::game_loop;
use crate::lobby::manager::disconnect_player;
use crate::lobby::room::Room;
use crate::net::protocol::{ClientMessage, ServerMessage};
use crate::net::routes::AppState;

/// Outbound frames a slow client may fall behind by before being dropped
const OUTBOUND_QUEUE_CAPACITY: usize = 256;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    state.metrics.record_connection();
    let (mut sender, mut receiver) = socket.split();

    // The first frame decides everything: well-formed `create` or `join`,
    // or the connection closes without ceremony.
    let Some(first) = next_text_frame(&mut receiver).await else {
        let _ = sender.close().await;
        return;
    };
    let Ok(handshake) = serde_json::from_str::<ClientMessage>(&first) else {
        let _ = sender.close().await;
        return;
    };

    let (tx, rx) = mpsc::channel::<Arc<ServerMessage>>(OUTBOUND_QUEUE_CAPACITY);

    let admission = match handshake {
        ClientMessage::Create { name, is_public } => {
            let admission = state
                .lobby
                .write()
                .await
                .create_with_player(&name, is_public, tx.clone())
                .await;
            state.metrics.record_room();
            admission
        }
        ClientMessage::Join { name, room_id } => {
            let result = state
                .lobby
                .write()
                .await
                .join_room(&room_id, &name, tx.clone())
                .await;
            match result {
                Ok(admission) => admission,
                Err(denial) => {
                    debug!(room_id = %room_id, %denial, "join denied");
                    send_error_and_close(sender, &denial.to_string()).await;
                    return;
                }
            }
        }
        _ => {
            let _ = sender.close().await;
            return;
        }
    };
    state.metrics.record_join();

    // All writes to the socket go through the queue from here on
    tokio::spawn(write_outbound(rx, sender));

    if admission.first_player {
        game_loop::spawn(admission.room.clone(), state.lobby.clone());
    }
    for player_id in &admission.dropped {
        disconnect_player(&state.lobby, player_id).await;
    }

    let player_id = admission.player_id;
    let room = admission.room;
    debug!(player_id = %player_id, room_id = %admission.room_id, "session established");

    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };
        // Malformed JSON ends the session; well-formed frames of unknown
        // type are ignored.
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
            break;
        };
        let Ok(message) = serde_json::from_value::<ClientMessage>(value) else {
            continue;
        };
        dispatch(&state, &room, &player_id, message).await;
    }

    // Dropping our queue handle lets the writer finish once the player's
    // copy goes away with the room entry.
    drop(tx);
    disconnect_player(&state.lobby, &player_id).await;
    debug!(player_id = %player_id, "session closed");
}

async fn next_text_frame(receiver: &mut SplitStream<WebSocket>) -> Option<Utf8Bytes> {
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => return Some(text),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
    None
}

async fn write_outbound(
    mut rx: mpsc::Receiver<Arc<ServerMessage>>,
    mut sender: SplitSink<WebSocket, Message>,
) {
    while let Some(frame) = rx.recv().await {
        let text = match serde_json::to_string(&*frame) {
            Ok(text) => text,
            Err(error) => {
                warn!(%error, "failed to encode outbound frame");
                continue;
            }
        };
        if sender.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
    let _ = sender.close().await;
}

async fn send_error_and_close(mut sender: SplitSink<WebSocket, Message>, message: &str) {
    let frame = ServerMessage::Error {
        message: message.to_string(),
    };
    if let Ok(text) = serde_json::to_string(&frame) {
        let _ = sender.send(Message::Text(text.into())).await;
    }
    let _ = sender.close().await;
}

/// Route one mid-session frame. Control frames from non-owners or in the
/// wrong state fall through silently.
async fn dispatch(state: &AppState, room: &Arc<Mutex<Room>>, player_id: &str, message: ClientMessage) {
    match message {
        ClientMessage::Input { dx, dy } => {
            room.lock().await.apply_input(player_id, dx, dy);
        }
        ClientMessage::Start => {
            let dropped = {
                let mut guard = room.lock().await;
                if guard.start(player_id) {
                    guard.broadcast(ServerMessage::GameStarting {
                        room: guard.snapshot(),
                    })
                } else {
                    Vec::new()
                }
            };
            for pid in dropped {
                disconnect_player(&state.lobby, &pid).await;
            }
        }
        ClientMessage::Rematch => {
            let dropped = {
                let mut guard = room.lock().await;
                if guard.rematch(player_id) {
                    guard.broadcast(ServerMessage::RematchStarting {
                        room: guard.snapshot(),
                    })
                } else {
                    Vec::new()
                }
            };
            for pid in dropped {
                disconnect_player(&state.lobby, &pid).await;
            }
        }
        // Handshake frames mean nothing mid-session
        ClientMessage::Create { .. } | ClientMessage::Join { .. } => {}
    }
}
