use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::lobby::manager::SharedLobby;
use crate::metrics::Metrics;
use crate::net::protocol::LobbyRoomEntry;
use crate::net::session;

/// Process-lifetime shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub lobby: SharedLobby,
    pub metrics: Arc<Metrics>,
}

/// Build the router: the WebSocket endpoint plus the small HTTP surface.
/// CORS allows all origins; the browser client is served elsewhere.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(session::ws_handler))
        .route("/health", get(health))
        .route("/rooms", get(rooms))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Lobby listing of public, waiting, not-full rooms
#[derive(Debug, Serialize)]
struct RoomsResponse {
    rooms: Vec<LobbyRoomEntry>,
}

async fn rooms(State(state): State<AppState>) -> Json<RoomsResponse> {
    let rooms = state.lobby.read().await.public_rooms().await;
    Json(RoomsResponse { rooms })
}

async fn metrics(State(state): State<AppState>) -> Json<Value> {
    let lobby = state.lobby.read().await;
    Json(state
        .metrics
        .to_json(lobby.room_count(), lobby.player_count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::manager::LobbyManager;
    use tokio::sync::RwLock;

    fn test_state() -> AppState {
        AppState {
            lobby: Arc::new(RwLock::new(LobbyManager::new())),
            metrics: Arc::new(Metrics::new()),
        }
    }

    #[tokio::test]
    async fn test_health_payload() {
        let Json(payload) = health().await;
        assert_eq!(payload, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_rooms_lists_public_waiting_rooms() {
        let state = test_state();
        {
            let mut manager = state.lobby.write().await;
            let room_arc = manager.create_room(true, true);
            let mut room = room_arc.lock().await;
            manager.seed_bot(&mut room);
            manager.seed_bot(&mut room);
        }

        let Json(response) = rooms(State(state.clone())).await;
        assert_eq!(response.rooms.len(), 1);
        let entry = &response.rooms[0];
        assert!(entry.is_bot_room);
        assert_eq!(entry.player_count, 2);
        assert!(entry.owner_name.is_some());
    }

    #[tokio::test]
    async fn test_metrics_reports_live_gauges() {
        let state = test_state();
        state.metrics.record_connection();
        {
            let mut manager = state.lobby.write().await;
            manager.create_room(false, false);
        }

        let Json(payload) = metrics(State(state)).await;
        assert_eq!(payload["connections_total"], 1);
        assert_eq!(payload["rooms"], 1);
        assert_eq!(payload["players"], 0);
    }

    #[test]
    fn test_router_builds() {
        let _router = router(test_state());
    }
}
