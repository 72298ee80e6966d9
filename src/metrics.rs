use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Process-wide counters, exported as JSON on `GET /metrics`
pub struct Metrics {
    started_at: Instant,
    connections_total: AtomicU64,
    players_joined_total: AtomicU64,
    rooms_created_total: AtomicU64,
    bot_rooms_created_total: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_total: AtomicU64::new(0),
            players_joined_total: AtomicU64::new(0),
            rooms_created_total: AtomicU64::new(0),
            bot_rooms_created_total: AtomicU64::new(0),
        }
    }

    pub fn record_connection(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_join(&self) {
        self.players_joined_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_room(&self) {
        self.rooms_created_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bot_room(&self) {
        self.rooms_created_total.fetch_add(1, Ordering::Relaxed);
        self.bot_rooms_created_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counter snapshot plus the live gauges the lobby supplies
    pub fn to_json(&self, live_rooms: usize, live_players: usize) -> Value {
        json!({
            "uptime_secs": self.started_at.elapsed().as_secs(),
            "connections_total": self.connections_total.load(Ordering::Relaxed),
            "players_joined_total": self.players_joined_total.load(Ordering::Relaxed),
            "rooms_created_total": self.rooms_created_total.load(Ordering::Relaxed),
            "bot_rooms_created_total": self.bot_rooms_created_total.load(Ordering::Relaxed),
            "rooms": live_rooms,
            "players": live_players,
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
