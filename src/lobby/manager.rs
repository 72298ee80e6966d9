use rand::{thread_rng, Rng};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::game::constants::bots;
use crate::game::state::{
    color_for_join_order, generate_bot_id, generate_player_id, generate_room_id,
    join_spawn_position, Player,
};
use crate::lobby::room::{Room, RoomState};
use crate::net::protocol::{LobbyRoomEntry, OutboundSink, PlayerSnapshot, ServerMessage};

/// Process-wide registry handle, created once at startup
pub type SharedLobby = Arc<RwLock<LobbyManager>>;

/// Registry of live rooms and the player → room index
pub struct LobbyManager {
    rooms: HashMap<String, Arc<Mutex<Room>>>,
    player_rooms: HashMap<String, String>,
}

/// Result of admitting a session into a room
#[derive(Debug)]
pub struct Admission {
    pub player_id: String,
    pub room_id: String,
    pub room: Arc<Mutex<Room>>,
    /// True when this join created the room's first occupant, in which
    /// case the caller must spawn the room loop
    pub first_player: bool,
    /// Sessions whose outbound queues rejected the join broadcast
    pub dropped: Vec<String>,
}

/// Why a join-by-code was denied
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Room code required")]
    MissingRoomCode,
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is full")]
    RoomFull,
    #[error("Game already started")]
    AlreadyStarted,
}

/// Outcome of removing a player; `room` is the surviving room (if any)
/// still owing a `player_left` broadcast
pub struct Departure {
    pub room: Option<Arc<Mutex<Room>>>,
}

impl LobbyManager {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn player_count(&self) -> usize {
        self.player_rooms.len()
    }

    /// Look up a room by code, case-insensitively
    pub fn get_room(&self, code: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.get(&code.to_ascii_uppercase()).cloned()
    }

    pub fn room_of(&self, player_id: &str) -> Option<&str> {
        self.player_rooms.get(player_id).map(String::as_str)
    }

    /// Create an empty room under a fresh 4-letter code. The code space is
    /// small (26^4), so collisions are expected and resampled away.
    pub fn create_room(&mut self, is_public: bool, is_bot_room: bool) -> Arc<Mutex<Room>> {
        let mut rng = thread_rng();
        let id = loop {
            let candidate = generate_room_id(&mut rng);
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let room = Arc::new(Mutex::new(Room::new(id.clone(), is_public, is_bot_room)));
        self.rooms.insert(id.clone(), room.clone());
        debug!(room_id = %id, is_public, is_bot_room, "room created");
        room
    }

    /// Create a room and admit its first (owning) player
    pub async fn create_with_player(
        &mut self,
        name: &str,
        is_public: bool,
        sink: OutboundSink,
    ) -> Admission {
        let room_arc = self.create_room(is_public, false);
        let mut room = room_arc.lock().await;
        self.admit(&mut room, &room_arc, name, sink)
    }

    /// Join an existing room by code. Checks and insertion run under the
    /// registry lock, so concurrent joins cannot overfill a room.
    pub async fn join_room(
        &mut self,
        code: &str,
        name: &str,
        sink: OutboundSink,
    ) -> Result<Admission, JoinError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(JoinError::MissingRoomCode);
        }
        let room_arc = self.get_room(code).ok_or(JoinError::RoomNotFound)?;
        let mut room = room_arc.lock().await;
        if room.is_full() {
            return Err(JoinError::RoomFull);
        }
        if room.state != RoomState::Waiting {
            return Err(JoinError::AlreadyStarted);
        }
        Ok(self.admit(&mut room, &room_arc, name, sink))
    }

    /// Insert a human player and notify the room. The `welcome` frame is
    /// enqueued inside the same critical section as the insertion, so it
    /// is guaranteed to be the session's first frame.
    fn admit(
        &mut self,
        room: &mut Room,
        room_arc: &Arc<Mutex<Room>>,
        name: &str,
        sink: OutboundSink,
    ) -> Admission {
        let mut rng = thread_rng();
        let player_id = generate_player_id(&mut rng);
        let position = join_spawn_position(room.player_count(), &mut rng);
        let color = color_for_join_order(room.player_count());

        let player = Player::human(player_id.clone(), name.to_string(), position, color, sink);
        let player_snapshot = PlayerSnapshot::from_player(&player);
        room.add_player(player);
        self.player_rooms.insert(player_id.clone(), room.id.clone());

        let mut dropped = Vec::new();
        let welcome = ServerMessage::Welcome {
            player_id: player_id.clone(),
            room: room.snapshot(),
        };
        if let Some(sink) = room.get_player(&player_id).and_then(|p| p.session.as_ref()) {
            if sink.try_send(Arc::new(welcome)).is_err() {
                dropped.push(player_id.clone());
            }
        }
        dropped.extend(room.broadcast(ServerMessage::PlayerJoined {
            player: player_snapshot,
            room: room.snapshot(),
        }));

        debug!(player_id = %player_id, room_id = %room.id, "player joined");

        Admission {
            player_id,
            room_id: room.id.clone(),
            room: room_arc.clone(),
            first_player: room.player_count() == 1,
            dropped,
        }
    }

    /// Add one bot to a room, indexed like any other player
    pub fn seed_bot(&mut self, room: &mut Room) {
        let mut rng = thread_rng();
        let bot_id = generate_bot_id(&mut rng);
        let position = join_spawn_position(room.player_count(), &mut rng);
        let color = color_for_join_order(room.player_count());
        let name = bots::NAMES[rng.gen_range(0..bots::NAMES.len())];

        room.add_player(Player::bot(bot_id.clone(), name.to_string(), position, color));
        self.player_rooms.insert(bot_id, room.id.clone());
    }

    /// Remove a player from the registry and their room. An emptied room
    /// is destroyed on the spot; otherwise the surviving room is returned
    /// so the caller can broadcast `player_left`.
    pub async fn remove_player(&mut self, player_id: &str) -> Option<Departure> {
        let room_id = self.player_rooms.remove(player_id)?;
        let room_arc = self.rooms.get(&room_id).cloned()?;

        let mut room = room_arc.lock().await;
        room.remove_player(player_id);
        if room.player_count() == 0 {
            drop(room);
            self.rooms.remove(&room_id);
            debug!(room_id = %room_id, "room destroyed");
            return Some(Departure { room: None });
        }
        drop(room);
        Some(Departure {
            room: Some(room_arc),
        })
    }

    /// Public waiting rooms with space, for the lobby listing
    pub async fn public_rooms(&self) -> Vec<LobbyRoomEntry> {
        let mut entries = Vec::new();
        for room_arc in self.rooms.values() {
            let room = room_arc.lock().await;
            if room.is_public && room.state == RoomState::Waiting && !room.is_full() {
                entries.push(LobbyRoomEntry::from_room(&room));
            }
        }
        entries
    }

    /// Bot rooms currently idle in `waiting`, the pool the supervisor tops up
    pub async fn waiting_bot_room_count(&self) -> usize {
        let mut count = 0;
        for room_arc in self.rooms.values() {
            let room = room_arc.lock().await;
            if room.is_bot_room && room.state == RoomState::Waiting {
                count += 1;
            }
        }
        count
    }
}

impl Default for LobbyManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove a player and notify their room. Sessions whose queues reject the
/// `player_left` frame are disconnected in turn until the cascade settles.
pub async fn disconnect_player(lobby: &SharedLobby, player_id: &str) {
    let mut pending = vec![player_id.to_string()];
    while let Some(pid) = pending.pop() {
        let departure = lobby.write().await.remove_player(&pid).await;
        let Some(Departure {
            room: Some(room_arc),
        }) = departure
        else {
            continue;
        };

        let room = room_arc.lock().await;
        let dropped = room.broadcast(ServerMessage::PlayerLeft {
            player_id: pid.clone(),
            room: room.snapshot(),
        });
        drop(room);
        pending.extend(dropped);
    }
}
