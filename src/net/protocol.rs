use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::game::constants::{arena, rules};
use crate::game::state::Player;
use crate::lobby::room::{Room, RoomState};

/// Handle to a session's bounded outbound queue. Frames are shared so a
/// broadcast serializes once no matter how many recipients it has.
pub type OutboundSink = mpsc::Sender<Arc<ServerMessage>>;

fn default_player_name() -> String {
    "Player".to_string()
}

/// Frames from client to server. All frames are JSON objects tagged by a
/// `type` field; missing fields fall back to empty/zero values.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new room and become its owner
    Create {
        #[serde(default = "default_player_name")]
        name: String,
        #[serde(default)]
        is_public: bool,
    },
    /// Join an existing waiting room by code
    Join {
        #[serde(default = "default_player_name")]
        name: String,
        #[serde(default)]
        room_id: String,
    },
    /// Directional movement impulse
    Input {
        #[serde(default)]
        dx: f32,
        #[serde(default)]
        dy: f32,
    },
    /// Owner begins the match
    Start,
    /// Owner begins the next match
    Rematch,
}

/// Frames from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First frame of every session: assigned id plus the room snapshot
    Welcome {
        player_id: String,
        room: RoomSnapshot,
    },
    PlayerJoined {
        player: PlayerSnapshot,
        room: RoomSnapshot,
    },
    PlayerLeft {
        player_id: String,
        room: RoomSnapshot,
    },
    Countdown {
        countdown: i32,
        room: RoomSnapshot,
    },
    GameStarting {
        room: RoomSnapshot,
    },
    RematchStarting {
        room: RoomSnapshot,
    },
    /// Post-tick simulation snapshot
    State {
        room: RoomSnapshot,
    },
    Finished {
        winner: Option<String>,
        room: RoomSnapshot,
    },
    /// Join denial; the connection closes after this frame
    Error {
        message: String,
    },
}

/// One player as seen on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub color: String,
    pub alive: bool,
    pub score: u32,
    pub is_bot: bool,
}

impl PlayerSnapshot {
    pub fn from_player(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            x: player.position.x,
            y: player.position.y,
            vx: player.velocity.x,
            vy: player.velocity.y,
            color: player.color.to_string(),
            alive: player.alive,
            score: player.score,
            is_bot: player.is_bot,
        }
    }
}

/// Players keyed by id, serialized as a JSON object whose entry order is
/// the room's join order.
#[derive(Debug, Clone, Default)]
pub struct PlayerTable(pub Vec<PlayerSnapshot>);

impl Serialize for PlayerTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for player in &self.0 {
            map.serialize_entry(&player.id, player)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PlayerTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = PlayerTable;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of player id to player")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut players = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((_, player)) = access.next_entry::<String, PlayerSnapshot>()? {
                    players.push(player);
                }
                Ok(PlayerTable(players))
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// The `room` payload carried by every server frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub id: String,
    pub owner_id: Option<String>,
    pub is_public: bool,
    pub is_bot_room: bool,
    pub players: PlayerTable,
    pub player_count: usize,
    pub state: RoomState,
    pub countdown: i32,
    pub winner: Option<String>,
    pub arena_radius: f32,
    pub player_radius: f32,
}

impl RoomSnapshot {
    pub fn from_room(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            owner_id: room.owner_id.clone(),
            is_public: room.is_public,
            is_bot_room: room.is_bot_room,
            players: PlayerTable(room.players.iter().map(PlayerSnapshot::from_player).collect()),
            player_count: room.players.len(),
            state: room.state,
            countdown: room.countdown,
            winner: room.winner.clone(),
            arena_radius: arena::RADIUS,
            player_radius: arena::PLAYER_RADIUS,
        }
    }
}

/// One entry of the `GET /rooms` lobby listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyRoomEntry {
    pub id: String,
    pub player_count: usize,
    pub max_players: usize,
    pub owner_name: Option<String>,
    pub state: RoomState,
    pub is_bot_room: bool,
}

impl LobbyRoomEntry {
    pub fn from_room(room: &Room) -> Self {
        let owner_name = room
            .owner_id
            .as_deref()
            .and_then(|id| room.get_player(id))
            .map(|p| p.name.clone());
        Self {
            id: room.id.clone(),
            player_count: room.players.len(),
            max_players: rules::MAX_PLAYERS,
            owner_name,
            state: room.state,
            is_bot_room: room.is_bot_room,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"create","name":"Anna","is_public":true}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Create { name, is_public: true } if name == "Anna"));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join","name":"Bo","room_id":"ABCD"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Join { room_id, .. } if room_id == "ABCD"));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Start));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"rematch"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Rematch));
    }

    #[test]
    fn test_missing_fields_default() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"input"}"#).unwrap();
        match msg {
            ClientMessage::Input { dx, dy } => {
                assert_eq!(dx, 0.0);
                assert_eq!(dy, 0.0);
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"create"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Create { name, is_public: false } if name == "Player"));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"join"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Join { room_id, .. } if room_id.is_empty()));
    }

    #[test]
    fn test_unknown_type_fails_to_parse() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"teleport"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"dx":1.0}"#).is_err());
    }

    #[test]
    fn test_server_message_tags() {
        let room = Room::new("ABCD".to_string(), false, false);
        let json = serde_json::to_value(ServerMessage::State {
            room: RoomSnapshot::from_room(&room),
        })
        .unwrap();
        assert_eq!(json["type"], "state");

        let json = serde_json::to_value(ServerMessage::Finished {
            winner: None,
            room: RoomSnapshot::from_room(&room),
        })
        .unwrap();
        assert_eq!(json["type"], "finished");
        assert!(json["winner"].is_null());

        let json = serde_json::to_value(ServerMessage::Error {
            message: "Room not found".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "Room not found");
    }

    #[test]
    fn test_room_payload_shape() {
        let room = Room::new("WXYZ".to_string(), true, false);
        let json = serde_json::to_value(RoomSnapshot::from_room(&room)).unwrap();

        assert_eq!(json["id"], "WXYZ");
        assert_eq!(json["is_public"], true);
        assert_eq!(json["is_bot_room"], false);
        assert_eq!(json["state"], "waiting");
        assert_eq!(json["player_count"], 0);
        assert_eq!(json["countdown"], 3);
        assert!(json["owner_id"].is_null());
        assert!(json["winner"].is_null());
        assert_eq!(json["arena_radius"], 400.0);
        assert_eq!(json["player_radius"], 25.0);
    }

    #[test]
    fn test_player_table_preserves_join_order() {
        use crate::game::state::{color_for_join_order, Player};
        use crate::util::vec2::Vec2;

        let mut room = Room::new("ABCD".to_string(), false, false);
        for id in ["zeta00000000", "alpha0000000", "mid000000000"] {
            room.add_player(Player::bot(
                id.to_string(),
                id.to_string(),
                Vec2::ZERO,
                color_for_join_order(room.players.len()),
            ));
        }

        let text = serde_json::to_string(&RoomSnapshot::from_room(&room)).unwrap();
        let zeta = text.find("zeta00000000").unwrap();
        let alpha = text.find("alpha0000000").unwrap();
        let mid = text.find("mid000000000").unwrap();
        assert!(zeta < alpha && alpha < mid);

        // Round-trip keeps the order too
        let parsed: RoomSnapshot = serde_json::from_str(&text).unwrap();
        let ids: Vec<&str> = parsed.players.0.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta00000000", "alpha0000000", "mid000000000"]);
    }
}
