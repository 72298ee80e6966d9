use rand::Rng;
use std::f32::consts::TAU;

use crate::game::constants::{arena, ids, palette, rules};
use crate::net::protocol::OutboundSink;
use crate::util::vec2::Vec2;

/// One arena occupant, human or bot
#[derive(Debug)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: &'static str,
    pub alive: bool,
    pub score: u32,
    pub is_bot: bool,
    /// Outbound frame queue of the owning session; `None` for bots
    pub session: Option<OutboundSink>,
}

impl Player {
    pub fn human(
        id: String,
        name: String,
        position: Vec2,
        color: &'static str,
        session: OutboundSink,
    ) -> Self {
        Self {
            id,
            name: truncate_name(&name),
            position,
            velocity: Vec2::ZERO,
            color,
            alive: true,
            score: 0,
            is_bot: false,
            session: Some(session),
        }
    }

    pub fn bot(id: String, name: String, position: Vec2, color: &'static str) -> Self {
        Self {
            id,
            name: truncate_name(&name),
            position,
            velocity: Vec2::ZERO,
            color,
            alive: true,
            score: 0,
            is_bot: true,
            session: None,
        }
    }

    /// Distance from the arena center
    pub fn radial_distance(&self) -> f32 {
        self.position.length()
    }
}

/// Cut a display name to the protocol limit of 15 code points
pub fn truncate_name(name: &str) -> String {
    name.chars().take(rules::NAME_MAX_CHARS).collect()
}

/// Palette color for the n-th joiner of a room
pub fn color_for_join_order(join_order: usize) -> &'static str {
    palette::COLORS[join_order % palette::COLORS.len()]
}

/// Generate a 12-char lowercase alphanumeric player identifier
pub fn generate_player_id<R: Rng>(rng: &mut R) -> String {
    (0..ids::PLAYER_ID_LEN)
        .map(|_| ids::PLAYER_ID_CHARS[rng.gen_range(0..ids::PLAYER_ID_CHARS.len())] as char)
        .collect()
}

/// Generate a bot identifier (`bot_` + player id)
pub fn generate_bot_id<R: Rng>(rng: &mut R) -> String {
    format!("{}{}", ids::BOT_ID_PREFIX, generate_player_id(rng))
}

/// Generate a 4-letter uppercase room code. Uniqueness is enforced by the
/// lobby manager, which resamples on collision.
pub fn generate_room_id<R: Rng>(rng: &mut R) -> String {
    (0..ids::ROOM_ID_LEN)
        .map(|_| ids::ROOM_ID_CHARS[rng.gen_range(0..ids::ROOM_ID_CHARS.len())] as char)
        .collect()
}

/// Join-time spawn position: players are spread over at least 8 slots on a
/// circle at 0.6 of the arena radius, with a little angular jitter.
/// `join_order` is the room's player count before insertion.
pub fn join_spawn_position<R: Rng>(join_order: usize, rng: &mut R) -> Vec2 {
    let slots = (join_order + 1).max(rules::MAX_PLAYERS) as f32;
    let jitter = rng.gen_range(-arena::SPAWN_ANGLE_JITTER..arena::SPAWN_ANGLE_JITTER);
    let angle = TAU * join_order as f32 / slots + jitter;
    Vec2::from_angle(angle) * (arena::RADIUS * arena::SPAWN_RADIUS_FACTOR)
}

/// Round-start spawn position: the i-th of n players, evenly on a circle at
/// 0.6 of the arena radius.
pub fn circle_spawn_position(index: usize, total: usize) -> Vec2 {
    let total = total.max(1) as f32;
    let angle = TAU * index as f32 / total;
    Vec2::from_angle(angle) * (arena::RADIUS * arena::SPAWN_RADIUS_FACTOR)
}
