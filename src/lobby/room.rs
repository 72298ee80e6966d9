use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::game::constants::{palette, rules};
use crate::game::state::{circle_spawn_position, Player};
use crate::game::systems::{bots, physics};
use crate::net::protocol::{RoomSnapshot, ServerMessage};
use crate::util::vec2::Vec2;

/// Match lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    /// Accepting joins; no simulation
    Waiting,
    /// Simulation frozen; countdown ticking once per second
    Countdown,
    /// Simulation running at tick rate
    Playing,
    /// Winner announced; simulation frozen
    Finished,
}

/// A match container: players in join order, owner, and lifecycle state
#[derive(Debug)]
pub struct Room {
    pub id: String,
    pub owner_id: Option<String>,
    pub is_public: bool,
    pub is_bot_room: bool,
    pub players: Vec<Player>,
    pub state: RoomState,
    pub countdown: i32,
    pub winner: Option<String>,
}

impl Room {
    pub fn new(id: String, is_public: bool, is_bot_room: bool) -> Self {
        Self {
            id,
            owner_id: None,
            is_public,
            is_bot_room,
            players: Vec::new(),
            state: RoomState::Waiting,
            countdown: rules::COUNTDOWN_SECONDS,
            winner: None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= rules::MAX_PLAYERS
    }

    pub fn has_real_players(&self) -> bool {
        self.players.iter().any(|p| !p.is_bot)
    }

    pub fn get_player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn get_player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn is_owner(&self, player_id: &str) -> bool {
        self.owner_id.as_deref() == Some(player_id)
    }

    /// Add a player at the end of the join order. The first joiner becomes
    /// the owner.
    pub fn add_player(&mut self, player: Player) {
        if self.owner_id.is_none() {
            self.owner_id = Some(player.id.clone());
        }
        self.players.push(player);
    }

    /// Remove a player. If the owner departs, ownership passes to the
    /// first remaining player in join order; an emptied room keeps no
    /// owner.
    pub fn remove_player(&mut self, player_id: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == player_id)?;
        let player = self.players.remove(index);
        if self.owner_id.as_deref() == Some(player_id) {
            self.owner_id = self.players.first().map(|p| p.id.clone());
        }
        Some(player)
    }

    /// Owner starts the match from `waiting`. Anything else is a no-op.
    #[must_use]
    pub fn start(&mut self, requester: &str) -> bool {
        if !self.is_owner(requester)
            || self.players.len() < rules::MIN_PLAYERS
            || self.state != RoomState::Waiting
        {
            return false;
        }
        self.begin_countdown();
        true
    }

    /// Owner restarts from `finished`. Anything else is a no-op.
    #[must_use]
    pub fn rematch(&mut self, requester: &str) -> bool {
        if !self.is_owner(requester)
            || self.players.len() < rules::MIN_PLAYERS
            || self.state != RoomState::Finished
        {
            return false;
        }
        self.reset_round();
        true
    }

    pub fn begin_countdown(&mut self) {
        self.state = RoomState::Countdown;
        self.countdown = rules::COUNTDOWN_SECONDS;
    }

    /// Clear the previous result and respawn into a fresh countdown
    pub fn reset_round(&mut self) {
        self.begin_countdown();
        self.winner = None;
        self.respawn_all();
    }

    /// Countdown expired: respawn everyone and run the simulation
    pub fn begin_playing(&mut self) {
        self.state = RoomState::Playing;
        self.respawn_all();
    }

    /// Bot room lost its last real player: back to a fresh waiting state
    pub fn reset_to_waiting(&mut self) {
        self.state = RoomState::Waiting;
        self.winner = None;
        self.countdown = rules::COUNTDOWN_SECONDS;
        self.respawn_all();
    }

    /// Respawn all players evenly on a circle at 0.6 of the arena radius,
    /// with zero velocity
    pub fn respawn_all(&mut self) {
        let total = self.players.len();
        for (index, player) in self.players.iter_mut().enumerate() {
            player.alive = true;
            player.position = circle_spawn_position(index, total);
            player.velocity = Vec2::ZERO;
        }
    }

    /// Movement impulse from a session. Dropped unless the match is
    /// running and the player is known and alive.
    pub fn apply_input(&mut self, player_id: &str, dx: f32, dy: f32) {
        if self.state != RoomState::Playing {
            return;
        }
        if let Some(player) = self.get_player_mut(player_id) {
            if player.alive {
                physics::apply_input(player, dx, dy);
            }
        }
    }

    /// One simulation tick: bot steering, physics, then the round-over
    /// check. Only meaningful in `playing`.
    pub fn run_tick<R: Rng>(&mut self, rng: &mut R) {
        if self.state != RoomState::Playing {
            return;
        }
        bots::drive(&mut self.players, rng);
        physics::step(&mut self.players);
        self.check_round_over();
    }

    /// At most one survivor ends the round, provided a real match was
    /// running (at least MIN_PLAYERS in the room). The survivor, if any,
    /// scores and is recorded as the winner.
    fn check_round_over(&mut self) {
        if self.players.len() < rules::MIN_PLAYERS {
            return;
        }
        let alive: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.alive)
            .map(|(i, _)| i)
            .collect();
        if alive.len() > 1 {
            return;
        }

        self.state = RoomState::Finished;
        if let Some(&index) = alive.first() {
            let survivor = &mut self.players[index];
            survivor.score += 1;
            self.winner = Some(survivor.id.clone());
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot::from_room(self)
    }

    /// Enqueue a frame on every connected session. Returns the ids whose
    /// queues were full or closed; callers disconnect those players once
    /// the room lock is released.
    pub fn broadcast(&self, message: ServerMessage) -> Vec<String> {
        let frame = Arc::new(message);
        let mut dropped = Vec::new();
        for player in &self.players {
            if let Some(sink) = &player.session {
                if sink.try_send(frame.clone()).is_err() {
                    dropped.push(player.id.clone());
                }
            }
        }
        dropped
    }

    /// Rebuild a room from its wire snapshot. Sessions cannot be
    /// reconstructed, so every player comes back detached; unknown colors
    /// fall back to the first palette entry.
    pub fn from_snapshot(snapshot: &RoomSnapshot) -> Self {
        let players = snapshot
            .players
            .0
            .iter()
            .map(|p| {
                let color = palette::COLORS
                    .iter()
                    .find(|c| **c == p.color)
                    .copied()
                    .unwrap_or(palette::COLORS[0]);
                let mut player = Player::bot(p.id.clone(), p.name.clone(), Vec2::new(p.x, p.y), color);
                player.velocity = Vec2::new(p.vx, p.vy);
                player.alive = p.alive;
                player.score = p.score;
                player.is_bot = p.is_bot;
                player
            })
            .collect();

        Self {
            id: snapshot.id.clone(),
            owner_id: snapshot.owner_id.clone(),
            is_public: snapshot.is_public,
            is_bot_room: snapshot.is_bot_room,
            players,
            state: snapshot.state,
            countdown: snapshot.countdown,
            winner: snapshot.winner.clone(),
        }
    }
}
