//! Per-room ticking driver: one task per live room walks the match state
//! machine, runs the simulation, and broadcasts snapshots.

use rand::thread_rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::game::constants::bots::AUTO_REMATCH_SECS;
use crate::game::constants::physics::TICK_MICROS;
use crate::lobby::manager::{disconnect_player, SharedLobby};
use crate::lobby::room::{Room, RoomState};
use crate::net::protocol::ServerMessage;

/// Poll interval while idling in `waiting` or `finished`
const IDLE_POLL: Duration = Duration::from_millis(100);
/// Simulation tick interval
const TICK: Duration = Duration::from_micros(TICK_MICROS);
/// Pause between countdown broadcasts
const COUNTDOWN_STEP: Duration = Duration::from_secs(1);
/// Delay before a finished bot room restarts on its own
const AUTO_REMATCH_DELAY: Duration = Duration::from_secs(AUTO_REMATCH_SECS);

/// What the loop does after releasing the room lock
enum LoopAction {
    /// Room is empty; the loop ends
    Exit,
    Idle,
    Tick,
    /// Sleep a second, then decrement the countdown
    CountdownStep,
}

/// Start the room loop task. Exactly one loop runs per live room: the
/// session layer spawns it for a room's first occupant, the bot room
/// supervisor for each room it creates.
pub fn spawn(room: Arc<Mutex<Room>>, lobby: SharedLobby) {
    tokio::spawn(run(room, lobby));
}

/// Drive a room until its last player leaves. The room lock is held for
/// one state-machine step at a time and never across a sleep.
pub async fn run(room_arc: Arc<Mutex<Room>>, lobby: SharedLobby) {
    let mut auto_rematch_at: Option<Instant> = None;

    loop {
        let mut dropped = Vec::new();
        let action = {
            let mut room = room_arc.lock().await;
            advance(&mut room, &mut auto_rematch_at, &mut dropped)
        };

        // Sessions whose queues overflowed during the broadcast
        for player_id in dropped {
            disconnect_player(&lobby, &player_id).await;
        }

        match action {
            LoopAction::Exit => break,
            LoopAction::Idle => sleep(IDLE_POLL).await,
            LoopAction::Tick => sleep(TICK).await,
            LoopAction::CountdownStep => {
                sleep(COUNTDOWN_STEP).await;
                let mut room = room_arc.lock().await;
                // The room may have emptied or reset during the sleep
                if room.state == RoomState::Countdown {
                    room.countdown -= 1;
                    if room.countdown <= 0 {
                        room.begin_playing();
                    }
                }
            }
        }
    }

    debug!("room loop ended");
}

/// One state-machine step under the room lock
fn advance(
    room: &mut Room,
    auto_rematch_at: &mut Option<Instant>,
    dropped: &mut Vec<String>,
) -> LoopAction {
    if room.player_count() == 0 {
        return LoopAction::Exit;
    }

    // A bot room with no real players left goes back to a fresh waiting
    // state and idles until the next human shows up.
    if room.is_bot_room && !room.has_real_players() {
        if room.state != RoomState::Waiting {
            room.reset_to_waiting();
            *auto_rematch_at = None;
        }
        return LoopAction::Idle;
    }

    match room.state {
        RoomState::Waiting => {
            // Bot rooms start on their own as soon as a human is in
            if room.is_bot_room {
                room.begin_countdown();
                dropped.extend(room.broadcast(ServerMessage::GameStarting {
                    room: room.snapshot(),
                }));
            }
            LoopAction::Idle
        }
        RoomState::Countdown => {
            dropped.extend(room.broadcast(ServerMessage::Countdown {
                countdown: room.countdown,
                room: room.snapshot(),
            }));
            LoopAction::CountdownStep
        }
        RoomState::Playing => {
            *auto_rematch_at = None;
            room.run_tick(&mut thread_rng());
            dropped.extend(room.broadcast(ServerMessage::State {
                room: room.snapshot(),
            }));
            LoopAction::Tick
        }
        RoomState::Finished => {
            dropped.extend(room.broadcast(ServerMessage::Finished {
                winner: room.winner.clone(),
                room: room.snapshot(),
            }));

            if room.is_bot_room {
                let now = Instant::now();
                match *auto_rematch_at {
                    None => *auto_rematch_at = Some(now + AUTO_REMATCH_DELAY),
                    Some(deadline) if now >= deadline => {
                        *auto_rematch_at = None;
                        room.reset_round();
                        dropped.extend(room.broadcast(ServerMessage::RematchStarting {
                            room: room.snapshot(),
                        }));
                    }
                    Some(_) => {}
                }
            }
            LoopAction::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::manager::LobbyManager;
    use crate::net::protocol::OutboundSink;
    use crate::util::vec2::Vec2;
    use tokio::sync::{mpsc, RwLock};

    fn sink() -> (OutboundSink, mpsc::Receiver<Arc<ServerMessage>>) {
        mpsc::channel(512)
    }

    fn new_lobby() -> SharedLobby {
        Arc::new(RwLock::new(LobbyManager::new()))
    }

    async fn bot_room(lobby: &SharedLobby, bots: usize) -> Arc<Mutex<Room>> {
        let mut manager = lobby.write().await;
        let room_arc = manager.create_room(true, true);
        {
            let mut room = room_arc.lock().await;
            for _ in 0..bots {
                manager.seed_bot(&mut room);
            }
        }
        room_arc
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_cadence_then_match_finishes() {
        let lobby = new_lobby();
        let (tx_a, mut rx_a) = sink();
        let (tx_b, _rx_b) = sink();

        let (admission_a, admission_b) = {
            let mut manager = lobby.write().await;
            let a = manager.create_with_player("Anna", false, tx_a).await;
            let b = manager.join_room(&a.room_id, "Bo", tx_b).await.unwrap();
            (a, b)
        };
        let room = admission_a.room.clone();

        {
            let mut guard = room.lock().await;
            assert!(guard.start(&admission_a.player_id));
        }
        spawn(room.clone(), lobby.clone());

        let mut countdowns = Vec::new();
        let mut ejected = false;
        let mut winner = None;
        for _ in 0..2000 {
            let frame = rx_a.recv().await.expect("loop stopped broadcasting");
            match &*frame {
                ServerMessage::Countdown { countdown, .. } => countdowns.push(*countdown),
                ServerMessage::State { .. } => {
                    assert_eq!(countdowns, vec![3, 2, 1], "countdown must finish first");
                    if !ejected {
                        ejected = true;
                        // Shove Anna through the rim
                        let mut guard = room.lock().await;
                        let p = guard.get_player_mut(&admission_a.player_id).unwrap();
                        p.position = Vec2::new(250.0, 0.0);
                        p.velocity = Vec2::new(200.0, 0.0);
                    }
                }
                ServerMessage::Finished { winner: w, .. } => {
                    winner = w.clone();
                    break;
                }
                _ => {}
            }
        }

        assert_eq!(countdowns, vec![3, 2, 1]);
        assert_eq!(winner.as_deref(), Some(admission_b.player_id.as_str()));
        let guard = room.lock().await;
        assert_eq!(guard.state, RoomState::Finished);
        assert_eq!(guard.get_player(&admission_b.player_id).unwrap().score, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bot_room_waits_until_a_human_joins() {
        let lobby = new_lobby();
        let room = bot_room(&lobby, 4).await;
        spawn(room.clone(), lobby.clone());

        // Bots alone never start a match
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(room.lock().await.state, RoomState::Waiting);

        let (tx, mut rx) = sink();
        let admission = {
            let code = room.lock().await.id.clone();
            lobby.write().await.join_room(&code, "Carl", tx).await.unwrap()
        };

        // Auto-start fires within the next waiting poll
        let mut saw_game_starting = false;
        for _ in 0..50 {
            let frame = rx.recv().await.expect("no frames from bot room");
            match &*frame {
                ServerMessage::GameStarting { room } => {
                    assert_eq!(room.state, RoomState::Countdown);
                    saw_game_starting = true;
                    break;
                }
                ServerMessage::Welcome { .. } | ServerMessage::PlayerJoined { .. } => {}
                other => panic!("unexpected frame before game_starting: {:?}", other),
            }
        }
        assert!(saw_game_starting);

        // When the human leaves mid-countdown the room resets itself once
        // the loop next wakes (it may be in the middle of a 1 s countdown
        // sleep, so wait well past that)
        disconnect_player(&lobby, &admission.player_id).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        let guard = room.lock().await;
        assert_eq!(guard.state, RoomState::Waiting);
        assert!(guard.winner.is_none());
        assert!(guard.players.iter().all(|p| p.is_bot && p.alive));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bot_room_auto_rematch_after_three_seconds() {
        let lobby = new_lobby();
        let room = bot_room(&lobby, 2).await;

        let (tx, mut rx) = sink();
        {
            let code = room.lock().await.id.clone();
            lobby.write().await.join_room(&code, "Dora", tx).await.unwrap();
        }
        {
            // Pin the room into a finished round before the loop starts
            let mut guard = room.lock().await;
            guard.state = RoomState::Finished;
            let bot_id = guard.players[0].id.clone();
            guard.winner = Some(bot_id);
        }
        spawn(room.clone(), lobby.clone());

        let started = Instant::now();
        let mut finished_frames = 0;
        loop {
            let frame = rx.recv().await.expect("loop stopped broadcasting");
            match &*frame {
                ServerMessage::Finished { .. } => finished_frames += 1,
                ServerMessage::RematchStarting { room } => {
                    assert!(room.winner.is_none());
                    assert_eq!(room.state, RoomState::Countdown);
                    break;
                }
                _ => {}
            }
            assert!(finished_frames < 200, "auto-rematch never fired");
        }
        // The deadline contract: no earlier than 3 s after finishing
        assert!(started.elapsed() >= Duration::from_secs(3));

        // And the next frame batch runs the countdown again
        let mut saw_countdown = false;
        for _ in 0..10 {
            if let Some(frame) = rx.recv().await {
                if matches!(&*frame, ServerMessage::Countdown { countdown: 3, .. }) {
                    saw_countdown = true;
                    break;
                }
            }
        }
        assert!(saw_countdown);
    }

    #[tokio::test]
    async fn test_loop_exits_when_room_empties() {
        let room = Arc::new(Mutex::new(Room::new("AAAA".to_string(), false, false)));

        let mut auto_rematch_at = None;
        let mut dropped = Vec::new();
        let action = advance(&mut *room.lock().await, &mut auto_rematch_at, &mut dropped);
        assert!(matches!(action, LoopAction::Exit));
        assert!(dropped.is_empty());
    }

    #[tokio::test]
    async fn test_human_room_never_auto_starts() {
        let lobby = new_lobby();
        let (tx_a, _rx_a) = sink();
        let (tx_b, _rx_b) = sink();
        let room = {
            let mut manager = lobby.write().await;
            let a = manager.create_with_player("Anna", false, tx_a).await;
            manager.join_room(&a.room_id, "Bo", tx_b).await.unwrap();
            a.room
        };

        let mut auto_rematch_at = None;
        let mut dropped = Vec::new();
        for _ in 0..10 {
            let action = advance(&mut *room.lock().await, &mut auto_rematch_at, &mut dropped);
            assert!(matches!(action, LoopAction::Idle));
        }
        assert_eq!(room.lock().await.state, RoomState::Waiting);
    }
}
