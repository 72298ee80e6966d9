//! Background supervisor keeping a pool of joinable bot rooms available.

use rand::{thread_rng, Rng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

use crate::game::constants::bots;
use crate::game::game_loop;
use crate::lobby::manager::SharedLobby;
use crate::lobby::room::Room;
use crate::metrics::Metrics;

/// Start the supervisor task. One instance runs for the process lifetime.
pub fn spawn(lobby: SharedLobby, metrics: Arc<Metrics>) {
    tokio::spawn(run(lobby, metrics));
}

async fn run(lobby: SharedLobby, metrics: Arc<Metrics>) {
    let mut ticker =
        tokio::time::interval(Duration::from_secs(bots::MAINTENANCE_INTERVAL_SECS));
    loop {
        ticker.tick().await;
        maintain(&lobby, &metrics).await;
    }
}

/// One maintenance cycle: top the pool up to the minimum, and sometimes
/// open one extra room below the cap.
pub async fn maintain(lobby: &SharedLobby, metrics: &Metrics) {
    let mut waiting = lobby.read().await.waiting_bot_room_count().await;

    while waiting < bots::ROOMS_MIN {
        create_bot_room(lobby, metrics).await;
        waiting += 1;
    }

    if waiting < bots::ROOMS_MAX && thread_rng().gen::<f32>() < bots::EXTRA_ROOM_PROBABILITY {
        create_bot_room(lobby, metrics).await;
    }
}

/// Create one public bot room with a random crew and start its loop
pub async fn create_bot_room(lobby: &SharedLobby, metrics: &Metrics) -> Arc<Mutex<Room>> {
    let room_arc = {
        let mut manager = lobby.write().await;
        let room_arc = manager.create_room(true, true);
        {
            let mut room = room_arc.lock().await;
            let crew = thread_rng().gen_range(bots::MIN_PER_ROOM..=bots::MAX_PER_ROOM);
            for _ in 0..crew {
                manager.seed_bot(&mut room);
            }
            info!(room_id = %room.id, bots = crew, "bot room created");
        }
        room_arc
    };

    metrics.record_bot_room();
    game_loop::spawn(room_arc.clone(), lobby.clone());
    room_arc
}
