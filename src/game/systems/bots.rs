use rand::Rng;

use crate::game::constants::bots::{IMPULSE, PUSH_PROBABILITY, STEER_NOISE};
use crate::game::state::Player;
use crate::util::vec2::Vec2;

/// Steer every alive bot for one tick. Bots chase the nearest real player,
/// fall back to the nearest other player, and drift toward the center when
/// alone; each push fires with a fixed per-tick probability so bots stay
/// beatable.
///
/// The generator is a parameter so a match can be replayed from a seed.
pub fn drive<R: Rng>(players: &mut [Player], rng: &mut R) {
    // Decide first, apply after: decisions only read positions, which this
    // tick's impulses do not move.
    let mut impulses: Vec<(usize, Vec2)> = Vec::new();

    for index in 0..players.len() {
        let bot = &players[index];
        if !bot.alive || !bot.is_bot {
            continue;
        }

        let to_target = match select_target(players, index) {
            Some(target) => players[target].position - bot.position,
            None => -bot.position,
        };

        let (direction, distance) = to_target.normalize_with_length();
        if distance <= 0.0 {
            continue;
        }

        let steer = Vec2::new(
            direction.x + rng.gen_range(-STEER_NOISE..STEER_NOISE),
            direction.y + rng.gen_range(-STEER_NOISE..STEER_NOISE),
        );
        if rng.gen::<f32>() < PUSH_PROBABILITY {
            impulses.push((index, steer * IMPULSE));
        }
    }

    for (index, impulse) in impulses {
        players[index].velocity += impulse;
    }
}

/// Nearest alive real player, else nearest alive player of any kind.
fn select_target(players: &[Player], bot_index: usize) -> Option<usize> {
    nearest(players, bot_index, |p| !p.is_bot)
        .or_else(|| nearest(players, bot_index, |_| true))
}

fn nearest(players: &[Player], bot_index: usize, keep: impl Fn(&Player) -> bool) -> Option<usize> {
    let origin = players[bot_index].position;
    let mut best: Option<(usize, f32)> = None;
    for (i, p) in players.iter().enumerate() {
        if i == bot_index || !p.alive || !keep(p) {
            continue;
        }
        let d = origin.distance_sq_to(p.position);
        if best.map_or(true, |(_, b)| d < b) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}
