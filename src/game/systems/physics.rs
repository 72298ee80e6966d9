use crate::game::constants::arena;
use crate::game::constants::physics::{BOUNCE_FORCE, FRICTION, INPUT_IMPULSE, RESTITUTION};
use crate::game::state::Player;

/// Advance every alive player by one tick: integrate velocity into
/// position, apply friction, eject players past the arena rim, then
/// resolve pairwise collisions in a single pass. Residual overlap bleeds
/// off over subsequent ticks.
pub fn step(players: &mut [Player]) {
    integrate(players);
    eject_out_of_bounds(players);
    resolve_collisions(players);
}

fn integrate(players: &mut [Player]) {
    for player in players.iter_mut().filter(|p| p.alive) {
        player.position += player.velocity;
        player.velocity *= FRICTION;
    }
}

fn eject_out_of_bounds(players: &mut [Player]) {
    // Strict comparison: a player tangent to the rim survives. Ejected
    // players keep their last position for rendering.
    let eject_radius = arena::RADIUS + arena::PLAYER_RADIUS;
    for player in players.iter_mut().filter(|p| p.alive) {
        if player.radial_distance() > eject_radius {
            player.alive = false;
        }
    }
}

fn resolve_collisions(players: &mut [Player]) {
    let diameter = 2.0 * arena::PLAYER_RADIUS;
    // Players ejected earlier in this tick are already excluded here.
    let alive: Vec<usize> = players
        .iter()
        .enumerate()
        .filter(|(_, p)| p.alive)
        .map(|(i, _)| i)
        .collect();

    for a in 0..alive.len() {
        for b in (a + 1)..alive.len() {
            let (i, j) = (alive[a], alive[b]);
            let (head, tail) = players.split_at_mut(j);
            let p1 = &mut head[i];
            let p2 = &mut tail[0];

            let delta = p2.position - p1.position;
            let dist = delta.length();
            // Coincident pairs are degenerate; skip and let the next
            // tick's integration separate them.
            if dist <= 0.0 || dist >= diameter {
                continue;
            }

            let normal = delta * (1.0 / dist);

            // Separate by half the overlap each
            let half_overlap = (diameter - dist) * 0.5;
            p1.position -= normal * half_overlap;
            p2.position += normal * half_overlap;

            // Bounce only when closing along the normal
            let closing = (p1.velocity - p2.velocity).dot(normal);
            if closing > 0.0 {
                let impulse = normal * (closing * RESTITUTION);
                p1.velocity -= impulse;
                p2.velocity += impulse;

                let kick = normal * (BOUNCE_FORCE * 0.5);
                p1.velocity -= kick;
                p2.velocity += kick;
            }
        }
    }
}

/// Apply one directional input frame: normalize and add a fixed impulse.
/// Zero-magnitude (and NaN) inputs are dropped by the `> 0` guard.
pub fn apply_input(player: &mut Player, dx: f32, dy: f32) {
    let magnitude = (dx * dx + dy * dy).sqrt();
    if magnitude > 0.0 {
        player.velocity.x += dx / magnitude * INPUT_IMPULSE;
        player.velocity.y += dy / magnitude * INPUT_IMPULSE;
    }
}
