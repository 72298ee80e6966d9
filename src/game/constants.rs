/// Arena geometry constants
pub mod arena {
    /// Radius of the circular play area
    pub const RADIUS: f32 = 400.0;
    /// Radius of a player disc
    pub const PLAYER_RADIUS: f32 = 25.0;
    /// Fraction of the arena radius at which players spawn
    pub const SPAWN_RADIUS_FACTOR: f32 = 0.6;
    /// Random angular jitter applied to join-time spawn positions (radians)
    pub const SPAWN_ANGLE_JITTER: f32 = 0.2;
}

/// Physics constants - CRITICAL: FRICTION = 0.96 (multiplicative per tick)
pub mod physics {
    /// Velocity retained per tick
    pub const FRICTION: f32 = 0.96;
    /// Fixed separation kick injected on every collision
    pub const BOUNCE_FORCE: f32 = 8.0;
    /// Elastic share of the closing speed returned on collision
    pub const RESTITUTION: f32 = 0.8;
    /// Impulse added per normalized input frame
    pub const INPUT_IMPULSE: f32 = 1.5;
    /// Server tick rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Tick duration in microseconds
    pub const TICK_MICROS: u64 = 1_000_000 / TICK_RATE as u64;
}

/// Match rules
pub mod rules {
    /// Maximum players per room (humans and bots combined)
    pub const MAX_PLAYERS: usize = 8;
    /// Minimum players for a match to start or a round to be decided
    pub const MIN_PLAYERS: usize = 2;
    /// Countdown length in seconds
    pub const COUNTDOWN_SECONDS: i32 = 3;
    /// Display names are cut to this many code points
    pub const NAME_MAX_CHARS: usize = 15;
}

/// Identifier formats
pub mod ids {
    /// Length of a player identifier
    pub const PLAYER_ID_LEN: usize = 12;
    /// Alphabet for player identifiers
    pub const PLAYER_ID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    /// Length of a room code
    pub const ROOM_ID_LEN: usize = 4;
    /// Alphabet for room codes
    pub const ROOM_ID_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    /// Prefix marking bot identifiers
    pub const BOT_ID_PREFIX: &str = "bot_";
}

/// Player colors, assigned round-robin by join order
pub mod palette {
    pub const COLORS: [&str; 8] = [
        "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4",
        "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F",
    ];
}

/// Bot behavior and bot-room pool constants
pub mod bots {
    /// Chance per tick that a bot emits an impulse
    pub const PUSH_PROBABILITY: f32 = 0.15;
    /// Impulse magnitude per axis of the (noisy) steering direction
    pub const IMPULSE: f32 = 1.2;
    /// Uniform steering noise added per axis
    pub const STEER_NOISE: f32 = 0.3;
    /// Fewest bots seeded into a new bot room
    pub const MIN_PER_ROOM: usize = 2;
    /// Most bots seeded into a new bot room (leaves space for real players)
    pub const MAX_PER_ROOM: usize = 7;
    /// Minimum waiting bot rooms the supervisor keeps available
    pub const ROOMS_MIN: usize = 2;
    /// Hard cap on waiting bot rooms
    pub const ROOMS_MAX: usize = 5;
    /// Chance per maintenance cycle to open one extra room below the cap
    pub const EXTRA_ROOM_PROBABILITY: f32 = 0.1;
    /// Seconds between supervisor maintenance cycles
    pub const MAINTENANCE_INTERVAL_SECS: u64 = 5;
    /// Seconds a finished bot room waits before auto-rematching
    pub const AUTO_REMATCH_SECS: u64 = 3;

    /// Fixed bot name pool
    pub const NAMES: [&str; 20] = [
        "Борец", "Силач", "Толкач", "Сумоист", "Чемпион",
        "Гром", "Молния", "Скала", "Титан", "Воин",
        "Буря", "Вихрь", "Танк", "Медведь", "Бык",
        "Самурай", "Ниндзя", "Дракон", "Феникс", "Лев",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_duration() {
        assert_eq!(physics::TICK_RATE, 60);
        assert_eq!(physics::TICK_MICROS, 16_666);
    }

    #[test]
    fn test_friction_is_multiplicative_decay() {
        assert!(physics::FRICTION < 1.0);
        assert!(physics::FRICTION > 0.9);
    }

    #[test]
    fn test_palette_size_matches_max_players() {
        assert_eq!(palette::COLORS.len(), rules::MAX_PLAYERS);
        for color in palette::COLORS {
            assert!(color.starts_with('#'));
            assert_eq!(color.len(), 7);
        }
    }

    #[test]
    fn test_bot_name_pool() {
        assert_eq!(bots::NAMES.len(), 20);
        assert!(bots::MIN_PER_ROOM < bots::MAX_PER_ROOM);
        assert!(bots::MAX_PER_ROOM < rules::MAX_PLAYERS);
    }

    #[test]
    fn test_bot_room_pool_bounds() {
        assert!(bots::ROOMS_MIN <= bots::ROOMS_MAX);
    }

    #[test]
    fn test_id_alphabets() {
        assert!(ids::PLAYER_ID_CHARS.iter().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert!(ids::ROOM_ID_CHARS.iter().all(|c| c.is_ascii_uppercase()));
        assert_eq!(ids::ROOM_ID_CHARS.len(), 26);
    }
}
