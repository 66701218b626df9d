pub mod friendly_fire_incidents;
pub mod match_player_stats;
pub mod match_weapon_stats;
pub mod matches;
pub mod players;
pub mod servers;
