pub mod friendly_fire;
pub mod matches;
pub mod players;
pub mod scores;
pub mod stats;
