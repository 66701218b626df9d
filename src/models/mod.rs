pub mod events;
pub mod matches;
pub mod servers;
pub mod weapons;
