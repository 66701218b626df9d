pub mod log_replay;
pub mod rcon_poll;
