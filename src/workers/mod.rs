pub mod crons;
pub mod daemons;
