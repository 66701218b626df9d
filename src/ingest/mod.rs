mod processor;
pub mod tail;

pub use processor::LogProcessor;
