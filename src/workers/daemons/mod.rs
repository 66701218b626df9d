pub mod log_watcher;
pub mod score_debouncer;
