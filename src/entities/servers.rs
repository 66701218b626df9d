use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Server {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub log_path: String,
    /// End offset of the last applied line. `None` until the log was first observed.
    pub log_offset: Option<u64>,
    /// Bytes of earlier log generations. Together with a line's end offset it
    /// orders every line the server ever logged.
    pub log_base: u64,
    pub log_opened_at: Option<DateTime<Utc>>,
}

pub struct UpsertServerArgs<'a> {
    pub external_id: &'a str,
    pub name: &'a str,
    pub log_path: &'a str,
}
