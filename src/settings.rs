use crate::common::env::{FromEnv, millis_from_env_or, secs_from_env, secs_from_env_or};
use serde::Deserialize;
use std::env;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::Level;

pub struct AppSettings {
    pub app_component: String,
    pub level: Level,
    pub log_json: bool,

    pub database_url: String,
    pub db_max_connections: usize,
    pub db_wait_timeout: Duration,

    pub redis_url: String,
    pub redis_max_connections: usize,
    pub redis_connection_timeout: Duration,
    pub redis_response_timeout: Duration,
    pub redis_wait_timeout: Duration,

    pub servers_config_path: PathBuf,
    pub ingest: IngestSettings,
}

/// Timings of the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Notifications for one log arriving within this window are read once.
    pub coalesce_window: Duration,
    /// A server without new lines for this long becomes inactive.
    pub inactivity_period: Duration,
    pub debounce_window: Duration,
    pub debounce_max_wait: Duration,
    pub rcon_timeout: Duration,
    pub poll_interval: Duration,
    /// Departures logged this soon after a map travel are connection re-homing.
    pub disconnect_grace: Duration,
    pub shutdown_drain: Duration,
    pub catchup: CatchupSettings,
}

#[derive(Debug, Clone)]
pub struct CatchupSettings {
    /// An RCON line this recent means something is still talking to the server.
    pub liveness_window: Duration,
    pub short_threshold: Duration,
    pub long_threshold: Duration,
    /// How far back a map change may be and still anchor the replay.
    pub marker_window: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            coalesce_window: Duration::from_millis(200),
            inactivity_period: Duration::from_secs(10),
            debounce_window: Duration::from_secs(10),
            debounce_max_wait: Duration::from_secs(25),
            rcon_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(60),
            disconnect_grace: Duration::from_secs(15),
            shutdown_drain: Duration::from_secs(10),
            catchup: CatchupSettings::default(),
        }
    }
}

impl Default for CatchupSettings {
    fn default() -> Self {
        Self {
            liveness_window: Duration::from_secs(30),
            short_threshold: Duration::from_secs(60),
            long_threshold: Duration::from_secs(6 * 60 * 60),
            marker_window: Duration::from_secs(30 * 60),
        }
    }
}

impl IngestSettings {
    pub fn load_from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let catchup = &defaults.catchup;
        Ok(IngestSettings {
            coalesce_window: millis_from_env_or("COALESCE_WINDOW_MS", defaults.coalesce_window)?,
            inactivity_period: secs_from_env_or(
                "INACTIVITY_PERIOD_SECS",
                defaults.inactivity_period,
            )?,
            debounce_window: secs_from_env_or("DEBOUNCE_WINDOW_SECS", defaults.debounce_window)?,
            debounce_max_wait: secs_from_env_or(
                "DEBOUNCE_MAX_WAIT_SECS",
                defaults.debounce_max_wait,
            )?,
            rcon_timeout: secs_from_env_or("RCON_TIMEOUT_SECS", defaults.rcon_timeout)?,
            poll_interval: secs_from_env_or("POLL_INTERVAL_SECS", defaults.poll_interval)?,
            disconnect_grace: secs_from_env_or(
                "DISCONNECT_GRACE_SECS",
                defaults.disconnect_grace,
            )?,
            shutdown_drain: secs_from_env_or("SHUTDOWN_DRAIN_SECS", defaults.shutdown_drain)?,
            catchup: CatchupSettings {
                liveness_window: secs_from_env_or(
                    "CATCHUP_LIVENESS_WINDOW_SECS",
                    catchup.liveness_window,
                )?,
                short_threshold: secs_from_env_or(
                    "CATCHUP_SHORT_THRESHOLD_SECS",
                    catchup.short_threshold,
                )?,
                long_threshold: secs_from_env_or(
                    "CATCHUP_LONG_THRESHOLD_SECS",
                    catchup.long_threshold,
                )?,
                marker_window: secs_from_env_or(
                    "CATCHUP_MARKER_WINDOW_SECS",
                    catchup.marker_window,
                )?,
            },
        })
    }
}

/// One entry of the servers config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Defaults to the log file name without extension.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub log_path: PathBuf,
    #[serde(default)]
    pub rcon_address: Option<String>,
    #[serde(default)]
    pub rcon_password: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl ServerConfig {
    pub fn external_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| {
            self.log_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.name.clone())
        })
    }
}

pub fn load_server_configs(path: &std::path::Path) -> anyhow::Result<Vec<ServerConfig>> {
    let raw = std::fs::read_to_string(path)?;
    let configs: Vec<ServerConfig> = serde_json::from_str(&raw)?;
    Ok(configs.into_iter().filter(|config| config.enabled).collect())
}

impl AppSettings {
    pub fn load_from_env() -> anyhow::Result<Self> {
        let _ = dotenv::dotenv();

        let app_component = env::var("APP_COMPONENT")?;
        let level = Level::from_env("LOG_LEVEL")?;
        let log_json = String::from_env_or("LOG_FORMAT", "compact".to_owned())? == "json";

        let database_url = env::var("DATABASE_URL")?;
        let db_max_connections = usize::from_env("DB_MAX_CONNECTIONS")?;
        let db_wait_timeout = secs_from_env("DB_WAIT_TIMEOUT_SECS")?;

        let redis_url = env::var("REDIS_URL")?;
        let redis_max_connections = usize::from_env("REDIS_MAX_CONNECTIONS")?;
        let redis_connection_timeout = secs_from_env("REDIS_CONNECTION_TIMEOUT_SECS")?;
        let redis_response_timeout = secs_from_env("REDIS_RESPONSE_TIMEOUT_SECS")?;
        let redis_wait_timeout = secs_from_env("REDIS_WAIT_TIMEOUT_SECS")?;

        let servers_config_path = PathBuf::from(env::var("SERVERS_CONFIG_PATH")?);
        let ingest = IngestSettings::load_from_env()?;

        Ok(AppSettings {
            app_component,
            level,
            log_json,

            database_url,
            db_max_connections,
            db_wait_timeout,

            redis_url,
            redis_max_connections,
            redis_connection_timeout,
            redis_response_timeout,
            redis_wait_timeout,

            servers_config_path,
            ingest,
        })
    }

    pub fn get() -> &'static AppSettings {
        settings()
    }
}

pub fn settings() -> &'static AppSettings {
    static SETTINGS: LazyLock<AppSettings> =
        LazyLock::new(|| AppSettings::load_from_env().expect("Failed to load settings"));
    SETTINGS.deref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_id_defaults_to_log_stem() {
        let configs: Vec<ServerConfig> = serde_json::from_str(
            r#"[
                {"name": "EU #1", "log_path": "/srv/logs/eu-1.log", "rcon_address": "127.0.0.1:27015"},
                {"id": "us", "name": "US", "log_path": "/srv/logs/Insurgency.log", "enabled": false}
            ]"#,
        )
        .unwrap();
        assert_eq!(configs[0].external_id(), "eu-1");
        assert!(configs[0].enabled);
        assert_eq!(configs[1].external_id(), "us");
        assert!(!configs[1].enabled);
    }
}
