use std::env;
use std::error::Error;
use std::str::FromStr;
use std::time::Duration;

pub trait FromEnv: Sized {
    fn from_env(env_var: &str) -> anyhow::Result<Self>;

    /// An unset variable yields `default`; a set but malformed one is still an error.
    fn from_env_or(env_var: &str, default: Self) -> anyhow::Result<Self> {
        match env::var(env_var) {
            Err(env::VarError::NotPresent) => Ok(default),
            _ => Self::from_env(env_var),
        }
    }
}

impl<T: FromStr> FromEnv for T
where
    <T as FromStr>::Err: 'static + Error + Send + Sync,
{
    fn from_env(env_var: &str) -> anyhow::Result<Self> {
        let value = env::var(env_var)?;
        T::from_str(value.trim())
            .map_err(|e| anyhow::anyhow!("{env_var}={value:?} is invalid: {e}"))
    }
}

pub fn secs_from_env(env_var: &str) -> anyhow::Result<Duration> {
    u64::from_env(env_var).map(Duration::from_secs)
}

pub fn secs_from_env_or(env_var: &str, default: Duration) -> anyhow::Result<Duration> {
    u64::from_env_or(env_var, default.as_secs()).map(Duration::from_secs)
}

pub fn millis_from_env_or(env_var: &str, default: Duration) -> anyhow::Result<Duration> {
    u64::from_env_or(env_var, default.as_millis() as u64).map(Duration::from_millis)
}
