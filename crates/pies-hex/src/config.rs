use pies_types::domain::schedule::LookaheadWindow;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub database_url: String,
    pub operator_ids: Vec<i64>,
    pub server_port: String,
    pub telegram_api_url: String,
    pub reminder_interval: Duration,
    pub reminder_window: LookaheadWindow,
    pub dialogue_idle_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            get(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };
        let number = |var: &'static str, default: i64| -> Result<i64, ConfigError> {
            match get(var) {
                Some(v) => parse(var, &v),
                None => Ok(default),
            }
        };

        let bot_token = required("BOT_TOKEN")?;
        let database_url = required("DATABASE_URL")?;
        let operator_ids = get("OPERATOR_IDS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| parse("OPERATOR_IDS", s))
            .collect::<Result<Vec<i64>, _>>()?;

        let window_start = number("REMINDER_WINDOW_START_HOURS", 23)?;
        let window_end = number("REMINDER_WINDOW_END_HOURS", 25)?;
        if window_end <= window_start {
            return Err(ConfigError::Invalid {
                var: "REMINDER_WINDOW_END_HOURS",
                value: window_end.to_string(),
            });
        }

        Ok(Self {
            bot_token,
            database_url,
            operator_ids,
            server_port: get("SERVER_PORT").unwrap_or_else(|| "3000".into()),
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| pies_telegram::DEFAULT_API_URL.into()),
            reminder_interval: seconds("REMINDER_INTERVAL_SECS", number("REMINDER_INTERVAL_SECS", 3600)?)?,
            reminder_window: LookaheadWindow::hours(window_start, window_end),
            dialogue_idle_timeout: seconds(
                "DIALOGUE_IDLE_TIMEOUT_SECS",
                number("DIALOGUE_IDLE_TIMEOUT_SECS", 3600)?,
            )?,
        })
    }
}

fn parse<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}

fn seconds(var: &'static str, secs: i64) -> Result<Duration, ConfigError> {
    u64::try_from(secs)
        .ok()
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
        .ok_or(ConfigError::Invalid {
            var,
            value: secs.to_string(),
        })
}
