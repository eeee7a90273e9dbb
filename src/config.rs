use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub student_rps: u32,
    pub cors_origins: Vec<String>,
    pub log_format: LogFormat,
    pub result_retention_months: Option<u32>,
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Tunables of the session engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Violations tolerated with a warning; the next one auto-submits.
    pub violation_limit: u32,
    pub warning_display: Duration,
    /// Silence after which a session that has not reached its deadline is treated as abandoned.
    ///
    /// The engine cannot tell a closed tab from a dropped network. A student
    /// offline for longer than this loses the captured answers and violation
    /// count, and may start the quiz again with a full timer. Raise
    /// `HEARTBEAT_GRACE_SECS` where connections are unreliable.
    pub heartbeat_grace: Duration,
    /// How long a submitted session stays queryable before it is discarded.
    pub finished_retention: Duration,
    pub sweep_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            violation_limit: 3,
            warning_display: Duration::from_secs(10),
            heartbeat_grace: Duration::from_secs(120),
            finished_retention: Duration::from_secs(300),
            sweep_interval: Duration::from_millis(1000),
        }
    }
}

impl EngineSettings {
    /// Rejects values the background sweep cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(Error::Config(
                "SWEEP_INTERVAL_MS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = EngineSettings::default();
        let engine = EngineSettings {
            violation_limit: get_env_or("VIOLATION_LIMIT", defaults.violation_limit)?,
            warning_display: Duration::from_secs(get_env_or(
                "WARNING_DISPLAY_SECS",
                defaults.warning_display.as_secs(),
            )?),
            heartbeat_grace: Duration::from_secs(get_env_or(
                "HEARTBEAT_GRACE_SECS",
                defaults.heartbeat_grace.as_secs(),
            )?),
            finished_retention: Duration::from_secs(get_env_or(
                "FINISHED_RETENTION_SECS",
                defaults.finished_retention.as_secs(),
            )?),
            sweep_interval: Duration::from_millis(get_env_or(
                "SWEEP_INTERVAL_MS",
                defaults.sweep_interval.as_millis() as u64,
            )?),
        };
        engine.validate()?;

        let log_format = match env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") => LogFormat::Json,
            Some("text") | None => LogFormat::Text,
            Some(other) => {
                return Err(Error::Config(format!("Invalid value for LOG_FORMAT: {}", other)))
            }
        };

        let result_retention_months = match env::var("RESULT_RETENTION_MONTHS") {
            Ok(_) => Some(get_env_parse::<u32>("RESULT_RETENTION_MONTHS")?),
            Err(_) => None,
        };

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            jwt_secret: get_env("JWT_SECRET")?,
            student_rps: get_env_or("STUDENT_RPS", 20)?,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            log_format,
            result_retention_months,
            engine,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(_) => get_env_parse(name),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
