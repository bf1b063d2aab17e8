//! services/expiry_worker/src/config.rs
//!
//! Defines the worker's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::NaiveTime;
use freshness_core::{EngineSettings, FanoutScope};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the FCM HTTP v1 API.
#[derive(Clone, Debug)]
pub struct FcmConfig {
    pub project_id: String,
    pub access_token: String,
    pub base_url: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Local time of day at which the daily sweep runs.
    pub sweep_at: NaiveTime,
    pub run_on_startup: bool,
    /// `None` means offline-notification mode.
    pub fcm: Option<FcmConfig>,
    pub engine: EngineSettings,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", &var_or("BIND_ADDRESS", "0.0.0.0:3000"))?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Scheduling ---
        let sweep_at_str = var_or("SWEEP_AT", "09:00");
        let sweep_at = NaiveTime::parse_from_str(&sweep_at_str, "%H:%M").map_err(|e| {
            ConfigError::InvalidValue("SWEEP_AT".to_string(), format!("'{sweep_at_str}': {e}"))
        })?;
        let run_on_startup = parse_bool("RUN_ON_STARTUP", &var_or("RUN_ON_STARTUP", "false"))?;

        // --- Engine Settings ---
        let defaults = EngineSettings::default();
        let reminder_lead_days = match lookup("REMINDER_LEAD_DAYS") {
            Some(raw) => parse_lead_days(&raw)
                .map_err(|e| ConfigError::InvalidValue("REMINDER_LEAD_DAYS".to_string(), e))?,
            None => defaults.reminder_lead_days,
        };
        let default_opened_rule: u32 =
            parse_var("DEFAULT_OPENED_RULE", &var_or("DEFAULT_OPENED_RULE", "3"))?;
        if default_opened_rule == 0 {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_OPENED_RULE".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let lookahead_days = parse_var("LOOKAHEAD_DAYS", &var_or("LOOKAHEAD_DAYS", "7"))?;
        let notification_title = var_or("NOTIFICATION_TITLE", &defaults.notification_title);
        let fanout_scope: FanoutScope = var_or("FANOUT_SCOPE", "owner")
            .parse()
            .map_err(|e| ConfigError::InvalidValue("FANOUT_SCOPE".to_string(), e))?;
        let push_timeout_secs: u64 =
            parse_var("PUSH_TIMEOUT_SECS", &var_or("PUSH_TIMEOUT_SECS", "10"))?;
        let push_concurrency = parse_var("PUSH_CONCURRENCY", &var_or("PUSH_CONCURRENCY", "8"))?;

        // --- Push Credentials (as optional) ---
        let fcm = match (lookup("FCM_PROJECT_ID"), lookup("FCM_ACCESS_TOKEN")) {
            (Some(project_id), Some(access_token))
                if !project_id.trim().is_empty() && !access_token.trim().is_empty() =>
            {
                Some(FcmConfig {
                    project_id,
                    access_token,
                    base_url: var_or("FCM_BASE_URL", "https://fcm.googleapis.com"),
                })
            }
            _ => None,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            sweep_at,
            run_on_startup,
            fcm,
            engine: EngineSettings {
                reminder_lead_days,
                default_opened_rule,
                lookahead_days,
                notification_title,
                fanout_scope,
                push_timeout: Duration::from_secs(push_timeout_secs),
                push_concurrency,
            },
        })
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("'{raw}': {e}")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{raw}' is not a boolean"),
        )),
    }
}

/// Parses a comma-separated list of positive day counts, e.g. `7,3,1`.
pub fn parse_lead_days(raw: &str) -> Result<Vec<u32>, String> {
    let days = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u32>() {
            Ok(0) => Err("lead days must be positive".to_string()),
            Ok(d) => Ok(d),
            Err(e) => Err(format!("'{s}': {e}")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if days.is_empty() {
        return Err("at least one lead day is required".to_string());
    }
    Ok(days)
}
