use std::env;
use std::str::FromStr;

use chrono::NaiveTime;
use dotenvy::dotenv;
use thiserror::Error;

use crate::attendance::policy::AttendancePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    pub attendance: AttendancePolicy,
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

fn clock_or(key: &'static str, default: NaiveTime) -> Result<NaiveTime, ConfigError> {
    match env::var(key) {
        Ok(value) => NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

/// Reject policies that would silently accept or refuse every request.
fn validate_policy(policy: &AttendancePolicy) -> Result<(), ConfigError> {
    let hours = policy.min_work_hours;
    if !hours.is_finite() || hours < 0.0 || hours > 24.0 {
        return Err(ConfigError::Invalid {
            key: "MIN_WORK_HOURS",
            value: hours.to_string(),
        });
    }
    if policy.check_in_closes < policy.check_in_opens {
        return Err(ConfigError::Invalid {
            key: "CHECK_IN_CLOSES",
            value: policy.check_in_closes.format("%H:%M").to_string(),
        });
    }
    Ok(())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let defaults = AttendancePolicy::default();
        let attendance = AttendancePolicy {
            check_in_opens: clock_or("CHECK_IN_OPENS", defaults.check_in_opens)?,
            check_in_closes: clock_or("CHECK_IN_CLOSES", defaults.check_in_closes)?,
            late_after: clock_or("LATE_AFTER", defaults.late_after)?,
            check_out_opens: clock_or("CHECK_OUT_OPENS", defaults.check_out_opens)?,
            min_work_hours: parsed_or("MIN_WORK_HOURS", defaults.min_work_hours)?,
        };
        validate_policy(&attendance)?;

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parsed_or("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parsed_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            attendance,
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/attendance_test".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            log_dir: "logs".into(),
            attendance: AttendancePolicy::default(),
        }
    }
}
