use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_attendance_per_min: u32,
    pub rate_protected_per_min: u32,

    /// Enforce the geofence on check-out even when the caller names a location
    pub checkout_requires_geofence: bool,
    /// Seconds an idle per-employee check lock is kept around
    pub check_lock_idle_secs: u64,

    pub api_prefix: String,
    pub log_dir: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,

            rate_attendance_per_min: parsed_or("RATE_ATTENDANCE_PER_MIN", 30)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            checkout_requires_geofence: parsed_or("CHECKOUT_REQUIRES_GEOFENCE", false)?,
            check_lock_idle_secs: parsed_or("CHECK_LOCK_IDLE_SECS", 60)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/test".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            rate_attendance_per_min: 30,
            rate_protected_per_min: 1000,
            checkout_requires_geofence: false,
            check_lock_idle_secs: 60,
            api_prefix: "/api".into(),
            log_dir: "logs".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_fall_back_to_defaults() {
        assert_eq!(parsed_or("GUARD_TEST_UNSET_RATE", 30u32).unwrap(), 30);
        assert!(!parsed_or("GUARD_TEST_UNSET_FLAG", false).unwrap());
    }
}
