//! Environment variable handling for configuration overrides.
//!
//! This module provides support for `CONFBOOK_*` environment variables that
//! override configuration file values.

use crate::config::schema::Config;
use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Handles environment variable overrides for configuration.
///
/// | Variable | Field |
/// |---|---|
/// | `CONFBOOK_MAXIMUM_FUTURE_DAYS` | `scheduler.maximum_future_days` |
/// | `CONFBOOK_RESERVATION_MAXIMUM_DURATION_MINUTES` | `scheduler.reservation_maximum_duration_minutes` |
/// | `CONFBOOK_ROOM_MAXIMUM_DURATION_MINUTES` | `scheduler.room_maximum_duration_minutes` |
/// | `CONFBOOK_VALUE_MAXIMUM_DURATION_MINUTES` | `scheduler.value_maximum_duration_minutes` |
/// | `CONFBOOK_HASH_RETRY_BUDGET` | `scheduler.hash_retry_budget` |
/// | `CONFBOOK_DATABASE_PATH` | `database.path` |
/// | `CONFBOOK_BUSY_TIMEOUT_MS` | `database.busy_timeout_ms` |
/// | `CONFBOOK_ADMINISTRATORS` | `administrators` (comma-separated, appended) |
/// | `CONFBOOK_LOG_MODE` | `log_mode` |
///
/// # Examples
///
/// ```no_run
/// use confbook::config::{Config, EnvironmentConfig};
///
/// let mut config = Config::default();
/// EnvironmentConfig::apply_overrides(&mut config).unwrap();
/// ```
pub struct EnvironmentConfig;

impl EnvironmentConfig {
    /// Apply environment variable overrides to config.
    ///
    /// # Errors
    ///
    /// Returns an error if any environment variable value is invalid
    /// (e.g., a non-numeric duration).
    pub fn apply_overrides(config: &mut Config) -> Result<()> {
        Self::apply_scheduler_overrides(config)?;
        Self::apply_database_overrides(config)?;

        if let Ok(admins) = env::var("CONFBOOK_ADMINISTRATORS") {
            let parsed = Self::parse_list(&admins);
            let existing = config.administrators.get_or_insert_with(Vec::new);
            for admin in parsed {
                if !existing.contains(&admin) {
                    existing.push(admin);
                }
            }
        }

        if let Ok(mode) = env::var("CONFBOOK_LOG_MODE") {
            config.log_mode = Some(mode);
        }

        Ok(())
    }

    fn apply_scheduler_overrides(config: &mut Config) -> Result<()> {
        let mut scheduler = config.scheduler.clone().unwrap_or_default();
        let mut modified = false;

        for (name, field) in [
            (
                "CONFBOOK_MAXIMUM_FUTURE_DAYS",
                &mut scheduler.maximum_future_days,
            ),
            (
                "CONFBOOK_RESERVATION_MAXIMUM_DURATION_MINUTES",
                &mut scheduler.reservation_maximum_duration_minutes,
            ),
            (
                "CONFBOOK_ROOM_MAXIMUM_DURATION_MINUTES",
                &mut scheduler.room_maximum_duration_minutes,
            ),
            (
                "CONFBOOK_VALUE_MAXIMUM_DURATION_MINUTES",
                &mut scheduler.value_maximum_duration_minutes,
            ),
            ("CONFBOOK_HASH_RETRY_BUDGET", &mut scheduler.hash_retry_budget),
        ] {
            if let Ok(value) = env::var(name) {
                *field = Some(Self::parse_number(name, &value)?);
                modified = true;
            }
        }

        if modified {
            config.scheduler = Some(scheduler);
        }
        Ok(())
    }

    fn apply_database_overrides(config: &mut Config) -> Result<()> {
        let mut database = config.database.clone().unwrap_or_default();
        let mut modified = false;

        if let Ok(path) = env::var("CONFBOOK_DATABASE_PATH") {
            database.path = Some(PathBuf::from(path));
            modified = true;
        }

        if let Ok(ms) = env::var("CONFBOOK_BUSY_TIMEOUT_MS") {
            database.busy_timeout_ms = Some(Self::parse_number("CONFBOOK_BUSY_TIMEOUT_MS", &ms)?);
            modified = true;
        }

        if modified {
            config.database = Some(database);
        }
        Ok(())
    }

    /// Parse an unsigned number from an environment variable value.
    fn parse_number<T: FromStr>(field: &str, s: &str) -> Result<T> {
        s.trim().parse().map_err(|_| Error::Validation {
            field: field.into(),
            message: format!("Must be a non-negative integer, got '{s}'"),
        })
    }

    /// Split a comma-separated list, dropping blank items.
    fn parse_list(s: &str) -> Vec<String> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: [&str; 9] = [
        "CONFBOOK_MAXIMUM_FUTURE_DAYS",
        "CONFBOOK_RESERVATION_MAXIMUM_DURATION_MINUTES",
        "CONFBOOK_ROOM_MAXIMUM_DURATION_MINUTES",
        "CONFBOOK_VALUE_MAXIMUM_DURATION_MINUTES",
        "CONFBOOK_HASH_RETRY_BUDGET",
        "CONFBOOK_DATABASE_PATH",
        "CONFBOOK_BUSY_TIMEOUT_MS",
        "CONFBOOK_ADMINISTRATORS",
        "CONFBOOK_LOG_MODE",
    ];

    fn clear_env() {
        for var in ALL_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(EnvironmentConfig::parse_number::<u32>("test", "42").unwrap(), 42);
        assert_eq!(EnvironmentConfig::parse_number::<u32>("test", " 7 ").unwrap(), 7);
        assert!(EnvironmentConfig::parse_number::<u32>("test", "-1").is_err());
        assert!(EnvironmentConfig::parse_number::<u64>("test", "abc").is_err());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            EnvironmentConfig::parse_list("root, alice,,bob "),
            vec!["root".to_string(), "alice".to_string(), "bob".to_string()]
        );
        assert!(EnvironmentConfig::parse_list("").is_empty());
    }

    #[test]
    #[serial]
    fn test_apply_overrides_no_env_vars() {
        clear_env();
        let mut config = Config::default();
        EnvironmentConfig::apply_overrides(&mut config).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_apply_overrides() {
        clear_env();
        env::set_var("CONFBOOK_ROOM_MAXIMUM_DURATION_MINUTES", "90");
        env::set_var("CONFBOOK_BUSY_TIMEOUT_MS", "250");
        env::set_var("CONFBOOK_ADMINISTRATORS", "bob,root");
        env::set_var("CONFBOOK_LOG_MODE", "verbose");

        let mut config = Config {
            administrators: Some(vec!["root".into()]),
            ..Default::default()
        };
        let result = EnvironmentConfig::apply_overrides(&mut config);
        clear_env();
        result.unwrap();

        let scheduler = config.scheduler.unwrap();
        assert_eq!(scheduler.room_maximum_duration_minutes, Some(90));
        assert_eq!(scheduler.maximum_future_days, None);
        assert_eq!(config.database.unwrap().busy_timeout_ms, Some(250));
        assert_eq!(
            config.administrators,
            Some(vec!["root".to_string(), "bob".to_string()])
        );
        assert_eq!(config.log_mode, Some("verbose".to_string()));
    }

    #[test]
    #[serial]
    fn test_invalid_number_rejected() {
        clear_env();
        env::set_var("CONFBOOK_HASH_RETRY_BUDGET", "many");
        let mut config = Config::default();
        let result = EnvironmentConfig::apply_overrides(&mut config);
        clear_env();
        assert!(matches!(result, Err(Error::Validation { ref field, .. }) if field == "CONFBOOK_HASH_RETRY_BUDGET"));
    }
}
