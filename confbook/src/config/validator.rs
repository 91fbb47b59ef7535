//! Configuration validation.
//!
//! Limits must be positive, administrator ids must be usable principal ids
//! and the log mode must be one the logger understands.

use crate::config::schema::{Config, DatabaseSection, SchedulerConfig};
use crate::error::{Error, Result};
use crate::logging::LogLevel;

/// Validates configuration values.
///
/// # Examples
///
/// ```
/// use confbook::config::{Config, ConfigValidator};
///
/// let config = Config::default();
/// ConfigValidator::validate(&config).unwrap();
/// ```
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a complete configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first offending field.
    pub fn validate(config: &Config) -> Result<()> {
        if let Some(ref scheduler) = config.scheduler {
            Self::validate_scheduler(scheduler)?;
        }

        if let Some(ref database) = config.database {
            Self::validate_database(database)?;
        }

        if let Some(ref admins) = config.administrators {
            for admin in admins {
                Self::validate_principal("administrators", admin)?;
            }
        }

        if let Some(ref mode) = config.log_mode {
            LogLevel::parse(mode).map_err(|message| Error::Validation {
                field: "log_mode".into(),
                message,
            })?;
        }

        Ok(())
    }

    fn validate_scheduler(scheduler: &SchedulerConfig) -> Result<()> {
        for (field, value) in [
            ("scheduler.maximum_future_days", scheduler.maximum_future_days),
            (
                "scheduler.reservation_maximum_duration_minutes",
                scheduler.reservation_maximum_duration_minutes,
            ),
            (
                "scheduler.room_maximum_duration_minutes",
                scheduler.room_maximum_duration_minutes,
            ),
            (
                "scheduler.value_maximum_duration_minutes",
                scheduler.value_maximum_duration_minutes,
            ),
            ("scheduler.hash_retry_budget", scheduler.hash_retry_budget),
        ] {
            if value == Some(0) {
                return Err(Error::Validation {
                    field: field.into(),
                    message: "Must be greater than 0".into(),
                });
            }
        }
        Ok(())
    }

    fn validate_database(database: &DatabaseSection) -> Result<()> {
        if database.busy_timeout_ms == Some(0) {
            return Err(Error::Validation {
                field: "database.busy_timeout_ms".into(),
                message: "Timeout must be greater than 0".into(),
            });
        }
        if database
            .path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(Error::Validation {
                field: "database.path".into(),
                message: "Cannot be empty".into(),
            });
        }
        Ok(())
    }

    /// Checks that a principal id is non-empty after trimming, contains no
    /// null bytes and is at most 255 characters.
    fn validate_principal(field: &str, value: &str) -> Result<()> {
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(Error::Validation {
                field: field.into(),
                message: "Cannot be empty or only whitespace".into(),
            });
        }

        if trimmed.contains('\0') {
            return Err(Error::Validation {
                field: field.into(),
                message: "Cannot contain null bytes".into(),
            });
        }

        if trimmed.len() > 255 {
            return Err(Error::Validation {
                field: field.into(),
                message: "Cannot exceed 255 characters".into(),
            });
        }

        Ok(())
    }
}
