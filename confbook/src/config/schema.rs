//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for confbook:
//! scheduler limits, the database location, administrators and the log mode.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::database::DatabaseConfig;

/// Complete configuration structure.
///
/// Every field is optional so that several sources can be layered on top of
/// each other.
///
/// # Examples
///
/// ```
/// use confbook::config::{Config, SchedulerConfig};
///
/// let config = Config {
///     scheduler: Some(SchedulerConfig {
///         maximum_future_days: Some(30),
///         ..Default::default()
///     }),
///     ..Default::default()
/// };
/// assert_eq!(config.scheduler.unwrap().maximum_future_days, Some(30));
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Scheduler limits.
    pub scheduler: Option<SchedulerConfig>,

    /// Database location and locking.
    pub database: Option<DatabaseSection>,

    /// Principal ids treated as administrators.
    ///
    /// Administrators can do anything, so grants to them are not stored.
    #[serde(default)]
    pub administrators: Option<Vec<String>>,

    /// Log verbosity (`quiet`, `normal` or `verbose`).
    pub log_mode: Option<String>,
}

/// Scheduler limits.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// How many days ahead reservations may end.
    pub maximum_future_days: Option<u32>,

    /// Longest plain resource reservation, in minutes.
    pub reservation_maximum_duration_minutes: Option<u32>,

    /// Longest room reservation, in minutes.
    pub room_maximum_duration_minutes: Option<u32>,

    /// Longest value or alias reservation, in minutes.
    pub value_maximum_duration_minutes: Option<u32>,

    /// Number of random attempts for hash value patterns.
    pub hash_retry_budget: Option<u32>,
}

/// Database settings.
///
/// # Examples
///
/// ```
/// use confbook::config::DatabaseSection;
///
/// let yaml = "path: /var/lib/confbook/confbook.db\nbusy_timeout_ms: 250\n";
/// let section: DatabaseSection = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(section.busy_timeout_ms, Some(250));
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    /// Path of the `SQLite` file.
    pub path: Option<PathBuf>,

    /// How long to wait for a locked database, in milliseconds.
    pub busy_timeout_ms: Option<u64>,
}

impl Config {
    /// Builds the database configuration, using `default_path` when no path
    /// is configured.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use confbook::config::{Config, DatabaseSection};
    ///
    /// let config = Config {
    ///     database: Some(DatabaseSection { path: None, busy_timeout_ms: Some(100) }),
    ///     ..Default::default()
    /// };
    /// let db = config.database_config("/tmp/confbook.db");
    /// assert_eq!(db.busy_timeout, Duration::from_millis(100));
    /// ```
    #[must_use]
    pub fn database_config(&self, default_path: impl Into<PathBuf>) -> DatabaseConfig {
        let section = self.database.clone().unwrap_or_default();
        let mut config = DatabaseConfig::new(section.path.unwrap_or_else(|| default_path.into()));
        if let Some(ms) = section.busy_timeout_ms {
            config = config.with_busy_timeout(Duration::from_millis(ms));
        }
        config
    }

    /// Returns whether `principal_id` is listed as an administrator.
    #[must_use]
    pub fn is_administrator(&self, principal_id: &str) -> bool {
        self.administrators
            .as_ref()
            .is_some_and(|admins| admins.iter().any(|a| a == principal_id))
    }
}
