//! Typed scheduler limits resolved from the configuration.

use chrono::{DateTime, Duration, Utc};

use super::schema::Config;
use crate::value::DEFAULT_HASH_RETRY_BUDGET;

/// Default horizon of reservations in days.
pub const DEFAULT_MAXIMUM_FUTURE_DAYS: u32 = 120;

/// Limits applied by the scheduler.
///
/// # Examples
///
/// ```
/// use chrono::Duration;
/// use confbook::config::{Config, SchedulerConfig, SchedulerSettings};
///
/// let config = Config {
///     scheduler: Some(SchedulerConfig {
///         room_maximum_duration_minutes: Some(90),
///         ..Default::default()
///     }),
///     ..Default::default()
/// };
/// let settings = SchedulerSettings::from_config(&config);
/// assert_eq!(settings.room_maximum_duration, Duration::minutes(90));
/// assert_eq!(settings.maximum_future, Duration::days(120));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// How far ahead of the reference date/time slots may end.
    pub maximum_future: Duration,
    /// Longest slot of a plain resource reservation.
    pub reservation_maximum_duration: Duration,
    /// Longest slot of a room reservation.
    pub room_maximum_duration: Duration,
    /// Longest slot of a value or alias reservation.
    pub value_maximum_duration: Duration,
    /// Random attempts for hash patterns.
    pub hash_retry_budget: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            maximum_future: Duration::days(i64::from(DEFAULT_MAXIMUM_FUTURE_DAYS)),
            reservation_maximum_duration: Duration::days(1),
            room_maximum_duration: Duration::days(1),
            value_maximum_duration: Duration::days(365),
            hash_retry_budget: DEFAULT_HASH_RETRY_BUDGET,
        }
    }
}

impl SchedulerSettings {
    /// Resolves the settings, falling back to defaults for unset fields.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        let Some(scheduler) = config.scheduler.as_ref() else {
            return defaults;
        };
        let minutes = |value: Option<u32>, default: Duration| {
            value.map_or(default, |m| Duration::minutes(i64::from(m)))
        };
        Self {
            maximum_future: scheduler
                .maximum_future_days
                .map_or(defaults.maximum_future, |d| Duration::days(i64::from(d))),
            reservation_maximum_duration: minutes(
                scheduler.reservation_maximum_duration_minutes,
                defaults.reservation_maximum_duration,
            ),
            room_maximum_duration: minutes(
                scheduler.room_maximum_duration_minutes,
                defaults.room_maximum_duration,
            ),
            value_maximum_duration: minutes(
                scheduler.value_maximum_duration_minutes,
                defaults.value_maximum_duration,
            ),
            hash_retry_budget: scheduler
                .hash_retry_budget
                .unwrap_or(defaults.hash_retry_budget),
        }
    }

    /// Returns the latest allowed slot end for the given reference time.
    #[must_use]
    pub fn maximum_future_date_time(&self, reference: DateTime<Utc>) -> DateTime<Utc> {
        reference + self.maximum_future
    }
}
