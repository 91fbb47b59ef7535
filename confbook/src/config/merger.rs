//! Configuration merging and precedence handling.
//!
//! Sources are folded from lowest to highest precedence. Administrators
//! accumulate across sources; every other field is overwritten.

use crate::config::loader::ConfigSource;
use crate::config::schema::{Config, DatabaseSection, SchedulerConfig};

/// Merges configuration sources according to precedence rules.
///
/// # Examples
///
/// ```
/// use confbook::config::{Config, ConfigMerger};
///
/// let low = Config { log_mode: Some("quiet".to_string()), ..Default::default() };
/// let high = Config { log_mode: Some("verbose".to_string()), ..Default::default() };
///
/// let mut result = low;
/// ConfigMerger::merge_into(&mut result, &high);
/// assert_eq!(result.log_mode, Some("verbose".to_string()));
/// ```
pub struct ConfigMerger;

impl ConfigMerger {
    /// Merge multiple configuration sources into final config.
    ///
    /// Sources should be provided in order from lowest to highest precedence.
    #[must_use]
    pub fn merge(sources: Vec<ConfigSource>) -> Config {
        let mut result = Config::default();
        for source in sources {
            Self::merge_into(&mut result, &source.config);
        }
        result
    }

    /// Merge source config into target (source overwrites target).
    ///
    /// # Merging Rules
    ///
    /// - Simple fields: source overwrites if Some
    /// - Nested sections: field-by-field merge
    /// - Administrators: accumulated, without duplicates
    pub fn merge_into(target: &mut Config, source: &Config) {
        if source.log_mode.is_some() {
            target.log_mode.clone_from(&source.log_mode);
        }

        if let Some(ref source_scheduler) = source.scheduler {
            target.scheduler = Some(match &target.scheduler {
                Some(target_scheduler) => Self::merge_scheduler(target_scheduler, source_scheduler),
                None => source_scheduler.clone(),
            });
        }

        if let Some(ref source_database) = source.database {
            target.database = Some(match &target.database {
                Some(target_database) => Self::merge_database(target_database, source_database),
                None => source_database.clone(),
            });
        }

        if let Some(ref source_admins) = source.administrators {
            let admins = target.administrators.get_or_insert_with(Vec::new);
            for admin in source_admins {
                if !admins.contains(admin) {
                    admins.push(admin.clone());
                }
            }
        }
    }

    fn merge_scheduler(target: &SchedulerConfig, source: &SchedulerConfig) -> SchedulerConfig {
        SchedulerConfig {
            maximum_future_days: source.maximum_future_days.or(target.maximum_future_days),
            reservation_maximum_duration_minutes: source
                .reservation_maximum_duration_minutes
                .or(target.reservation_maximum_duration_minutes),
            room_maximum_duration_minutes: source
                .room_maximum_duration_minutes
                .or(target.room_maximum_duration_minutes),
            value_maximum_duration_minutes: source
                .value_maximum_duration_minutes
                .or(target.value_maximum_duration_minutes),
            hash_retry_budget: source.hash_retry_budget.or(target.hash_retry_budget),
        }
    }

    fn merge_database(target: &DatabaseSection, source: &DatabaseSection) -> DatabaseSection {
        DatabaseSection {
            path: source.path.clone().or_else(|| target.path.clone()),
            busy_timeout_ms: source.busy_timeout_ms.or(target.busy_timeout_ms),
        }
    }
}
