//! Property-based tests for configuration merging and validation.

use super::merger::ConfigMerger;
use super::schema::{Config, SchedulerConfig};
use super::validator::ConfigValidator;
use proptest::prelude::*;

fn limit() -> impl Strategy<Value = Option<u32>> {
    prop::option::of(1u32..=100_000)
}

fn scheduler_strategy() -> impl Strategy<Value = SchedulerConfig> {
    (limit(), limit(), limit(), limit(), limit()).prop_map(
        |(future, reservation, room, value, budget)| SchedulerConfig {
            maximum_future_days: future,
            reservation_maximum_duration_minutes: reservation,
            room_maximum_duration_minutes: room,
            value_maximum_duration_minutes: value,
            hash_retry_budget: budget,
        },
    )
}

fn config_strategy() -> impl Strategy<Value = Config> {
    (
        prop::option::of(scheduler_strategy()),
        prop::option::of(prop::collection::vec("[a-z]{1,12}", 0..4)),
        prop::option::of(prop::sample::select(vec!["quiet", "normal", "verbose"])),
    )
        .prop_map(|(scheduler, administrators, log_mode)| Config {
            scheduler,
            administrators,
            log_mode: log_mode.map(String::from),
            ..Default::default()
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 2000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn merge_with_empty_is_identity(config in config_strategy()) {
        let mut merged = config.clone();
        ConfigMerger::merge_into(&mut merged, &Config::default());
        prop_assert_eq!(&merged, &config);
    }

    #[test]
    fn higher_precedence_scalar_wins(low in config_strategy(), high in config_strategy()) {
        let mut merged = low.clone();
        ConfigMerger::merge_into(&mut merged, &high);

        let expected_mode = high.log_mode.clone().or(low.log_mode.clone());
        prop_assert_eq!(merged.log_mode, expected_mode);

        let merged_future = merged.scheduler.as_ref().and_then(|s| s.maximum_future_days);
        let expected_future = high
            .scheduler
            .as_ref()
            .and_then(|s| s.maximum_future_days)
            .or_else(|| low.scheduler.as_ref().and_then(|s| s.maximum_future_days));
        prop_assert_eq!(merged_future, expected_future);
    }

    #[test]
    fn administrators_are_a_union(low in config_strategy(), high in config_strategy()) {
        let mut merged = low.clone();
        ConfigMerger::merge_into(&mut merged, &high);

        let merged_admins = merged.administrators.unwrap_or_default();
        for admin in low.administrators.iter().chain(high.administrators.iter()).flatten() {
            prop_assert!(merged_admins.contains(admin));
        }
    }

    #[test]
    fn positive_limits_validate(config in config_strategy()) {
        prop_assert!(ConfigValidator::validate(&config).is_ok());
    }
}
