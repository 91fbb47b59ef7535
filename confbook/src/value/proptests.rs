//! Property-based tests for pattern enumeration and value providers.

use std::collections::BTreeSet;

use super::{Pattern, PatternValueProvider, ValueProvider};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    // Enumeration is strictly ascending and every value matches its pattern
    #[test]
    fn number_range_enumeration_ascending(low in 0u64..500, span in 0u64..200) {
        let high = low + span;
        let source = format!("n{{number:{low}:{high}}}");
        let pattern = Pattern::parse(&source).unwrap();
        let values: Vec<String> = pattern.values().collect();

        prop_assert_eq!(values.len() as u64, span + 1);
        let numbers: Vec<u64> = values.iter().map(|v| v[1..].parse().unwrap()).collect();
        prop_assert!(numbers.windows(2).all(|w| w[0] + 1 == w[1]));
        for value in &values {
            prop_assert!(pattern.matches(value), "{} should match {}", value, source);
        }
    }

    // The provider returns the smallest unused value of a digit pattern
    #[test]
    fn provider_returns_smallest_unused(taken in prop::collection::btree_set(1u64..100, 0..60)) {
        let provider = PatternValueProvider::new(&["{digit:2}"]).unwrap();
        let used: BTreeSet<String> = taken.iter().map(|n| format!("{n:02}")).collect();
        let expected = (1u64..100).find(|n| !taken.contains(n)).map(|n| format!("{n:02}"));

        match provider.generate_added_value(&used) {
            Ok(value) => prop_assert_eq!(Some(value), expected),
            Err(_) => prop_assert!(expected.is_none()),
        }
    }

    // Values outside the range are never accepted as requested values
    #[test]
    fn requested_value_outside_range_rejected(value in 0u64..1000) {
        let provider = PatternValueProvider::new(&["{number:85:98}"]).unwrap();
        let result = provider.generate_value(&BTreeSet::new(), &value.to_string());
        prop_assert_eq!(result.is_ok(), (85..=98).contains(&value));
    }

    // Hash values always have the requested length
    #[test]
    fn hash_length_is_fixed(length in 1usize..20) {
        let pattern = Pattern::parse(&format!("{{hash:{length}}}")).unwrap();
        let mut rng = rand::rng();
        let value = pattern.random_value(&mut rng);
        prop_assert_eq!(value.len(), length);
        prop_assert!(pattern.matches(&value));
    }
}
