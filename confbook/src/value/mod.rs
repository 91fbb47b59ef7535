//! Unique value allocation from textual patterns.
//!
//! Alias providers hand out room names, E.164 numbers and URIs. Each
//! provider is configured with patterns such as `950{digit:3}`,
//! `{number:050:120}` or `{hash:8}`; the [`PatternValueProvider`] picks the
//! first candidate not yet taken.
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeSet;
//! use confbook::value::{PatternValueProvider, ValueProvider};
//!
//! let provider = PatternValueProvider::new(&["{number:5:45}"]).unwrap();
//! assert_eq!(provider.generate_added_value(&BTreeSet::new()).unwrap(), "5");
//! ```

pub mod pattern;
pub mod provider;

#[cfg(all(test, feature = "property-tests"))]
mod proptests;

pub use pattern::{Pattern, PatternComponent, PatternValues, DEFAULT_HASH_LENGTH};
pub use provider::{PatternValueProvider, ValueProvider, DEFAULT_HASH_RETRY_BUDGET};
