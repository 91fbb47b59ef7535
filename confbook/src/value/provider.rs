//! Value providers generating unique values from patterns.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::resource::AliasProviderCapability;

use super::pattern::Pattern;

/// Default number of random attempts for patterns with a hash component.
pub const DEFAULT_HASH_RETRY_BUDGET: u32 = 1000;

/// Source of unique values (room names, numbers, URIs).
///
/// Implementations must be deterministic for patterns without random parts
/// so that repeated scheduling runs allocate the same values.
pub trait ValueProvider {
    /// Returns the first value not present in `used`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAvailableValue`] when every candidate is used.
    fn generate_added_value(&self, used: &BTreeSet<String>) -> Result<String>;

    /// Validates a value requested by the user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] when the value has no valid shape and
    /// [`Error::ValueAlreadyAllocated`] when it is present in `used`.
    fn generate_value(&self, used: &BTreeSet<String>, requested: &str) -> Result<String>;
}

/// A [`ValueProvider`] backed by an ordered list of [`Pattern`]s.
///
/// Patterns are tried in declaration order; the first one is exhausted
/// before the next is consulted.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use confbook::value::{PatternValueProvider, ValueProvider};
///
/// let provider = PatternValueProvider::new(&["950{digit:3}"]).unwrap();
/// let used: BTreeSet<String> = ["950001".to_string()].into_iter().collect();
///
/// assert_eq!(provider.generate_added_value(&used).unwrap(), "950002");
/// assert!(provider.generate_value(&used, "950001").is_err());
/// assert_eq!(provider.generate_value(&used, "950500").unwrap(), "950500");
/// ```
#[derive(Debug, Clone)]
pub struct PatternValueProvider {
    patterns: Vec<Pattern>,
    excluded: BTreeSet<String>,
    allow_any_requested_value: bool,
    hash_retry_budget: u32,
}

impl PatternValueProvider {
    /// Creates a provider from textual patterns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] when any pattern fails to parse and
    /// [`Error::Validation`] when no pattern is given.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        if patterns.is_empty() {
            return Err(Error::Validation {
                field: "patterns".into(),
                message: "at least one pattern is required".into(),
            });
        }
        let patterns = patterns
            .iter()
            .map(|p| Pattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns,
            excluded: BTreeSet::new(),
            allow_any_requested_value: false,
            hash_retry_budget: DEFAULT_HASH_RETRY_BUDGET,
        })
    }

    /// Creates a provider for an alias provider capability.
    ///
    /// # Errors
    ///
    /// See [`PatternValueProvider::new`].
    pub fn from_capability(capability: &AliasProviderCapability, hash_retry_budget: u32) -> Result<Self> {
        Ok(Self::new(&capability.patterns)?
            .with_allow_any_requested_value(capability.allow_any_requested_value)
            .with_hash_retry_budget(hash_retry_budget))
    }

    /// Accepts requested values that match no pattern.
    #[must_use]
    pub fn with_allow_any_requested_value(mut self, allow: bool) -> Self {
        self.allow_any_requested_value = allow;
        self
    }

    /// Sets how many random values are tried for a hash pattern.
    #[must_use]
    pub fn with_hash_retry_budget(mut self, budget: u32) -> Self {
        self.hash_retry_budget = budget;
        self
    }

    /// Values never handed out, even when unused.
    #[must_use]
    pub fn with_excluded<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(values.into_iter().map(Into::into));
        self
    }

    /// Returns the parsed patterns.
    #[must_use]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    fn is_free(&self, used: &BTreeSet<String>, value: &str) -> bool {
        !used.contains(value) && !self.excluded.contains(value)
    }

    fn pattern_names(&self) -> Vec<String> {
        self.patterns.iter().map(ToString::to_string).collect()
    }
}

impl ValueProvider for PatternValueProvider {
    fn generate_added_value(&self, used: &BTreeSet<String>) -> Result<String> {
        let mut rng = rand::rng();
        for pattern in &self.patterns {
            let found = if pattern.has_hash() {
                (0..self.hash_retry_budget)
                    .map(|_| pattern.random_value(&mut rng))
                    .find(|value| self.is_free(used, value))
            } else {
                pattern.values().find(|value| self.is_free(used, value))
            };
            if let Some(value) = found {
                log::trace!("Generated value {value} from pattern {pattern}");
                return Ok(value);
            }
            log::debug!("Pattern {pattern} is exhausted");
        }
        Err(Error::NoAvailableValue {
            patterns: self.pattern_names(),
        })
    }

    fn generate_value(&self, used: &BTreeSet<String>, requested: &str) -> Result<String> {
        if !self.allow_any_requested_value && !self.patterns.iter().any(|p| p.matches(requested)) {
            return Err(Error::InvalidValue {
                value: requested.to_string(),
                reason: format!("does not match any of [{}]", self.pattern_names().join(", ")),
            });
        }
        if self.excluded.contains(requested) {
            return Err(Error::InvalidValue {
                value: requested.to_string(),
                reason: "value is excluded".into(),
            });
        }
        if used.contains(requested) {
            return Err(Error::ValueAlreadyAllocated {
                value: requested.to_string(),
            });
        }
        Ok(requested.to_string())
    }
}
