//! Value patterns mixing literal text with generated placeholders.
//!
//! A pattern such as `950{digit:3}` or `room-{hash:8}` is parsed into a list
//! of [`PatternComponent`]s. Patterns without a hash component can be
//! enumerated exhaustively in a deterministic order; patterns with a hash
//! component produce random values.

use std::fmt;
use std::str::FromStr;

use rand::distr::Alphanumeric;
use rand::Rng;

use crate::error::{Error, Result};

/// Length of a `{hash}` component without an explicit length.
pub const DEFAULT_HASH_LENGTH: usize = 6;

/// Maximum width of a `{digit:N}` component.
pub const MAX_DIGIT_WIDTH: usize = 10;

/// One parsed part of a [`Pattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternComponent {
    /// Text copied verbatim.
    Literal(String),
    /// A decimal number in `low..=high`, zero-padded to `width`.
    ///
    /// `{digit:N}` parses to `low = 1`, `high = 10^N - 1`, `width = N`.
    Number {
        /// Smallest generated number.
        low: u64,
        /// Largest generated number.
        high: u64,
        /// Zero-padding width of generated numbers.
        width: usize,
        /// Longest accepted textual length of a requested number.
        max_width: usize,
    },
    /// A random token whose first character is a letter.
    Hash {
        /// Token length.
        length: usize,
    },
}

impl PatternComponent {
    fn parse_placeholder(pattern: &str, body: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        if let Some(width) = body.strip_prefix("digit:") {
            let width: usize = parse_digits(width)
                .ok_or_else(|| invalid(format!("component '{{{body}}}' is in wrong format")))?;
            if !(1..=MAX_DIGIT_WIDTH).contains(&width) {
                return Err(invalid(format!(
                    "length of digit component should be in range from 1 to {MAX_DIGIT_WIDTH}"
                )));
            }
            let exponent = u32::try_from(width).map_err(|_| invalid("digit width overflow".into()))?;
            return Ok(Self::Number {
                low: 1,
                high: 10_u64.pow(exponent) - 1,
                width,
                max_width: width,
            });
        }

        if let Some(range) = body.strip_prefix("number:") {
            let (low_text, high_text) = range
                .split_once(':')
                .ok_or_else(|| invalid(format!("component '{{{body}}}' is in wrong format")))?;
            let (Some(low), Some(high)) = (parse_digits(low_text), parse_digits(high_text)) else {
                return Err(invalid(format!("component '{{{body}}}' is in wrong format")));
            };
            if low > high {
                return Err(invalid(format!(
                    "min value {low} cannot be greater than max value {high}"
                )));
            }
            return Ok(Self::Number {
                low,
                high,
                width: low_text.len(),
                max_width: high_text.len().max(low_text.len()),
            });
        }

        if body == "hash" {
            return Ok(Self::Hash {
                length: DEFAULT_HASH_LENGTH,
            });
        }
        if let Some(length) = body.strip_prefix("hash:") {
            let length: usize = parse_digits(length)
                .ok_or_else(|| invalid(format!("component '{{{body}}}' is in wrong format")))?;
            if length == 0 {
                return Err(invalid("hash length must be greater than zero".into()));
            }
            return Ok(Self::Hash { length });
        }

        Err(invalid(format!("component '{{{body}}}' is in wrong format")))
    }

    /// Returns the length of the prefix of `value` this component accepts,
    /// longest first.
    fn accepted_lengths(&self, value: &str) -> Vec<usize> {
        let bytes = value.as_bytes();
        match self {
            Self::Literal(text) => {
                if value.starts_with(text.as_str()) {
                    vec![text.len()]
                } else {
                    Vec::new()
                }
            }
            Self::Number {
                low,
                high,
                width,
                max_width,
            } => (*width..=*max_width)
                .rev()
                .filter(|&len| len <= bytes.len() && bytes[..len].iter().all(u8::is_ascii_digit))
                .filter(|&len| {
                    value[..len]
                        .parse::<u64>()
                        .is_ok_and(|number| (*low..=*high).contains(&number))
                })
                .collect(),
            Self::Hash { length } => {
                let valid = bytes.len() >= *length
                    && bytes[0].is_ascii_alphabetic()
                    && bytes[1..*length]
                        .iter()
                        .all(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-');
                if valid {
                    vec![*length]
                } else {
                    Vec::new()
                }
            }
        }
    }
}

fn parse_digits<T: FromStr>(text: &str) -> Option<T> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// A parsed value pattern.
///
/// # Examples
///
/// ```
/// use confbook::value::Pattern;
///
/// let pattern = Pattern::parse("950{digit:3}").unwrap();
/// let mut values = pattern.values();
/// assert_eq!(values.next().as_deref(), Some("950001"));
/// assert_eq!(values.next().as_deref(), Some("950002"));
///
/// assert!(pattern.matches("950123"));
/// assert!(!pattern.matches("95012"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    components: Vec<PatternComponent>,
}

impl Pattern {
    /// Parses a pattern.
    ///
    /// Recognized placeholders are `{digit:N}` with N in 1..=10,
    /// `{number:LOW:HIGH}` and `{hash}` / `{hash:N}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for an empty pattern, an
    /// unterminated placeholder or a placeholder in wrong format.
    pub fn parse(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(Error::InvalidPattern {
                pattern: source.to_string(),
                reason: "pattern cannot be empty".into(),
            });
        }

        let mut components = Vec::new();
        let mut rest = source;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
                return Err(Error::InvalidPattern {
                    pattern: source.to_string(),
                    reason: "unterminated component".into(),
                });
            };
            if open > 0 {
                components.push(PatternComponent::Literal(rest[..open].to_string()));
            }
            components.push(PatternComponent::parse_placeholder(
                source,
                &rest[open + 1..close],
            )?);
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            components.push(PatternComponent::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            components,
        })
    }

    /// Returns the textual form the pattern was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns the parsed components.
    #[must_use]
    pub fn components(&self) -> &[PatternComponent] {
        &self.components
    }

    /// Checks whether the pattern contains a hash component.
    #[must_use]
    pub fn has_hash(&self) -> bool {
        self.components
            .iter()
            .any(|c| matches!(c, PatternComponent::Hash { .. }))
    }

    /// Returns the number of values [`Pattern::values`] yields, saturating.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.components.iter().fold(1_u64, |acc, component| match component {
            PatternComponent::Number { low, high, .. } => {
                acc.saturating_mul((high - low).saturating_add(1))
            }
            _ => acc,
        })
    }

    /// Enumerates the values of the pattern in ascending order.
    ///
    /// The last numeric component varies fastest. A pattern made only of
    /// literal text yields its text once. Hash components are regenerated
    /// for every value.
    #[must_use]
    pub fn values(&self) -> PatternValues<'_> {
        PatternValues {
            pattern: self,
            counters: None,
            exhausted: false,
        }
    }

    /// Produces a random value of the pattern.
    ///
    /// Numeric components take a uniformly chosen number from their range.
    pub fn random_value<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let mut value = String::new();
        for component in &self.components {
            match component {
                PatternComponent::Literal(text) => value.push_str(text),
                PatternComponent::Number {
                    low, high, width, ..
                } => {
                    let number = rng.random_range(*low..=*high);
                    value.push_str(&format!("{number:0width$}"));
                }
                PatternComponent::Hash { length } => {
                    value.push(char::from(rng.random_range(b'a'..=b'z')));
                    for _ in 1..*length {
                        value.push(char::from(rng.sample(Alphanumeric)).to_ascii_lowercase());
                    }
                }
            }
        }
        value
    }

    /// Checks whether `value` has the shape of this pattern.
    ///
    /// Numeric components additionally check the range of the number.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        matches_from(&self.components, value)
    }

    fn render(&self, counters: &[u64]) -> String {
        let mut value = String::new();
        let mut numbers = counters.iter();
        for component in &self.components {
            match component {
                PatternComponent::Literal(text) => value.push_str(text),
                PatternComponent::Number { width, .. } => {
                    if let Some(number) = numbers.next() {
                        value.push_str(&format!("{number:0width$}"));
                    }
                }
                PatternComponent::Hash { length } => {
                    let mut rng = rand::rng();
                    value.push(char::from(rng.random_range(b'a'..=b'z')));
                    for _ in 1..*length {
                        value.push(char::from(rng.sample(Alphanumeric)).to_ascii_lowercase());
                    }
                }
            }
        }
        value
    }

    fn bounds(&self) -> Vec<(u64, u64)> {
        self.components
            .iter()
            .filter_map(|component| match component {
                PatternComponent::Number { low, high, .. } => Some((*low, *high)),
                _ => None,
            })
            .collect()
    }
}

fn matches_from(components: &[PatternComponent], value: &str) -> bool {
    let Some((first, rest)) = components.split_first() else {
        return value.is_empty();
    };
    first
        .accepted_lengths(value)
        .into_iter()
        .any(|len| matches_from(rest, &value[len..]))
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Iterator over the values of a [`Pattern`], see [`Pattern::values`].
#[derive(Debug, Clone)]
pub struct PatternValues<'a> {
    pattern: &'a Pattern,
    counters: Option<Vec<u64>>,
    exhausted: bool,
}

impl Iterator for PatternValues<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }
        let bounds = self.pattern.bounds();
        match self.counters.as_mut() {
            None => {
                self.counters = Some(bounds.iter().map(|(low, _)| *low).collect());
            }
            Some(counters) => {
                // odometer: the last component rolls over into the previous one
                let mut index = counters.len();
                loop {
                    if index == 0 {
                        self.exhausted = true;
                        return None;
                    }
                    index -= 1;
                    let (low, high) = bounds[index];
                    if counters[index] < high {
                        counters[index] += 1;
                        break;
                    }
                    counters[index] = low;
                }
            }
        }
        self.counters
            .as_deref()
            .map(|counters| self.pattern.render(counters))
    }
}
