//! Error types for the confbook library.
//!
//! This module provides the error hierarchy shared by the scheduler, the
//! value providers, the execution planner, the authorization layer and the
//! persistence adapter, using `thiserror` for ergonomic error handling.

use std::path::PathBuf;

use thiserror::Error;

use crate::scheduler::SchedulerError;

/// Result type alias for operations that may fail with a confbook error.
///
/// # Examples
///
/// ```
/// use confbook::{Error, Result};
///
/// fn example_operation() -> Result<u32> {
///     Ok(42)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the confbook library.
#[derive(Debug, Error)]
pub enum Error {
    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Configuration(#[from] serde_yaml::Error),

    /// A stored payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An invalid filesystem path was provided.
    #[error("invalid path {}: {reason}", path.display())]
    InvalidPath {
        /// The invalid path.
        path: PathBuf,
        /// The reason the path is invalid.
        reason: String,
    },

    /// A validation error occurred.
    #[error("validation error for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// A description of the validation failure.
        message: String,
    },

    /// The requested object was not found.
    #[error("not found: {resource}")]
    NotFound {
        /// The object that was not found.
        resource: String,
    },

    /// An interval whose end precedes its start.
    #[error("invalid interval {start}/{end}: end precedes start")]
    InvalidInterval {
        /// Start of the rejected interval.
        start: chrono::DateTime<chrono::Utc>,
        /// End of the rejected interval.
        end: chrono::DateTime<chrono::Utc>,
    },

    /// A value pattern could not be parsed.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Why the pattern was rejected.
        reason: String,
    },

    /// A requested value matches none of the configured patterns.
    #[error("value '{value}' is invalid: {reason}")]
    InvalidValue {
        /// The requested value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A requested value is already in use.
    #[error("value '{value}' is already allocated")]
    ValueAlreadyAllocated {
        /// The requested value.
        value: String,
    },

    /// Every pattern of a value provider has been exhausted.
    #[error("no value available in patterns [{}]", patterns.join(", "))]
    NoAvailableValue {
        /// The patterns that were searched.
        patterns: Vec<String>,
    },

    /// Allocation failed; the report tree explains why.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// A savepoint was used out of order or after it was discarded.
    #[error("savepoint misuse: {details}")]
    SavepointMisuse {
        /// Details about the misuse.
        details: String,
    },

    /// The dependency graph of an execution plan contains a cycle.
    #[error("execution plan contains a cycle: {}", cycle.join(" -> "))]
    CycleDetected {
        /// Descriptions of the actions forming the cycle.
        cycle: Vec<String>,
    },

    /// An execution plan was driven incorrectly.
    #[error("execution plan error: {details}")]
    ExecutionPlan {
        /// Details about the failure.
        details: String,
    },

    /// An executable was asked to perform an illegal state transition.
    #[error("executable {executable} cannot {event} while {state}")]
    IllegalTransition {
        /// The executable identifier.
        executable: u64,
        /// The current state.
        state: String,
        /// The rejected event.
        event: String,
    },

    /// An ACL entry is still required by another entry.
    #[error("ACL entry {id} is referenced by {parents} other entr(y/ies)")]
    AclEntryReferenced {
        /// The entry that could not be deleted.
        id: u64,
        /// Number of parent entries still referencing it.
        parents: usize,
    },

    /// A database lock timeout occurred.
    #[error("database lock timeout after {seconds}s")]
    LockTimeout {
        /// The number of seconds waited before timing out.
        seconds: u64,
    },

    /// An unsupported schema version was encountered.
    #[error("unsupported schema version: expected {expected}, found {found}")]
    UnsupportedSchemaVersion {
        /// The expected schema version.
        expected: u32,
        /// The schema version found in the database.
        found: u32,
    },
}

impl Error {
    /// Check if error is a scheduling failure that the caller may recover
    /// from by trying another alternative.
    ///
    /// # Examples
    ///
    /// ```
    /// use confbook::Error;
    ///
    /// let err = Error::NotFound { resource: "resource 1".into() };
    /// assert!(!err.is_scheduling_failure());
    /// ```
    #[must_use]
    pub fn is_scheduling_failure(&self) -> bool {
        matches!(self, Self::Scheduler(_))
    }

    /// Check if error was raised by a value provider.
    ///
    /// # Examples
    ///
    /// ```
    /// use confbook::Error;
    ///
    /// let err = Error::ValueAlreadyAllocated { value: "950001".into() };
    /// assert!(err.is_value_error());
    /// ```
    #[must_use]
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidValue { .. } | Self::ValueAlreadyAllocated { .. } | Self::NoAvailableValue { .. }
        )
    }

    /// Check if error indicates a missing object.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the scheduler failure carried by this error, if any.
    #[must_use]
    pub fn as_scheduler_error(&self) -> Option<&SchedulerError> {
        match self {
            Self::Scheduler(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = Error::Validation {
            field: "scheduler.hash_retry_budget".to_string(),
            message: "must be greater than 0".to_string(),
        };
        let display = format!("{err}");
        assert!(display.contains("validation error"));
        assert!(display.contains("hash_retry_budget"));
        assert!(display.contains("greater than 0"));
    }

    #[test]
    fn test_invalid_pattern_error() {
        let err = Error::InvalidPattern {
            pattern: "{digit:11}".to_string(),
            reason: "digit count must be between 1 and 10".to_string(),
        };
        let display = format!("{err}");
        assert!(display.contains("invalid pattern"));
        assert!(display.contains("{digit:11}"));
    }

    #[test]
    fn test_no_available_value_lists_patterns() {
        let err = Error::NoAvailableValue {
            patterns: vec!["950{digit:3}".to_string(), "{hash}".to_string()],
        };
        let display = format!("{err}");
        assert!(display.contains("950{digit:3}, {hash}"));
        assert!(err.is_value_error());
    }

    #[test]
    fn test_cycle_detected_error() {
        let err = Error::CycleDetected {
            cycle: vec!["start 1".into(), "start 2".into(), "start 1".into()],
        };
        let display = format!("{err}");
        assert!(display.contains("cycle"));
        assert!(display.contains("start 1 -> start 2 -> start 1"));
    }

    #[test]
    fn test_savepoint_misuse_error() {
        let err = Error::SavepointMisuse {
            details: "savepoint 3 is not open".into(),
        };
        assert!(format!("{err}").contains("savepoint 3 is not open"));
        assert!(!err.is_scheduling_failure());
    }

    #[test]
    fn test_acl_entry_referenced_error() {
        let err = Error::AclEntryReferenced { id: 7, parents: 2 };
        let display = format!("{err}");
        assert!(display.contains("ACL entry 7"));
        assert!(display.contains('2'));
    }

    #[test]
    fn test_not_found_error() {
        let err = Error::NotFound {
            resource: "reservation 12".to_string(),
        };
        assert!(err.is_not_found());
        assert!(format!("{err}").contains("reservation 12"));
    }

    #[test]
    fn test_unsupported_schema_version_error() {
        let err = Error::UnsupportedSchemaVersion {
            expected: 1,
            found: 2,
        };
        let display = format!("{err}");
        assert!(display.contains("expected 1"));
        assert!(display.contains("found 2"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(format!("{err}").contains("I/O error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<u32> {
            Err(Error::ValueAlreadyAllocated {
                value: "x".to_string(),
            })
        }

        assert!(returns_result().is_err());
    }
}
