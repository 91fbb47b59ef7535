//! Configuration system for confbook.
//!
//! This module provides hierarchical configuration with support for:
//! - YAML configuration files (user config and project files)
//! - Environment variable overrides
//! - Programmatic configuration via builder pattern
//! - Validation of every limit
//!
//! # Configuration Precedence
//!
//! Configuration is merged from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Programmatic overrides (via `ConfigBuilder::with_config`)
//! 2. Environment variables (`CONFBOOK_*`)
//! 3. Private project config (`confbook.local.yaml`)
//! 4. Project config (`confbook.yaml`)
//! 5. User config (`~/.confbook/config.yaml`)
//! 6. Built-in defaults
//!
//! # Examples
//!
//! Loading from a specific directory:
//!
//! ```no_run
//! use confbook::config::ConfigBuilder;
//! use std::path::Path;
//!
//! let config = ConfigBuilder::new()
//!     .with_working_dir(Path::new("/path/to/project"))
//!     .build()
//!     .unwrap();
//! ```
//!
//! Resolving scheduler limits:
//!
//! ```
//! use confbook::config::{ConfigBuilder, SchedulerSettings};
//!
//! let config = ConfigBuilder::new().skip_files().skip_env().build().unwrap();
//! let settings = SchedulerSettings::from_config(&config);
//! assert_eq!(settings.maximum_future.num_days(), 120);
//! ```

pub mod builder;
pub mod environment;
pub mod loader;
pub mod merger;
pub mod schema;
pub mod settings;
pub mod validator;

#[cfg(all(test, feature = "property-tests"))]
mod proptests;

pub use builder::ConfigBuilder;
pub use environment::EnvironmentConfig;
pub use loader::{ConfigLoader, ConfigSource};
pub use merger::ConfigMerger;
pub use schema::{Config, DatabaseSection, SchedulerConfig};
pub use settings::SchedulerSettings;
pub use validator::ConfigValidator;
