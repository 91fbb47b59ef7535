//! Builder tying configuration loading, merging and validation together.

use std::env;
use std::path::{Path, PathBuf};

use crate::config::environment::EnvironmentConfig;
use crate::config::loader::ConfigLoader;
use crate::config::merger::ConfigMerger;
use crate::config::schema::{Config, DatabaseSection, SchedulerConfig};
use crate::config::settings::{SchedulerSettings, DEFAULT_MAXIMUM_FUTURE_DAYS};
use crate::database::DatabaseConfig;
use crate::error::Result;

/// Default busy timeout written into built configurations.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Builds the effective configuration.
///
/// Sources are applied lowest precedence first: built-in defaults, user
/// config, project configs, environment, then the programmatic override.
///
/// # Examples
///
/// ```
/// use confbook::config::{Config, ConfigBuilder};
///
/// let config = ConfigBuilder::new()
///     .skip_files()
///     .skip_env()
///     .with_config(Config {
///         administrators: Some(vec!["root".to_string()]),
///         ..Default::default()
///     })
///     .build()
///     .unwrap();
///
/// assert!(config.is_administrator("root"));
/// assert_eq!(config.scheduler.unwrap().maximum_future_days, Some(120));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    working_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    overrides: Option<Config>,
    skip_files: bool,
    skip_env: bool,
}

impl ConfigBuilder {
    /// Creates a builder that reads files from the current directory and
    /// applies environment overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Does not read any configuration file.
    #[must_use]
    pub fn skip_files(mut self) -> Self {
        self.skip_files = true;
        self
    }

    /// Does not apply `CONFBOOK_*` environment overrides.
    #[must_use]
    pub fn skip_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Applies `config` on top of every other source.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.overrides = Some(config);
        self
    }

    /// Starts project config discovery from `dir`.
    #[must_use]
    pub fn with_working_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }

    /// Loads the user config from `dir` instead of `~/.confbook`.
    #[must_use]
    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.data_dir = Some(dir.to_path_buf());
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file cannot be read or parsed,
    /// an environment variable is malformed, or the result fails
    /// validation.
    pub fn build(self) -> Result<Config> {
        let mut config = Self::defaults();

        if !self.skip_files {
            let working_dir = match self.working_dir {
                Some(dir) => dir,
                None => env::current_dir()?,
            };
            let sources = ConfigLoader::load_all(&working_dir, self.data_dir.as_deref())?;
            ConfigMerger::merge_into(&mut config, &ConfigMerger::merge(sources));
        }

        if !self.skip_env {
            EnvironmentConfig::apply_overrides(&mut config)?;
        }

        if let Some(ref overrides) = self.overrides {
            ConfigMerger::merge_into(&mut config, overrides);
        }

        crate::config::ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Built-in defaults, expressed as a configuration layer.
    fn defaults() -> Config {
        let settings = SchedulerSettings::default();
        let minutes = |d: chrono::Duration| u32::try_from(d.num_minutes()).ok();
        Config {
            scheduler: Some(SchedulerConfig {
                maximum_future_days: Some(DEFAULT_MAXIMUM_FUTURE_DAYS),
                reservation_maximum_duration_minutes: minutes(settings.reservation_maximum_duration),
                room_maximum_duration_minutes: minutes(settings.room_maximum_duration),
                value_maximum_duration_minutes: minutes(settings.value_maximum_duration),
                hash_retry_budget: Some(settings.hash_retry_budget),
            }),
            database: Some(DatabaseSection {
                path: None,
                busy_timeout_ms: Some(DEFAULT_BUSY_TIMEOUT_MS),
            }),
            administrators: None,
            log_mode: None,
        }
    }
}

impl Config {
    /// Resolves the database configuration, falling back to
    /// [`crate::database::resolve_database_path`] for the path.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the home directory
    /// cannot be determined.
    pub fn resolve_database_config(&self) -> Result<DatabaseConfig> {
        let configured = self.database.as_ref().and_then(|d| d.path.clone());
        let path = match configured {
            Some(path) => path,
            None => crate::database::resolve_database_path()?,
        };
        Ok(self.database_config(path))
    }
}
