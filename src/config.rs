//! Layered application configuration.
//!
//! Sources, lowest to highest precedence:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. The platform config file, e.g. `~/.config/treehardlink/config.toml`
//! 3. A file given with `--config`
//! 4. `TREEHARDLINK_*` environment variables (`TREEHARDLINK_STAT_THREADS=8`)
//! 5. Command-line flags ([`Config::apply_cli`])
//!
//! ```toml
//! min_worthwhile_size_bytes = 1048576
//! database_path = "/var/tmp/treehardlink.sqlite3"
//! group_by = "size"
//! stat_threads = 8
//! relative_path_mode = "strip-prefix"
//! skip_hidden = true
//! output = "json"
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::duplicates::{AnalyzerConfig, GroupingStrategy, DEFAULT_MIN_WORTHWHILE_SIZE};
use crate::output::OutputFormat;
use crate::pipeline::PipelineConfig;
use crate::scanner::{RelativePathMode, WalkerConfig};

/// Prefix of the environment variables read into the configuration.
pub const ENV_PREFIX: &str = "TREEHARDLINK_";

/// Default inventory database, relative to the working directory.
pub const DEFAULT_DATABASE_PATH: &str = "treehardlink.sqlite3";

/// Errors while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A file passed with `--config` does not exist.
    #[error("Config file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// A source could not be read or has a bad value.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// The working directory could not be determined.
    #[error("Cannot resolve config path: {0}")]
    Io(#[from] std::io::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Only files strictly larger than this are candidates.
    pub min_worthwhile_size_bytes: u64,
    /// Inventory database file.
    pub database_path: PathBuf,
    /// Grouping key for candidates.
    pub group_by: GroupingStrategy,
    /// Worker threads statting files.
    pub stat_threads: usize,
    /// How relative paths are derived from each root.
    pub relative_path_mode: RelativePathMode,
    /// Follow symbolic links during the walk.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Report format.
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_worthwhile_size_bytes: DEFAULT_MIN_WORTHWHILE_SIZE,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            group_by: GroupingStrategy::default(),
            stat_threads: 4,
            relative_path_mode: RelativePathMode::default(),
            follow_symlinks: false,
            skip_hidden: false,
            output: OutputFormat::default(),
        }
    }
}

impl Config {
    /// Platform config file location, if the platform has one.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "treehardlink", "treehardlink")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Defaults, then each TOML file that exists, then the environment.
    #[must_use]
    pub fn layered(files: &[&Path]) -> Figment {
        let figment = files
            .iter()
            .fold(Figment::from(Serialized::defaults(Config::default())), |f, path| {
                f.merge(Toml::file(path))
            });
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load defaults, the platform file, `extra` and the environment.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingFile`] if `extra` does not exist
    /// - [`ConfigError::Invalid`] if a source has a malformed value
    pub fn load(extra: Option<&Path>) -> Result<Self, ConfigError> {
        let platform = Self::default_config_path();
        let extra = match extra {
            Some(path) if !path.exists() => return Err(ConfigError::MissingFile(path.to_path_buf())),
            // Toml::file searches parent directories for relative paths.
            Some(path) => Some(std::path::absolute(path)?),
            None => None,
        };

        let files: Vec<&Path> = platform.iter().chain(extra.iter()).map(PathBuf::as_path).collect();
        let config: Config = Self::layered(&files).extract().map_err(Box::new)?;
        log::debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Let flags given on the command line win.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(ref database) = cli.database {
            self.database_path.clone_from(database);
        }
        if let Some(min_size) = cli.min_size {
            self.min_worthwhile_size_bytes = min_size;
        }
        if let Some(group_by) = cli.group_by {
            self.group_by = group_by;
        }
        if let Some(output) = cli.output {
            self.output = output;
        }
        if let Some(threads) = cli.stat_threads {
            self.stat_threads = threads;
        }
        if let Some(mode) = cli.relative_paths {
            self.relative_path_mode = mode;
        }
        self.follow_symlinks |= cli.follow_symlinks;
        self.skip_hidden |= cli.skip_hidden;
    }

    /// Settings for the duplicate queries.
    #[must_use]
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig::default()
            .with_min_worthwhile_size(self.min_worthwhile_size_bytes)
            .with_strategy(self.group_by)
    }

    /// Settings for the inventory build.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_stat_threads(self.stat_threads)
            .with_relative_path_mode(self.relative_path_mode)
            .with_walker_config(WalkerConfig::new(self.follow_symlinks, self.skip_hidden))
    }
}
