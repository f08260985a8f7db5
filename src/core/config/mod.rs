//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! bam has two configuration scopes:
//! - **Global**: User-level settings
//! - **Project**: Settings of one checked-out project, written by `bam init`
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$BAM_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/bam/config.toml`
//! 3. `~/.bam/config.toml`
//!
//! # Project Config Location
//!
//! `.bam/config.toml` in the nearest ancestor of the working directory that
//! has one. The home directory is never a project.
//!
//! # Example
//!
//! ```no_run
//! use scenepack::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/project/shots"))).unwrap();
//! let config = result.config;
//!
//! println!("Pack subdir: {}", config.pack_subdir());
//! println!("Pack mode: {}", config.pack_mode());
//! ```

pub mod schema;

pub use schema::{validate_subdir, GlobalConfig, PackDefaults, ProjectConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::pack::{PackMode, DEFAULT_SUBDIR};

/// Directory holding the project config.
pub const PROJECT_DIR: &str = ".bam";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence rules: project config overrides global config.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Project configuration (if inside a project)
    pub project: Option<ProjectConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Directory containing `.bam/` (if found)
    project_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `start` is provided, the project config is searched from there
    /// upwards.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(start: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = Self::load_global()?;

        let (project, project_dir) = match start.and_then(find_project_dir) {
            Some(dir) => {
                let project = Self::load_project(&dir, &mut warnings)?;
                (Some(project), Some(dir))
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref p) = project {
            p.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                project,
                global_path,
                project_dir,
            },
            warnings,
        })
    }

    /// Load global configuration from standard locations.
    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        if let Ok(path) = std::env::var("BAM_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("bam/config.toml");
            if path.exists() {
                let config = read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".bam/config.toml");
            if path.exists() {
                let config = read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    /// Load the project config of `project_dir`.
    fn load_project(
        project_dir: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<ProjectConfig, ConfigError> {
        let path = Self::project_config_path(project_dir);
        let config: ProjectConfig = read_toml(&path)?;
        if config.config_version.is_none() {
            warnings.push(ConfigWarning {
                message: format!(
                    "project config has no config_version, assuming {}",
                    ProjectConfig::VERSION
                ),
                path,
            });
        }
        Ok(config)
    }

    /// Get the path of the project config in `project_dir`.
    pub fn project_config_path(project_dir: &Path) -> PathBuf {
        project_dir.join(PROJECT_DIR).join("config.toml")
    }

    /// Write project config atomically.
    ///
    /// Creates `.bam/` if needed.
    pub fn write_project(project_dir: &Path, config: &ProjectConfig) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = Self::project_config_path(project_dir);
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write a config file atomically.
    fn write_config_atomic<T: serde::Serialize>(
        path: &Path,
        config: &T,
    ) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    fn pack_setting<T>(&self, get: impl Fn(&PackDefaults) -> Option<T>) -> Option<T> {
        self.project
            .as_ref()
            .and_then(|p| p.pack.as_ref())
            .and_then(&get)
            .or_else(|| self.global.pack.as_ref().and_then(&get))
    }

    /// Get the pack subdirectory.
    ///
    /// Defaults to "data" if not configured.
    pub fn pack_subdir(&self) -> String {
        self.pack_setting(|p| p.subdir.clone())
            .unwrap_or_else(|| DEFAULT_SUBDIR.to_string())
    }

    /// Get the pack output shape.
    ///
    /// Defaults to [`PackMode::Directory`] if not configured.
    pub fn pack_mode(&self) -> PackMode {
        self.pack_setting(|p| p.mode).unwrap_or_default()
    }

    /// Check if pack should write remap manifests.
    ///
    /// Defaults to `false` if not configured.
    pub fn pack_manifests(&self) -> bool {
        self.pack_setting(|p| p.manifests).unwrap_or(false)
    }

    /// Check if debug output is on by default.
    ///
    /// Defaults to `false` if not configured.
    pub fn verbose(&self) -> bool {
        self.global.verbose.unwrap_or(false)
    }

    /// Get the trace log file, if configured.
    pub fn trace_log(&self) -> Option<&Path> {
        self.global.trace_log.as_deref()
    }

    /// Get the project's server URL.
    pub fn url(&self) -> Option<&str> {
        self.project.as_ref().and_then(|p| p.url.as_deref())
    }

    /// Get the user name.
    pub fn user(&self) -> Option<&str> {
        self.project.as_ref().and_then(|p| p.user.as_deref())
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the directory of the loaded project.
    pub fn project_dir(&self) -> Option<&Path> {
        self.project_dir.as_deref()
    }
}

/// Find the nearest ancestor of `start` (inclusive) holding a project config.
pub fn find_project_dir(start: &Path) -> Option<PathBuf> {
    let home = dirs::home_dir();
    start
        .ancestors()
        .filter(|dir| home.as_deref() != Some(*dir))
        .find(|dir| Config::project_config_path(dir).is_file())
        .map(Path::to_path_buf)
}

/// Read and parse a TOML config file.
fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
