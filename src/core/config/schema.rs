//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$BAM_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/bam/config.toml`
//! 3. `~/.bam/config.toml` (canonical write location)
//!
//! # Project Config
//!
//! Located at `.bam/config.toml` in the project directory.
//!
//! # Validation
//!
//! Values are validated after parsing (e.g., the pack subdirectory must be
//! a single plain path component).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::pack::PackMode;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// verbose = false
/// trace_log = "/tmp/bam_trace.log"
///
/// [pack]
/// subdir = "data"
/// mode = "archive"
/// manifests = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Print debug output by default
    pub verbose: Option<bool>,

    /// File receiving the traversal trace of every walk
    pub trace_log: Option<PathBuf>,

    /// Pack defaults
    pub pack: Option<PackDefaults>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(trace_log) = &self.trace_log {
            if trace_log.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "trace_log cannot be empty".to_string(),
                ));
            }
        }
        if let Some(pack) = &self.pack {
            pack.validate()?;
        }
        Ok(())
    }
}

/// Project configuration, written by `bam init`.
///
/// # Example
///
/// ```toml
/// url = "http://localhost:5000/shots"
/// user = "anna"
/// config_version = 1
///
/// [pack]
/// manifests = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Server the project checks out from
    pub url: Option<String>,

    /// User name sent with commits
    pub user: Option<String>,

    /// Schema version of this file
    pub config_version: Option<u32>,

    /// Pack overrides for this project
    pub pack: Option<PackDefaults>,
}

impl ProjectConfig {
    /// Current schema version.
    pub const VERSION: u32 = 1;

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.url {
            if url.trim().is_empty() {
                return Err(ConfigError::InvalidValue("url cannot be empty".to_string()));
            }
        }

        if let Some(version) = self.config_version {
            if version > Self::VERSION {
                return Err(ConfigError::InvalidValue(format!(
                    "config_version {} is newer than supported ({})",
                    version,
                    Self::VERSION
                )));
            }
        }

        if let Some(pack) = &self.pack {
            pack.validate()?;
        }
        Ok(())
    }
}

/// Defaults for `bam pack`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PackDefaults {
    /// Directory holding everything but the root (default: "data")
    pub subdir: Option<String>,

    /// Output shape: "directory" or "archive"
    pub mode: Option<PackMode>,

    /// Write the remap manifests
    pub manifests: Option<bool>,
}

impl PackDefaults {
    /// Validate the pack settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(subdir) = &self.subdir {
            validate_subdir(subdir)?;
        }
        Ok(())
    }
}

/// Check that `subdir` is a single plain directory name.
pub fn validate_subdir(subdir: &str) -> Result<(), ConfigError> {
    if subdir.is_empty() {
        return Err(ConfigError::InvalidValue(
            "pack subdir cannot be empty".to_string(),
        ));
    }
    if subdir.contains(['/', '\\']) || subdir == "." || subdir == ".." {
        return Err(ConfigError::InvalidValue(format!(
            "invalid pack subdir '{}', must be a single directory name",
            subdir
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_config_parses() {
        let toml = r#"
            verbose = true
            trace_log = "/tmp/trace.log"

            [pack]
            subdir = "assets"
            mode = "archive"
            manifests = true
        "#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.verbose, Some(true));
        assert_eq!(config.trace_log, Some(PathBuf::from("/tmp/trace.log")));
        let pack = config.pack.as_ref().unwrap();
        assert_eq!(pack.subdir.as_deref(), Some("assets"));
        assert_eq!(pack.mode, Some(PackMode::Archive));
        assert_eq!(pack.manifests, Some(true));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn project_config_parses() {
        let toml = r#"
            url = "http://localhost:5000/shots"
            user = "anna"
            config_version = 1
        "#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.url.as_deref(), Some("http://localhost:5000/shots"));
        assert_eq!(config.user.as_deref(), Some("anna"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_mode_rejected() {
        let toml = r#"
            [pack]
            mode = "tarball"
        "#;
        assert!(toml::from_str::<GlobalConfig>(toml).is_err());
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(toml::from_str::<ProjectConfig>("branch = \"main\"").is_err());
    }

    #[test]
    fn subdir_validation() {
        assert!(validate_subdir("data").is_ok());
        assert!(validate_subdir("").is_err());
        assert!(validate_subdir("..").is_err());
        assert!(validate_subdir("a/b").is_err());
    }

    #[test]
    fn future_version_rejected() {
        let config = ProjectConfig {
            config_version: Some(ProjectConfig::VERSION + 1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_url_rejected() {
        let config = ProjectConfig {
            url: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
