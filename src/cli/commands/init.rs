//! init command - Set up a project directory

use crate::cli::Context;
use crate::core::config::{Config, ProjectConfig};
use crate::ui::output;
use anyhow::{bail, Context as _, Result};
use std::path::Path;

/// Write the project config for `url` into `dir`.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `url` - Server URL of the project
/// * `dir` - Project directory, default the working directory
/// * `user` - User name to record
pub fn init(ctx: &Context, url: &str, dir: Option<&Path>, user: Option<&str>) -> Result<()> {
    let dir = dir.map(|d| ctx.resolve(d)).unwrap_or_else(|| ctx.cwd.clone());

    let config_path = Config::project_config_path(&dir);
    if config_path.exists() {
        bail!(
            "{} is already a bam project ({} exists)",
            dir.display(),
            config_path.display()
        );
    }

    let config = ProjectConfig {
        url: Some(url.to_string()),
        user: user.map(str::to_string),
        config_version: Some(ProjectConfig::VERSION),
        pack: None,
    };
    let path = Config::write_project(&dir, &config)
        .with_context(|| format!("Failed to initialize {}", dir.display()))?;

    output::success(
        format_args!("Initialized bam project in {}", dir.display()),
        ctx.verbosity,
    );
    output::debug(format_args!("wrote {}", path.display()), ctx.verbosity);
    Ok(())
}
