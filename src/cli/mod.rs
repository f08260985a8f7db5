//! cli
//!
//! Command-line interface layer for bam.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and build the execution [`Context`]
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers translate arguments into calls on the
//! library modules ([`crate::walk`], [`crate::pack`], [`crate::session`],
//! ...) and format the results. Library errors are typed; here they are
//! wrapped with `anyhow` context for display.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::ui::output::{self, Verbosity};
use crate::walk::Trace;

/// Execution context shared by all command handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory relative paths are resolved against.
    pub cwd: PathBuf,
    pub verbosity: Verbosity,
    /// Trace file from `--trace` or the config.
    pub trace: Option<PathBuf>,
    pub config: Config,
}

impl Context {
    /// Resolve a path argument against the working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.cwd.join(path)
    }

    /// A trace for one operation, writing to the trace file if configured.
    pub fn trace(&self) -> Result<Trace> {
        match &self.trace {
            Some(path) => Trace::with_file(self.verbosity, path)
                .with_context(|| format!("Failed to open trace file {}", path.display())),
            None => Ok(Trace::new(self.verbosity)),
        }
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let cwd = match &cli.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let loaded = Config::load(Some(&cwd)).context("Failed to load configuration")?;
    let config = loaded.config;

    // CLI flags take precedence over the configured defaults.
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug || config.verbose());
    for warning in &loaded.warnings {
        output::warn(
            format_args!("{} ({})", warning.message, warning.path.display()),
            verbosity,
        );
    }
    if let Some(path) = config.global_config_loaded_from() {
        output::debug(format_args!("global config: {}", path.display()), verbosity);
    }
    if let Some(dir) = config.project_dir() {
        let user = config.user().map(|u| format!(" as {}", u)).unwrap_or_default();
        output::debug(format_args!("project: {}{}", dir.display(), user), verbosity);
    }

    let trace = cli
        .trace
        .as_ref()
        .map(|path| cwd.join(path))
        .or_else(|| config.trace_log().map(Path::to_path_buf));

    let ctx = Context {
        cwd,
        verbosity,
        trace,
        config,
    };

    commands::dispatch(cli.command, &ctx)
}
