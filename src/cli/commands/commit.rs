//! commit command - Stage the changes of a session as a commit archive

use crate::cli::Context;
use crate::session::stage_commit;
use crate::ui::output;
use anyhow::{bail, Context as _, Result};
use std::path::Path;

/// Stage the changes of the session at `dir`.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `dir` - Session directory, default the working directory
/// * `message` - Commit message
pub fn commit(ctx: &Context, dir: Option<&Path>, message: &str) -> Result<()> {
    if message.trim().is_empty() {
        bail!("commit message cannot be empty");
    }
    let dir = dir.map(|d| ctx.resolve(d)).unwrap_or_else(|| ctx.cwd.clone());

    let mut trace = ctx.trace()?;
    let report = stage_commit(&dir, message, &mut trace)
        .with_context(|| format!("Failed to commit {}", dir.display()))?;
    trace.finish().context("Failed to write trace file")?;

    for file in &report.unmapped {
        output::warn(
            format_args!("{} committed with packed paths", file),
            ctx.verbosity,
        );
    }
    output::success(
        format_args!(
            "Staged {} file(s) in {}",
            report.info.files.len(),
            output::format_path(&report.archive, &ctx.cwd)
        ),
        ctx.verbosity,
    );
    Ok(())
}
