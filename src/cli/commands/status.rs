//! status command - Show changes in a session

use crate::cli::Context;
use crate::session::Session;
use crate::ui::output;
use anyhow::{Context as _, Result};
use serde_json::json;
use std::path::Path;

/// Print modified, added and removed files of the session at `dir`.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `dir` - Session directory, default the working directory
/// * `json` - Print a JSON object instead of text
pub fn status(ctx: &Context, dir: Option<&Path>, json: bool) -> Result<()> {
    let dir = dir.map(|d| ctx.resolve(d)).unwrap_or_else(|| ctx.cwd.clone());
    let session = Session::load(&dir)?;
    let status = session
        .status()
        .with_context(|| format!("Failed to scan {}", dir.display()))?;

    if json {
        let value = json!({
            "modified": status.modified,
            "added": status.added,
            "removed": status.removed,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if status.is_clean() {
        output::print("nothing changed", ctx.verbosity);
        return Ok(());
    }
    for (label, files) in [
        ("modified", &status.modified),
        ("added", &status.added),
        ("removed", &status.removed),
    ] {
        for file in files {
            output::print(format_args!("  {:<9} {}", label, file), ctx.verbosity);
        }
    }
    Ok(())
}
