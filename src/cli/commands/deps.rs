//! deps command - List the files a scene depends on

use crate::cli::Context;
use crate::ui::output;
use crate::walk::{dependencies, Dependency, WalkOptions};
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

/// List the path references of each file in `paths`.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `paths` - Root scene files
/// * `recursive` - Follow library links
/// * `json` - Print one JSON array instead of text
pub fn deps(ctx: &Context, paths: &[PathBuf], recursive: bool, json: bool) -> Result<()> {
    let options = WalkOptions {
        readonly: true,
        recursive,
    };

    let mut all = Vec::new();
    for path in paths {
        let root = ctx.resolve(path);
        let mut trace = ctx.trace()?;
        let found = dependencies(&root, options, &mut trace)
            .with_context(|| format!("Failed to read dependencies of {}", path.display()))?;
        trace.finish().context("Failed to write trace file")?;
        all.extend(found);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    let mut current: Option<&Path> = None;
    for dep in &all {
        if current != Some(dep.file.as_path()) {
            output::print(output::format_path(&dep.file, &ctx.cwd), ctx.verbosity);
            current = Some(dep.file.as_path());
        }
        output::print(format_dependency(dep), ctx.verbosity);
    }

    let missing = all.iter().filter(|dep| !dep.exists()).count();
    if missing > 0 {
        output::warn(
            format_args!("{} of {} referenced file(s) missing", missing, all.len()),
            ctx.verbosity,
        );
    }
    Ok(())
}

fn format_dependency(dep: &Dependency) -> String {
    let mut line = format!("  {:<2} {}", dep.code, dep.stored);
    if !dep.exists() {
        line.push_str("  (missing)");
    }
    line
}
