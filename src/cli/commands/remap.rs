//! remap command - Rewrite the paths stored in one scene file

use crate::cli::Context;
use crate::remap::remap_file;
use crate::ui::output;
use anyhow::{Context as _, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Write a copy of `file` with its stored paths rewritten by `mapping`.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `file` - Scene file to remap
/// * `mapping` - JSON file of stored path -> replacement
/// * `output_path` - Where to write the copy
pub fn remap(ctx: &Context, file: &Path, mapping: &Path, output_path: Option<&Path>) -> Result<()> {
    let file = ctx.resolve(file);
    let mapping_path = ctx.resolve(mapping);
    let text = fs::read_to_string(&mapping_path)
        .with_context(|| format!("Failed to read {}", mapping_path.display()))?;
    let mapping: BTreeMap<String, String> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON object of strings", mapping_path.display()))?;

    let out = match output_path {
        Some(path) => ctx.resolve(path),
        None => default_output(&file),
    };

    let mut trace = ctx.trace()?;
    let report = remap_file(&file, &out, &mapping, &mut trace)
        .with_context(|| format!("Failed to remap {}", file.display()))?;
    trace.finish().context("Failed to write trace file")?;

    for stored in &report.unmapped {
        output::debug(format_args!("unchanged: {}", stored), ctx.verbosity);
    }
    output::success(
        format_args!(
            "Rewrote {} path(s) into {}",
            report.rewritten,
            output::format_path(&report.output, &ctx.cwd)
        ),
        ctx.verbosity,
    );
    Ok(())
}

/// `shot.blend` -> `shot_remap.blend`, next to the input.
fn default_output(file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match file.extension() {
        Some(ext) => format!("{}_remap.{}", stem, ext.to_string_lossy()),
        None => format!("{}_remap", stem),
    };
    file.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_keeps_extension() {
        assert_eq!(
            default_output(Path::new("/p/shot.blend")),
            PathBuf::from("/p/shot_remap.blend")
        );
        assert_eq!(default_output(Path::new("/p/shot")), PathBuf::from("/p/shot_remap"));
    }
}
