//! pack command - Copy a scene and everything it depends on

use crate::cli::Context;
use crate::core::config::validate_subdir;
use crate::pack::{self, PackMode, PackOptions};
use crate::ui::output;
use anyhow::{Context as _, Result};
use std::path::Path;

/// Pack `src` into `dst`.
///
/// Flags override the configured pack defaults.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `src` - Root scene file
/// * `dst` - Destination root file or archive
/// * `archive` - Force archive mode
/// * `subdir` - Subdirectory override
/// * `manifests` - Force writing manifests
pub fn pack(
    ctx: &Context,
    src: &Path,
    dst: &Path,
    archive: bool,
    subdir: Option<&str>,
    manifests: bool,
) -> Result<()> {
    let subdir = match subdir {
        Some(s) => {
            validate_subdir(s)?;
            s.to_string()
        }
        None => ctx.config.pack_subdir(),
    };
    let options = PackOptions {
        mode: if archive {
            PackMode::Archive
        } else {
            ctx.config.pack_mode()
        },
        subdir,
        manifests: manifests || ctx.config.pack_manifests(),
    };
    output::debug(
        format_args!("pack mode {}, subdir {}", options.mode, options.subdir),
        ctx.verbosity,
    );

    let mut trace = ctx.trace()?;
    let report = pack::pack(&ctx.resolve(src), &ctx.resolve(dst), &options, &mut trace)
        .with_context(|| format!("Failed to pack {}", src.display()))?;
    trace.finish().context("Failed to write trace file")?;

    if ctx.verbosity == output::Verbosity::Debug {
        output::debug(
            format_args!("files:\n{}", output::format_list(&report.files, "  ")),
            ctx.verbosity,
        );
    }
    for missing in &report.missing {
        output::warn(
            format_args!("missing: {}", missing.display()),
            ctx.verbosity,
        );
    }
    output::success(
        format_args!(
            "Packed {} file(s) into {} ({} path(s) rewritten)",
            report.files.len(),
            output::format_path(&report.output, &ctx.cwd),
            report.rewrites
        ),
        ctx.verbosity,
    );
    Ok(())
}
