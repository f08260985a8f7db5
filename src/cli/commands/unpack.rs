//! unpack command - Unpack a checkout stream into a new session directory

use crate::cli::Context;
use crate::session::Session;
use crate::ui::output;
use crate::wire;
use anyhow::{Context as _, Result};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Read the checkout stream at `stream` (`-` for stdin) into `dir`.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `stream` - Stream file, or `-`
/// * `dir` - Session directory to create
pub fn unpack(ctx: &Context, stream: &Path, dir: &Path) -> Result<()> {
    let dir = ctx.resolve(dir);
    let verbosity = ctx.verbosity;
    let on_message = |text: &str| output::print(format_args!("server: {}", text), verbosity);

    let files = if stream == Path::new("-") {
        wire::checkout(&mut io::stdin().lock(), &dir, on_message)
    } else {
        let path = ctx.resolve(stream);
        let file =
            File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        wire::checkout(&mut BufReader::new(file), &dir, on_message)
    }
    .context("Failed to unpack checkout")?;

    Session::create(&dir)
        .with_context(|| format!("Failed to record session in {}", dir.display()))?;

    output::success(
        format_args!(
            "Unpacked {} file(s) into {}",
            files.len(),
            output::format_path(&dir, &ctx.cwd)
        ),
        ctx.verbosity,
    );
    Ok(())
}
