//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves its path arguments against the context's working directory
//! 2. Calls into the library
//! 3. Formats and displays output
//!
//! Handlers return `anyhow::Result`; a failed command exits non-zero after
//! `main` prints the error chain.

mod commit;
mod completion;
mod deps;
mod init;
mod pack;
mod remap;
mod status;
mod unpack;

// Re-export command functions for testing and direct invocation
pub use commit::commit;
pub use completion::completion;
pub use deps::deps;
pub use init::init;
pub use pack::pack;
pub use remap::remap;
pub use status::status;
pub use unpack::unpack;

use super::args::Command;
use super::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Init { url, dir, user } => init::init(ctx, &url, dir.as_deref(), user.as_deref()),
        Command::Deps {
            paths,
            recursive,
            json,
        } => deps::deps(ctx, &paths, recursive, json),
        Command::Pack {
            src,
            dst,
            archive,
            subdir,
            manifests,
        } => pack::pack(ctx, &src, &dst, archive, subdir.as_deref(), manifests),
        Command::Remap {
            file,
            mapping,
            output,
        } => remap::remap(ctx, &file, &mapping, output.as_deref()),
        Command::Unpack { stream, dir } => unpack::unpack(ctx, &stream, &dir),
        Command::Status { dir, json } => status::status(ctx, dir.as_deref(), json),
        Command::Commit { dir, message } => commit::commit(ctx, dir.as_deref(), &message),
        Command::Completion { shell } => completion::completion(shell),
    }
}
