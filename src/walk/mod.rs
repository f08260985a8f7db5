//! walk
//!
//! Dependency discovery for scene files.
//!
//! # Modules
//!
//! - [`reference`] - Path references and their read/write access
//! - [`expand`] - Same-file dependencies of ID blocks
//! - [`extract`] - Paths stored by ID blocks
//! - [`visit`] - The recursive walker and its visit state
//! - [`trace`] - Walk diagnostics
//!
//! # Example
//!
//! ```no_run
//! use scenepack::walk::{dependencies, Trace, WalkOptions};
//! use std::path::Path;
//!
//! let mut trace = Trace::silent();
//! let options = WalkOptions { readonly: true, recursive: true };
//! for dep in dependencies(Path::new("shot.blend"), options, &mut trace)? {
//!     println!("{} -> {}", dep.file.display(), dep.absolute.display());
//! }
//! # Ok::<(), scenepack::walk::WalkError>(())
//! ```

pub mod expand;
pub mod extract;
pub mod reference;
pub mod trace;
pub mod visit;

pub use expand::{ExpandIds, StaticExpander};
pub use reference::{FilePathRef, PathRef};
pub use trace::Trace;
pub use visit::{
    IdName, VisitContext, VisitHandler, VisitState, WalkError, WalkOptions, WalkOutcome, Walker,
};

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::blockfile::BlockFile;
use crate::core::paths;

/// One dependency found by [`dependencies`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// The file storing the reference.
    pub file: PathBuf,
    /// The path exactly as stored (lossily decoded).
    pub stored: String,
    /// The stored path resolved against `file`'s directory.
    pub absolute: PathBuf,
    pub level: usize,
    /// Block code of the referencing ID block.
    pub code: String,
    pub is_library: bool,
}

impl Dependency {
    pub fn exists(&self) -> bool {
        self.absolute.exists()
    }
}

struct Collector {
    found: Vec<Dependency>,
}

impl VisitHandler for Collector {
    type Error = WalkError;

    fn visit(
        &mut self,
        file: &mut BlockFile,
        item: &FilePathRef,
        ctx: &VisitContext,
    ) -> Result<ControlFlow<()>, WalkError> {
        let stored = item.read(file);
        self.found.push(Dependency {
            file: ctx.file.clone(),
            stored: paths::display_bytes(&stored).into_owned(),
            absolute: paths::absolute_path(&stored, item.basedir()),
            level: item.level(),
            code: item.code().to_string(),
            is_library: item.is_library(),
        });
        Ok(ControlFlow::Continue(()))
    }
}

/// List every path reference reachable from `root`.
///
/// # Errors
///
/// Fails if the root cannot be read.
pub fn dependencies(
    root: &Path,
    options: WalkOptions,
    trace: &mut Trace,
) -> Result<Vec<Dependency>, WalkError> {
    let mut collector = Collector { found: Vec::new() };
    Walker::new(options, &StaticExpander, trace).walk(root, &mut collector)?;
    Ok(collector.found)
}
