//! walk::visit
//!
//! The dependency walker.
//!
//! # Algorithm
//!
//! A walk starts at a root file and visits the path references of its ID
//! blocks. With `recursive` set, linked libraries are visited too, but only
//! for the identities actually linked from them:
//!
//! 1. The handler's `open_path` picks the file to open (a working copy when
//!    packing), which is opened read-only or read-write. A handler may
//!    decline a file, which is then skipped.
//! 2. ID blocks are selected. The root takes all of them; a library takes
//!    the identities asked for, plus everything they expand to within the
//!    library.
//! 3. Path references of the selected blocks go to the handler, then those
//!    of the library blocks the walk will recurse into.
//! 4. The file is closed, and each linked library is walked for its
//!    identities, sorted by library path.
//!
//! # Visit state
//!
//! A [`VisitState`] spans the whole walk and records which identities of
//! which library have been claimed. Identities already claimed are not asked
//! for again, and an identity reached only through expansion is expanded in
//! at most one visit. This bounds the walk even through cyclic links.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::expand::ExpandIds;
use super::extract::extract;
use super::reference::FilePathRef;
use super::trace::Trace;
use crate::blockfile::{Address, BlockCode, BlockFile, BlockFileError, BlockIndex, OpenMode};
use crate::core::paths;

/// Codes never treated as visitable ID blocks.
const EXCLUDED_CODES: [BlockCode; 4] = [
    BlockCode::LIBRARY,
    BlockCode::LINKED_ID,
    BlockCode::WINDOW_MANAGER,
    BlockCode::SCREEN,
];

/// An identity name as stored in `id.name`, code prefix included.
pub type IdName = Vec<u8>;

/// Errors from a walk.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("cannot read root file '{path}': {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: BlockFileError,
    },

    #[error(transparent)]
    Block(#[from] BlockFileError),

    #[error("cannot resolve '{path}': {source}")]
    Resolve {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Walk settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOptions {
    /// Open files without write access. Handlers cannot rewrite paths.
    pub readonly: bool,
    /// Follow library links.
    pub recursive: bool,
}

/// Where a reference was found.
#[derive(Debug, Clone)]
pub struct VisitContext {
    /// Directory of the root file.
    pub root_dir: PathBuf,
    /// File name of the file being visited.
    pub basename: OsString,
    /// Absolute path of the original file (not the working copy).
    pub file: PathBuf,
    /// Library depth.
    pub level: usize,
}

/// Receives the references found by a [`Walker`].
pub trait VisitHandler {
    type Error: From<WalkError>;

    /// The file to actually open for the original at `path`, or `None` to
    /// skip it.
    fn open_path(&mut self, path: &Path, _level: usize) -> Result<Option<PathBuf>, Self::Error> {
        Ok(Some(path.to_path_buf()))
    }

    /// Handle one reference. Returning `Break` ends the walk.
    fn visit(
        &mut self,
        file: &mut BlockFile,
        item: &FilePathRef,
        ctx: &VisitContext,
    ) -> Result<ControlFlow<()>, Self::Error>;
}

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Completed,
    /// The handler asked to stop.
    Stopped,
}

/// Identities claimed per library, keyed by absolute library path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitState {
    libraries: BTreeMap<PathBuf, BTreeSet<IdName>>,
}

impl VisitState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, library: &Path, id: &[u8]) -> bool {
        self.libraries
            .get(library)
            .is_some_and(|ids| ids.contains(id))
    }

    /// Claim `wanted`, returning only the identities not claimed before.
    pub fn claim(&mut self, library: &Path, wanted: BTreeSet<IdName>) -> BTreeSet<IdName> {
        let claimed = self.libraries.entry(library.to_path_buf()).or_default();
        let fresh: BTreeSet<IdName> = wanted.difference(claimed).cloned().collect();
        claimed.extend(fresh.iter().cloned());
        fresh
    }

    /// Claim one identity; false if it was already claimed.
    pub fn claim_one(&mut self, library: &Path, id: &[u8]) -> bool {
        self.libraries
            .entry(library.to_path_buf())
            .or_default()
            .insert(id.to_vec())
    }
}

/// Identities linked from other libraries, by library block address.
type Linked = BTreeMap<Address, BTreeSet<IdName>>;

/// Walks a root file and, optionally, its libraries.
pub struct Walker<'a> {
    options: WalkOptions,
    expander: &'a dyn ExpandIds,
    trace: &'a mut Trace,
    state: VisitState,
}

impl<'a> Walker<'a> {
    pub fn new(options: WalkOptions, expander: &'a dyn ExpandIds, trace: &'a mut Trace) -> Self {
        Self {
            options,
            expander,
            trace,
            state: VisitState::new(),
        }
    }

    pub fn state(&self) -> &VisitState {
        &self.state
    }

    /// Walk from `root`.
    ///
    /// # Errors
    ///
    /// Fails if the root cannot be read, or with any handler error. Missing
    /// or unreadable libraries are reported to the trace and skipped.
    pub fn walk<H: VisitHandler>(
        &mut self,
        root: &Path,
        handler: &mut H,
    ) -> Result<WalkOutcome, H::Error> {
        let root = absolutize(root)?;
        let root_dir = parent_dir(&root);
        match self.visit_file(&root, None, &root_dir, 0, handler)? {
            ControlFlow::Continue(()) => Ok(WalkOutcome::Completed),
            ControlFlow::Break(()) => Ok(WalkOutcome::Stopped),
        }
    }

    fn visit_file<H: VisitHandler>(
        &mut self,
        path: &Path,
        wanted: Option<&BTreeSet<IdName>>,
        root_dir: &Path,
        level: usize,
        handler: &mut H,
    ) -> Result<ControlFlow<()>, H::Error> {
        let basedir = parent_dir(path);
        self.trace.record(level, path.display());
        if let Some(wanted) = wanted {
            self.trace.record(level, format_ids(wanted));
        }

        let Some(open_path) = handler.open_path(path, level)? else {
            self.trace.warn(format!("skipping library: {}", path.display()));
            return Ok(ControlFlow::Continue(()));
        };
        let mode = if self.options.readonly {
            OpenMode::ReadOnly
        } else {
            OpenMode::ReadWrite
        };
        let mut file = match BlockFile::open(&open_path, mode) {
            Ok(file) => file,
            Err(source) if level == 0 => {
                return Err(WalkError::Root {
                    path: path.to_path_buf(),
                    source,
                }
                .into())
            }
            Err(err) => {
                self.trace.warn(format!("skipping library: {}", err));
                return Ok(ControlFlow::Continue(()));
            }
        };

        let expanding = self.options.recursive && level > 0 && wanted.is_some();
        let mut linked = Linked::new();
        let selected = self.select(&file, path, wanted, level, expanding, &mut linked);
        if !expanding {
            linked = all_linked(&file);
        }

        // Library paths are read before any handler sees (and may rewrite) them.
        let mut libraries: BTreeMap<PathBuf, BTreeSet<IdName>> = BTreeMap::new();
        let mut needed: BTreeSet<Vec<u8>> = BTreeSet::new();
        if self.options.recursive {
            for (address, ids) in linked {
                let Some(lib) = file.block_at(address) else {
                    continue;
                };
                let Some(stored) = file.block(lib).bytes("name") else {
                    continue;
                };
                needed.insert(stored.to_vec());
                libraries
                    .entry(paths::absolute_path(stored, &basedir))
                    .or_default()
                    .extend(ids);
            }
        }

        let library_blocks: Vec<BlockIndex> = file
            .blocks_of_code(BlockCode::LIBRARY)
            .iter()
            .copied()
            .filter(|&lib| {
                !expanding
                    || file
                        .block(lib)
                        .bytes("name")
                        .is_some_and(|name| needed.contains(name))
            })
            .collect();

        let ctx = VisitContext {
            root_dir: root_dir.to_path_buf(),
            basename: path.file_name().map(OsString::from).unwrap_or_default(),
            file: path.to_path_buf(),
            level,
        };

        let mut refs = Vec::new();
        for block in selected.into_iter().chain(library_blocks) {
            refs.clear();
            extract(&file, block, &basedir, level, &mut refs);
            for item in &refs {
                if handler.visit(&mut file, item, &ctx)?.is_break() {
                    file.close().map_err(WalkError::from)?;
                    return Ok(ControlFlow::Break(()));
                }
            }
        }
        file.close().map_err(WalkError::from)?;

        if !self.options.recursive {
            return Ok(ControlFlow::Continue(()));
        }
        for (library, ids) in libraries {
            let todo = self.state.claim(&library, ids);
            if !library.is_file() {
                self.trace.warn(format!(
                    "library not found: {} (linked from {})",
                    library.display(),
                    path.display()
                ));
                continue;
            }
            if todo.is_empty() {
                self.trace.record(level + 1, format_args!("{} (already visited)", library.display()));
                continue;
            }
            self.trace.debug(level + 1, format_args!("library {}", library.display()));
            if self
                .visit_file(&library, Some(&todo), root_dir, level + 1, handler)?
                .is_break()
            {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// ID blocks to visit, in file order of their codes.
    ///
    /// While expanding, identities linked from further libraries are
    /// collected into `linked`.
    fn select(
        &mut self,
        file: &BlockFile,
        path: &Path,
        wanted: Option<&BTreeSet<IdName>>,
        level: usize,
        expanding: bool,
        linked: &mut Linked,
    ) -> Vec<BlockIndex> {
        let mut selected = Vec::new();
        let mut expanded: BTreeSet<IdName> = BTreeSet::new();
        let codes: Vec<BlockCode> = file.codes().collect();

        for code in codes {
            if !code.is_id() || EXCLUDED_CODES.contains(&code) {
                continue;
            }
            for &block in file.blocks_of_code(code) {
                let Some(wanted) = wanted else {
                    selected.push(block);
                    continue;
                };
                let Some(name) = file.block(block).id_name() else {
                    continue;
                };
                if !wanted.contains(name) {
                    continue;
                }
                if expanding {
                    self.expand_from(file, block, path, wanted, &mut expanded, linked, &mut selected);
                } else {
                    selected.push(block);
                }
            }
        }
        if expanding {
            self.trace.record(level, format_args!("expanded: {}", format_ids(&expanded)));
        }
        selected
    }

    /// Depth-first expansion from one wanted block.
    #[allow(clippy::too_many_arguments)]
    fn expand_from(
        &mut self,
        file: &BlockFile,
        start: BlockIndex,
        library: &Path,
        wanted: &BTreeSet<IdName>,
        expanded: &mut BTreeSet<IdName>,
        linked: &mut Linked,
        selected: &mut Vec<BlockIndex>,
    ) {
        let mut stack = vec![start];
        while let Some(block) = stack.pop() {
            let b = file.block(block);
            if b.code() == BlockCode::LINKED_ID {
                if let (Some(lib), Some(name)) = (b.pointer("lib"), b.bytes("name")) {
                    linked.entry(lib).or_default().insert(name.to_vec());
                }
                continue;
            }
            let Some(name) = b.id_name() else {
                continue;
            };
            if !expanded.insert(name.to_vec()) {
                continue;
            }
            // Identities nobody asked for are expanded once per walk.
            if !wanted.contains(name) && !self.state.claim_one(library, name) {
                continue;
            }
            selected.push(block);
            let deps = self.expander.expand(file, block);
            stack.extend(deps.into_iter().rev());
        }
    }
}

/// Every linked identity of a file, by library block.
fn all_linked(file: &BlockFile) -> Linked {
    let mut linked = Linked::new();
    for &block in file.blocks_of_code(BlockCode::LINKED_ID) {
        let b = file.block(block);
        if let (Some(lib), Some(name)) = (b.pointer("lib"), b.bytes("name")) {
            linked.entry(lib).or_default().insert(name.to_vec());
        }
    }
    linked
}

fn absolutize(path: &Path) -> Result<PathBuf, WalkError> {
    paths::absolutize(path).map_err(|source| WalkError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn format_ids(ids: &BTreeSet<IdName>) -> String {
    let names: Vec<_> = ids.iter().map(|id| paths::display_bytes(id)).collect();
    format!("{{{}}}", names.join(", "))
}
