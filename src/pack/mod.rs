//! pack
//!
//! Self-contained packs of a scene and everything it depends on.
//!
//! # Modules
//!
//! - [`layout`] - Destination names inside a pack
//! - [`manifest`] - Remap manifests
//!
//! # Process
//!
//! The root is walked recursively with write access. Every scene file the
//! walk opens is first copied to a working copy (`<dest>@`), and only the
//! working copy is rewritten; originals are never modified. Each stored
//! path becomes `//` + the path from the referencing file's destination to
//! the target's destination. Leaf assets are copied as they are.
//!
//! In [`PackMode::Directory`] the working copies are renamed into place in
//! the output directory. In [`PackMode::Archive`] they live in a temporary
//! directory and everything is streamed into a zip at the destination.

pub mod layout;
pub mod manifest;

pub use layout::Layout;
pub use manifest::{PackManifest, DEPS_REMAP_FILE, PATHS_REMAP_FILE};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use thiserror::Error;

use crate::archive::{ArchiveError, ArchiveWriter};
use crate::blockfile::{BlockFile, BlockFileError, OpenMode};
use crate::core::paths;
use crate::walk::{
    FilePathRef, StaticExpander, Trace, VisitContext, VisitHandler, WalkError, WalkOptions, Walker,
};

/// Suffix marking a working copy.
pub const WORKING_SUFFIX: &str = "@";

/// Default name of the data subdirectory.
pub const DEFAULT_SUBDIR: &str = "data";

/// Errors from packing.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("cannot read source '{path}': {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: BlockFileError,
    },

    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("invalid destination: {0}")]
    InvalidDestination(PathBuf),

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Block(#[from] BlockFileError),

    #[error("failed to copy '{from}' to '{to}': {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("i/o error on '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to render manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Output shape of a pack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackMode {
    /// A directory tree next to the destination file.
    #[default]
    Directory,
    /// A single zip archive at the destination.
    Archive,
}

impl fmt::Display for PackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackMode::Directory => write!(f, "directory"),
            PackMode::Archive => write!(f, "archive"),
        }
    }
}

impl FromStr for PackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "directory" => Ok(PackMode::Directory),
            "archive" => Ok(PackMode::Archive),
            other => Err(format!("unknown pack mode '{}' (expected directory or archive)", other)),
        }
    }
}

/// Pack settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOptions {
    pub mode: PackMode,
    /// Directory, relative to the output root, holding everything but the root.
    pub subdir: String,
    /// Write the remap manifests.
    pub manifests: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            mode: PackMode::Directory,
            subdir: DEFAULT_SUBDIR.to_string(),
            manifests: false,
        }
    }
}

/// What a pack produced.
#[derive(Debug, Clone, Default)]
pub struct PackReport {
    /// The packed root file, or the archive.
    pub output: PathBuf,
    /// Destinations written, root first.
    pub files: Vec<String>,
    /// Referenced files that did not exist.
    pub missing: Vec<PathBuf>,
    /// Number of stored paths rewritten.
    pub rewrites: usize,
    pub manifest: PackManifest,
}

/// Walk handler that copies on first touch and rewrites paths.
struct Packer<'a> {
    layout: Layout,
    work_dir: &'a Path,
    manifests: bool,
    /// Destination → working copy.
    copies: BTreeMap<String, PathBuf>,
    /// Destination → source, for leaf assets.
    leaves: BTreeMap<String, PathBuf>,
    missing_libraries: BTreeSet<PathBuf>,
    manifest: PackManifest,
    rewrites: usize,
}

impl VisitHandler for Packer<'_> {
    type Error = PackError;

    fn open_path(&mut self, path: &Path, level: usize) -> Result<Option<PathBuf>, PackError> {
        let dest = self.layout.destination(path);
        if let Some(working) = self.copies.get(&dest) {
            return Ok(Some(working.clone()));
        }

        let mut name = self.work_dir.join(&dest).into_os_string();
        name.push(WORKING_SUFFIX);
        let working = PathBuf::from(name);
        if let Some(parent) = working.parent() {
            fs::create_dir_all(parent).map_err(|source| PackError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        if let Err(source) = fs::copy(path, &working) {
            let _ = fs::remove_file(&working);
            if level == 0 {
                return Err(PackError::Copy {
                    from: path.to_path_buf(),
                    to: working,
                    source,
                });
            }
            // An unreadable library is reported like a missing one.
            self.missing_libraries.insert(path.to_path_buf());
            return Ok(None);
        }

        if self.manifests {
            self.manifest.record_source(&dest, path);
        }
        self.copies.insert(dest, working.clone());
        Ok(Some(working))
    }

    fn visit(
        &mut self,
        file: &mut BlockFile,
        item: &FilePathRef,
        ctx: &VisitContext,
    ) -> Result<ControlFlow<()>, PackError> {
        let stored = item.read(file);
        if stored.is_empty() {
            return Ok(ControlFlow::Continue(()));
        }
        let source = paths::absolute_path(&stored, item.basedir());
        let target = self.layout.destination(&source);
        let owner = self.layout.destination(&ctx.file);

        let rewritten =
            paths::project_relative(&paths::relative_between(Layout::dir_of(&owner), &target));
        if rewritten != stored {
            item.write(file, &rewritten)?;
            self.rewrites += 1;
        }

        if item.is_library() {
            if !source.is_file() {
                self.missing_libraries.insert(source);
            }
        } else {
            if self.manifests {
                self.manifest.record_source(&target, &source);
            }
            self.leaves.entry(target).or_insert(source);
        }
        if self.manifests {
            self.manifest.record_rewrite(
                &owner,
                &paths::display_bytes(&rewritten),
                &paths::display_bytes(&stored),
            );
        }
        Ok(ControlFlow::Continue(()))
    }
}

/// Pack `src` and its dependencies to `dst`.
///
/// # Errors
///
/// Fails if `src` is not a readable scene file, if `dst` (or any file the
/// pack would place) already exists, or on I/O errors. Missing dependencies
/// are not errors; they are listed in the report.
pub fn pack(
    src: &Path,
    dst: &Path,
    options: &PackOptions,
    trace: &mut Trace,
) -> Result<PackReport, PackError> {
    let src = paths::absolutize(src).map_err(|source| PackError::Io {
        path: src.to_path_buf(),
        source,
    })?;
    let dst = paths::absolutize(dst).map_err(|source| PackError::Io {
        path: dst.to_path_buf(),
        source,
    })?;
    if !src.is_file() {
        return Err(PackError::SourceMissing(src));
    }
    if dst.exists() {
        return Err(PackError::DestinationExists(dst));
    }
    BlockFile::open(&src, OpenMode::ReadOnly)
        .and_then(BlockFile::close)
        .map_err(|source| PackError::Source {
            path: src.clone(),
            source,
        })?;

    // In an archive the root keeps its own name; on disk it takes dst's.
    let named = match options.mode {
        PackMode::Directory => dst.file_name(),
        PackMode::Archive => src.file_name(),
    };
    let (Some(root_name), Some(out_dir)) = (
        named.map(|n| n.to_string_lossy().into_owned()),
        dst.parent(),
    ) else {
        return Err(PackError::InvalidDestination(dst.clone()));
    };
    fs::create_dir_all(out_dir).map_err(|source| PackError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let temp = match options.mode {
        PackMode::Directory => None,
        PackMode::Archive => Some(TempDir::new().map_err(|source| PackError::Io {
            path: std::env::temp_dir(),
            source,
        })?),
    };
    let work_dir = temp.as_ref().map_or(out_dir, TempDir::path);

    trace.debug(0, format_args!("pack {} -> {} ({})", src.display(), dst.display(), options.mode));
    let mut packer = Packer {
        layout: Layout::new(&src, &root_name, &options.subdir),
        work_dir,
        manifests: options.manifests,
        copies: BTreeMap::new(),
        leaves: BTreeMap::new(),
        missing_libraries: BTreeSet::new(),
        manifest: PackManifest::default(),
        rewrites: 0,
    };
    let walked = Walker::new(
        WalkOptions {
            readonly: false,
            recursive: true,
        },
        &StaticExpander,
        trace,
    )
    .walk(&src, &mut packer);
    if let Err(err) = walked {
        discard(packer.copies.values());
        return Err(err);
    }

    let Packer {
        copies,
        leaves,
        missing_libraries,
        manifest,
        rewrites,
        ..
    } = packer;

    let mut missing: Vec<PathBuf> = missing_libraries.into_iter().collect();
    let mut assets = Vec::new();
    for (dest, source) in leaves {
        if copies.contains_key(&dest) {
            continue;
        }
        if source.is_file() {
            assets.push((dest, source));
        } else {
            trace.warn(format!("missing dependency: {}", source.display()));
            missing.push(source);
        }
    }

    // Root first, then everything else in destination order.
    let mut placed: Vec<(String, PathBuf)> = Vec::new();
    let mut copies = copies;
    if let Some(root) = copies.remove(&root_name) {
        placed.push((root_name.clone(), root));
    }
    placed.extend(copies);

    let written = match options.mode {
        PackMode::Directory => place_in_directory(out_dir, &placed, &assets, options, &manifest),
        PackMode::Archive => write_archive(&dst, &placed, &assets, options, &manifest),
    };
    let files = match written {
        Ok(files) => files,
        Err(err) => {
            discard(placed.iter().map(|(_, copy)| copy));
            if options.mode == PackMode::Archive {
                let _ = fs::remove_file(&dst);
            }
            return Err(err);
        }
    };
    drop(temp);

    for path in &missing {
        trace.record(0, format_args!("missing: {}", path.display()));
    }
    trace.info(format_args!("packed {} file(s) to {}", files.len(), dst.display()));

    Ok(PackReport {
        output: dst,
        files,
        missing,
        rewrites,
        manifest,
    })
}

/// Remove working copies left behind by a failed pack.
fn discard<'a>(copies: impl IntoIterator<Item = &'a PathBuf>) {
    for copy in copies {
        let _ = fs::remove_file(copy);
    }
}

fn place_in_directory(
    out_dir: &Path,
    working: &[(String, PathBuf)],
    assets: &[(String, PathBuf)],
    options: &PackOptions,
    manifest: &PackManifest,
) -> Result<Vec<String>, PackError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| PackError::Io { path, source }
    };

    // Refuse before anything is placed, so originals sharing the output
    // directory are never overwritten.
    for (dest, source) in working.iter().chain(assets) {
        let target = out_dir.join(dest);
        if target.exists() && target != *source {
            return Err(PackError::DestinationExists(target));
        }
    }

    let mut files = Vec::new();
    for (dest, copy) in working {
        let target = out_dir.join(dest);
        fs::rename(copy, &target).map_err(io_err(&target))?;
        files.push(dest.clone());
    }
    for (dest, source) in assets {
        let target = out_dir.join(dest);
        if target != *source {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
            fs::copy(source, &target).map_err(|err| PackError::Copy {
                from: source.clone(),
                to: target.clone(),
                source: err,
            })?;
        }
        files.push(dest.clone());
    }
    if options.manifests {
        manifest.write_to_dir(out_dir).map_err(io_err(out_dir))?;
    }
    Ok(files)
}

fn write_archive(
    dst: &Path,
    working: &[(String, PathBuf)],
    assets: &[(String, PathBuf)],
    options: &PackOptions,
    manifest: &PackManifest,
) -> Result<Vec<String>, PackError> {
    let mut writer = ArchiveWriter::create(dst)?;
    for (dest, path) in working.iter().chain(assets) {
        writer.add_file(dest, path)?;
    }
    let files = writer.entries().to_vec();
    if options.manifests {
        for (name, json) in manifest.render()? {
            writer.add_bytes(name, json.as_bytes())?;
        }
    }
    writer.finish()?;
    Ok(files)
}
