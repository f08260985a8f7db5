//! session
//!
//! A checked-out working directory and the changes made in it.
//!
//! # Modules
//!
//! - [`hash`] - Content hashes
//! - [`lock`] - Session lock
//! - [`commit`] - Staging a commit archive
//!
//! # Storage
//!
//! A session is a directory holding the checked-out files plus:
//!
//! - `.bam_paths_uuid.json` - relative path → content hash at checkout
//! - `.bam_deps_remap.json` - per file, rewritten path → original path
//! - `.bam_paths_remap.json` - relative path → original source path
//!
//! Files whose names start with `.bam` are session metadata and never part
//! of the tracked content.

pub mod commit;
pub mod hash;
pub mod lock;

pub use commit::{stage_commit, CommitInfo, CommitReport, COMMIT_ARCHIVE, COMMIT_INFO_FILE};
pub use hash::hash_file;
pub use lock::{LockError, SessionLock};

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::pack::manifest::{self, DepsRemap, PathsRemap, PackManifest};

/// Hash map written at checkout.
pub const PATHS_UUID_FILE: &str = ".bam_paths_uuid.json";

/// Name prefix of session metadata files.
pub const METADATA_PREFIX: &str = ".bam";

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("'{0}' is not a session (no .bam_paths_uuid.json)")]
    NotASession(PathBuf),

    #[error("i/o error on '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("a staged commit already exists: {0}")]
    CommitPending(PathBuf),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to encode commit info: {0}")]
    Json(#[from] serde_json::Error),
}

/// Changes since checkout, as `/`-separated paths relative to the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl SessionStatus {
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }

    /// Modified and added files, sorted.
    pub fn changed(&self) -> Vec<String> {
        let mut changed: Vec<String> = self.modified.iter().chain(&self.added).cloned().collect();
        changed.sort();
        changed
    }
}

/// A loaded session.
#[derive(Debug, Clone)]
pub struct Session {
    dir: PathBuf,
    hashes: BTreeMap<String, String>,
    manifest: PackManifest,
}

impl Session {
    /// Load the session at `dir`.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotASession`] if `dir` has no hash map.
    pub fn load(dir: &Path) -> Result<Self, SessionError> {
        let uuid_path = dir.join(PATHS_UUID_FILE);
        if !uuid_path.is_file() {
            return Err(SessionError::NotASession(dir.to_path_buf()));
        }
        let hashes = manifest::read_json(&uuid_path).map_err(|source| SessionError::Io {
            path: uuid_path,
            source,
        })?;
        let manifest = PackManifest::read_from_dir(dir).map_err(|source| SessionError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            hashes,
            manifest,
        })
    }

    /// Record the current contents of `dir` as a fresh session.
    pub fn create(dir: &Path) -> Result<Self, SessionError> {
        let mut hashes = BTreeMap::new();
        for rel in tracked_files(dir)? {
            let path = dir.join(&rel);
            let hash = hash_file(&path).map_err(|source| SessionError::Io { path, source })?;
            hashes.insert(rel, hash);
        }
        let uuid_path = dir.join(PATHS_UUID_FILE);
        let json = serde_json::to_string_pretty(&hashes)?;
        fs::write(&uuid_path, json).map_err(|source| SessionError::Io {
            path: uuid_path,
            source,
        })?;
        Self::load(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Content hashes recorded at checkout.
    pub fn hashes(&self) -> &BTreeMap<String, String> {
        &self.hashes
    }

    pub fn deps_remap(&self) -> &DepsRemap {
        &self.manifest.deps_remap
    }

    pub fn paths_remap(&self) -> &PathsRemap {
        &self.manifest.paths_remap
    }

    /// Compare the directory against the recorded hashes.
    pub fn status(&self) -> Result<SessionStatus, SessionError> {
        let mut status = SessionStatus::default();
        let present = tracked_files(&self.dir)?;
        for rel in &present {
            match self.hashes.get(rel) {
                None => status.added.push(rel.clone()),
                Some(recorded) => {
                    let path = self.dir.join(rel);
                    let current =
                        hash_file(&path).map_err(|source| SessionError::Io { path, source })?;
                    if &current != recorded {
                        status.modified.push(rel.clone());
                    }
                }
            }
        }
        status.removed = self
            .hashes
            .keys()
            .filter(|rel| present.binary_search(rel).is_err())
            .cloned()
            .collect();
        Ok(status)
    }
}

/// Files under `dir`, relative and `/`-separated, sorted, without metadata.
pub fn tracked_files(dir: &Path) -> Result<Vec<String>, SessionError> {
    let mut out = Vec::new();
    let mut pending = vec![(dir.to_path_buf(), String::new())];
    while let Some((current, prefix)) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|source| SessionError::Io {
            path: current.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| SessionError::Io {
                path: current.clone(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(METADATA_PREFIX) {
                continue;
            }
            let rel = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };
            let path = entry.path();
            if path.is_dir() {
                pending.push((path, rel));
            } else {
                out.push(rel);
            }
        }
    }
    out.sort();
    Ok(out)
}
