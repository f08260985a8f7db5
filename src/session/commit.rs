//! session::commit
//!
//! Stage the changes of a session as a commit archive.
//!
//! The archive (`.bam_commit.zip` in the session) holds every modified or
//! added file under its session-relative path, with packed paths mapped
//! back to their originals, plus:
//!
//! - `.bam_paths_remap.json` - the source paths of the committed files
//! - `.bam_commit.json` - message, timestamp, committed and removed files

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use super::{Session, SessionError, SessionLock};
use crate::archive::ArchiveWriter;
use crate::pack::PATHS_REMAP_FILE;
use crate::remap::remap_file;
use crate::walk::Trace;

/// File name of the staged archive.
pub const COMMIT_ARCHIVE: &str = ".bam_commit.zip";

/// Entry holding [`CommitInfo`].
pub const COMMIT_INFO_FILE: &str = ".bam_commit.json";

/// Metadata stored with a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub message: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
    pub files: Vec<String>,
    pub removed: Vec<String>,
}

/// What a staged commit contains.
#[derive(Debug, Clone)]
pub struct CommitReport {
    pub archive: PathBuf,
    pub info: CommitInfo,
    /// Files committed without path remapping because it failed.
    pub unmapped: Vec<String>,
}

/// Stage the changes of the session at `dir`.
///
/// # Errors
///
/// Fails if `dir` is not a session, the session is locked, a staged commit
/// already exists, or there is nothing to commit.
pub fn stage_commit(
    dir: &Path,
    message: &str,
    trace: &mut Trace,
) -> Result<CommitReport, SessionError> {
    let _lock = SessionLock::acquire(dir)?;
    let session = Session::load(dir)?;
    let status = session.status()?;
    if status.is_clean() {
        return Err(SessionError::NothingToCommit);
    }

    let archive = dir.join(COMMIT_ARCHIVE);
    if archive.exists() {
        return Err(SessionError::CommitPending(archive));
    }

    let info = CommitInfo {
        message: message.to_string(),
        created_at: Utc::now().to_rfc3339(),
        files: status.changed(),
        removed: status.removed.clone(),
    };
    match write_commit(&session, &archive, &info, trace) {
        Ok(unmapped) => {
            trace.info(format_args!(
                "staged {} file(s) in {}",
                info.files.len(),
                archive.display()
            ));
            Ok(CommitReport {
                archive,
                info,
                unmapped,
            })
        }
        Err(err) => {
            let _ = fs::remove_file(&archive);
            Err(err)
        }
    }
}

fn write_commit(
    session: &Session,
    archive: &Path,
    info: &CommitInfo,
    trace: &mut Trace,
) -> Result<Vec<String>, SessionError> {
    let scratch = TempDir::new().map_err(|source| SessionError::Io {
        path: std::env::temp_dir(),
        source,
    })?;
    let mut writer = ArchiveWriter::create(archive)?;
    let mut unmapped = Vec::new();

    for (i, rel) in info.files.iter().enumerate() {
        let path = session.dir().join(rel);
        let source = match session.deps_remap().get(rel) {
            Some(mapping) if !mapping.is_empty() => {
                let out = scratch.path().join(i.to_string());
                match remap_file(&path, &out, mapping, trace) {
                    Ok(_) => out,
                    Err(err) => {
                        trace.warn(format!("committing {} without remapping: {}", rel, err));
                        unmapped.push(rel.clone());
                        path
                    }
                }
            }
            _ => path,
        };
        writer.add_file(rel, &source)?;
    }

    let sources: BTreeMap<&String, &String> = session
        .paths_remap()
        .iter()
        .filter(|(rel, _)| info.files.contains(rel))
        .collect();
    writer.add_bytes(PATHS_REMAP_FILE, serde_json::to_string_pretty(&sources)?.as_bytes())?;
    writer.add_bytes(COMMIT_INFO_FILE, serde_json::to_string_pretty(info)?.as_bytes())?;
    writer.finish()?;
    Ok(unmapped)
}
