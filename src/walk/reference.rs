//! walk::reference
//!
//! A file path stored inside a block.
//!
//! Most paths live in a single byte field. Sequencer strips split theirs
//! across two blocks: a directory on the strip and a file name on the strip
//! element. [`FilePathRef`] hides the difference behind `read` and `write`.

use std::path::{Path, PathBuf};

use crate::blockfile::{BlockCode, BlockFile, BlockFileError, BlockIndex};
use crate::core::paths;

/// Where the bytes of a path are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRef {
    /// One field holds the whole path.
    Field {
        block: BlockIndex,
        field: &'static str,
    },
    /// The path is `dir` field + `name` field.
    Split {
        dir_block: BlockIndex,
        dir_field: &'static str,
        name_block: BlockIndex,
        name_field: &'static str,
    },
}

/// A path reference found during a walk.
///
/// Reads and writes go through the [`BlockFile`] the reference was found in;
/// writes change the open file and nothing else.
#[derive(Debug, Clone)]
pub struct FilePathRef {
    target: PathRef,
    /// Directory of the original file the reference belongs to.
    basedir: PathBuf,
    /// Library depth (0 = the root file).
    level: usize,
    /// Code of the ID block that produced the reference.
    code: BlockCode,
}

impl FilePathRef {
    pub fn new(target: PathRef, basedir: &Path, level: usize, code: BlockCode) -> Self {
        Self {
            target,
            basedir: basedir.to_path_buf(),
            level,
            code,
        }
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn code(&self) -> BlockCode {
        self.code
    }

    /// True if the reference is a library link (a scene file in its own
    /// right) rather than a leaf asset.
    pub fn is_library(&self) -> bool {
        self.code == BlockCode::LIBRARY
    }

    /// The stored path. Missing fields read as empty.
    pub fn read(&self, file: &BlockFile) -> Vec<u8> {
        match self.target {
            PathRef::Field { block, field } => {
                file.block(block).bytes(field).unwrap_or_default().to_vec()
            }
            PathRef::Split {
                dir_block,
                dir_field,
                name_block,
                name_field,
            } => {
                let mut path = file
                    .block(dir_block)
                    .bytes(dir_field)
                    .unwrap_or_default()
                    .to_vec();
                path.extend_from_slice(file.block(name_block).bytes(name_field).unwrap_or_default());
                path
            }
        }
    }

    /// Store a new path.
    ///
    /// A split reference keeps everything up to and including the last `/`
    /// in the directory field and the rest in the name field.
    pub fn write(&self, file: &mut BlockFile, path: &[u8]) -> Result<(), BlockFileError> {
        match self.target {
            PathRef::Field { block, field } => file.set_bytes(block, field, path),
            PathRef::Split {
                dir_block,
                dir_field,
                name_block,
                name_field,
            } => {
                let split = path.iter().rposition(|&b| b == b'/').map_or(0, |pos| pos + 1);
                let (dir, name) = path.split_at(split);
                // Both halves must fit before either is written.
                file.check_bytes(dir_block, dir_field, dir)?;
                file.check_bytes(name_block, name_field, name)?;
                file.set_bytes(dir_block, dir_field, dir)?;
                file.set_bytes(name_block, name_field, name)
            }
        }
    }

    /// The stored path resolved against [`Self::basedir`].
    pub fn absolute(&self, file: &BlockFile) -> PathBuf {
        paths::absolute_path(&self.read(file), &self.basedir)
    }
}
