//! remap
//!
//! Rewrite the stored paths of one scene file from a mapping.
//!
//! The source is copied to the output first and only the copy is edited.
//! Paths without an entry in the mapping are left alone, and libraries are
//! not followed: a mapping describes one file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::blockfile::{BlockFile, BlockFileError};
use crate::core::paths;
use crate::walk::{
    FilePathRef, StaticExpander, Trace, VisitContext, VisitHandler, WalkError, WalkOptions, Walker,
};

/// Errors from remapping.
#[derive(Debug, Error)]
pub enum RemapError {
    #[error("source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("output already exists: {0}")]
    OutputExists(PathBuf),

    #[error("failed to copy '{from}' to '{to}': {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Block(#[from] BlockFileError),
}

/// What a remap changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapReport {
    pub output: PathBuf,
    /// Number of stored paths rewritten.
    pub rewritten: usize,
    /// Stored paths with no mapping entry.
    pub unmapped: Vec<String>,
}

struct Remapper<'a> {
    output: &'a Path,
    mapping: &'a BTreeMap<String, String>,
    rewritten: usize,
    unmapped: Vec<String>,
}

impl VisitHandler for Remapper<'_> {
    type Error = RemapError;

    fn open_path(&mut self, _path: &Path, _level: usize) -> Result<Option<PathBuf>, RemapError> {
        Ok(Some(self.output.to_path_buf()))
    }

    fn visit(
        &mut self,
        file: &mut BlockFile,
        item: &FilePathRef,
        _ctx: &VisitContext,
    ) -> Result<ControlFlow<()>, RemapError> {
        let stored = paths::display_bytes(&item.read(file)).into_owned();
        match self.mapping.get(&stored) {
            Some(replacement) if *replacement != stored => {
                item.write(file, replacement.as_bytes())?;
                self.rewritten += 1;
            }
            Some(_) => {}
            None => self.unmapped.push(stored),
        }
        Ok(ControlFlow::Continue(()))
    }
}

/// Copy `src` to `output` and rewrite its stored paths with `mapping`
/// (stored path → replacement).
///
/// # Errors
///
/// Fails if `src` is missing or unreadable, if `output` exists, or if a
/// replacement does not fit its field.
pub fn remap_file(
    src: &Path,
    output: &Path,
    mapping: &BTreeMap<String, String>,
    trace: &mut Trace,
) -> Result<RemapReport, RemapError> {
    if !src.is_file() {
        return Err(RemapError::SourceMissing(src.to_path_buf()));
    }
    if output.exists() {
        return Err(RemapError::OutputExists(output.to_path_buf()));
    }
    fs::copy(src, output).map_err(|source| RemapError::Copy {
        from: src.to_path_buf(),
        to: output.to_path_buf(),
        source,
    })?;

    let mut remapper = Remapper {
        output,
        mapping,
        rewritten: 0,
        unmapped: Vec::new(),
    };
    let result = Walker::new(
        WalkOptions {
            readonly: false,
            recursive: false,
        },
        &StaticExpander,
        trace,
    )
    .walk(src, &mut remapper);
    if let Err(err) = result {
        let _ = fs::remove_file(output);
        return Err(err);
    }

    trace.debug(
        0,
        format_args!("remapped {} path(s) in {}", remapper.rewritten, output.display()),
    );
    Ok(RemapReport {
        output: output.to_path_buf(),
        rewritten: remapper.rewritten,
        unmapped: remapper.unmapped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockfile::{BlockCode, BlockFileBuilder, OpenMode};
    use tempfile::TempDir;

    fn scene(path: &Path) {
        let mut b = BlockFileBuilder::new();
        b.id(BlockCode::IMAGE, "a", |f| {
            f.bytes("name", b"//data/a.png", 128).int("source", 1).pointer("packedfile", None)
        });
        b.id(BlockCode::IMAGE, "b", |f| {
            f.bytes("name", b"//data/b.png", 128).int("source", 1).pointer("packedfile", None)
        });
        b.write(path).unwrap();
    }

    fn image_paths(path: &Path) -> Vec<Vec<u8>> {
        let file = BlockFile::open(path, OpenMode::ReadOnly).unwrap();
        file.blocks_of_code(BlockCode::IMAGE)
            .iter()
            .map(|&i| file.block(i).bytes("name").unwrap().to_vec())
            .collect()
    }

    #[test]
    fn rewrites_mapped_paths_in_a_copy() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("shot.blend");
        scene(&src);
        let before = fs::read(&src).unwrap();

        let mapping = BTreeMap::from([("//data/a.png".to_string(), "//tex/a.png".to_string())]);
        let out = temp.path().join("shot_remapped.blend");
        let report = remap_file(&src, &out, &mapping, &mut Trace::silent()).unwrap();

        assert_eq!(report.rewritten, 1);
        assert_eq!(report.unmapped, vec!["//data/b.png".to_string()]);
        assert_eq!(image_paths(&out), vec![b"//tex/a.png".to_vec(), b"//data/b.png".to_vec()]);
        assert_eq!(fs::read(&src).unwrap(), before);
    }

    #[test]
    fn refuses_existing_output() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("shot.blend");
        scene(&src);
        let err = remap_file(&src, &src, &BTreeMap::new(), &mut Trace::silent()).unwrap_err();
        assert!(matches!(err, RemapError::OutputExists(_)));
    }

    #[test]
    fn unreadable_source_leaves_no_output() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("junk.blend");
        fs::write(&src, b"junk").unwrap();
        let out = temp.path().join("out.blend");
        assert!(remap_file(&src, &out, &BTreeMap::new(), &mut Trace::silent()).is_err());
        assert!(!out.exists());
    }
}
