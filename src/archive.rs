//! archive
//!
//! Zip archives for packs, commits and checkouts.
//!
//! Entry names are always `/`-separated paths relative to the archive root.
//! Extraction refuses entries that would land outside the destination.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Errors from archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("i/o error on '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid archive '{path}': {source}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("archive '{path}' has an unsafe entry '{entry}'")]
    UnsafeEntry { path: PathBuf, entry: String },
}

/// Streaming writer for a new archive.
pub struct ArchiveWriter {
    path: PathBuf,
    zip: ZipWriter<File>,
    entries: Vec<String>,
}

impl ArchiveWriter {
    /// Create the archive at `path`, replacing any existing file.
    pub fn create(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::create(path).map_err(|source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            zip: ZipWriter::new(file),
            entries: Vec::new(),
        })
    }

    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
    }

    fn zip_err(&self, source: zip::result::ZipError) -> ArchiveError {
        ArchiveError::Zip {
            path: self.path.clone(),
            source,
        }
    }

    /// Add the contents of `source` as `name`.
    pub fn add_file(&mut self, name: &str, source: &Path) -> Result<(), ArchiveError> {
        let mut input = File::open(source).map_err(|err| ArchiveError::Io {
            path: source.to_path_buf(),
            source: err,
        })?;
        self.zip
            .start_file(name, Self::options())
            .map_err(|err| self.zip_err(err))?;
        io::copy(&mut input, &mut self.zip).map_err(|err| ArchiveError::Io {
            path: source.to_path_buf(),
            source: err,
        })?;
        self.entries.push(name.to_string());
        Ok(())
    }

    /// Add an in-memory entry.
    pub fn add_bytes(&mut self, name: &str, data: &[u8]) -> Result<(), ArchiveError> {
        self.zip
            .start_file(name, Self::options())
            .map_err(|err| self.zip_err(err))?;
        self.zip.write_all(data).map_err(|source| ArchiveError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.entries.push(name.to_string());
        Ok(())
    }

    /// Names added so far, in order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Write the central directory and close the file.
    pub fn finish(self) -> Result<Vec<String>, ArchiveError> {
        let path = self.path;
        let file = self.zip.finish().map_err(|source| ArchiveError::Zip {
            path: path.clone(),
            source,
        })?;
        file.sync_all()
            .map_err(|source| ArchiveError::Io { path, source })?;
        Ok(self.entries)
    }
}

/// Entry names of an archive, in archive order.
pub fn list_entries(archive: &Path) -> Result<Vec<String>, ArchiveError> {
    let mut zip = open(archive)?;
    let mut names = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let entry = zip.by_index(i).map_err(|source| ArchiveError::Zip {
            path: archive.to_path_buf(),
            source,
        })?;
        names.push(entry.name().to_string());
    }
    Ok(names)
}

/// Extract every entry of `archive` under `dest`, returning the files written.
pub fn extract(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut zip = open(archive)?;
    let mut written = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|source| ArchiveError::Zip {
            path: archive.to_path_buf(),
            source,
        })?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(ArchiveError::UnsafeEntry {
                path: archive.to_path_buf(),
                entry: entry.name().to_string(),
            });
        };
        let target = dest.join(relative);
        let io_err = |source| ArchiveError::Io {
            path: target.clone(),
            source,
        };
        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(io_err)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut out = File::create(&target).map_err(io_err)?;
        io::copy(&mut entry, &mut out).map_err(io_err)?;
        written.push(target);
    }
    Ok(written)
}

fn open(archive: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(archive).map_err(|source| ArchiveError::Io {
        path: archive.to_path_buf(),
        source,
    })?;
    ZipArchive::new(file).map_err(|source| ArchiveError::Zip {
        path: archive.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_list_extract() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.txt");
        fs::write(&src, b"alpha").unwrap();

        let path = temp.path().join("out.zip");
        let mut writer = ArchiveWriter::create(&path).unwrap();
        writer.add_file("scene.blend", &src).unwrap();
        writer.add_bytes("data/b.txt", b"beta").unwrap();
        let entries = writer.finish().unwrap();
        assert_eq!(entries, vec!["scene.blend", "data/b.txt"]);

        assert_eq!(list_entries(&path).unwrap(), entries);

        let dest = temp.path().join("x");
        let files = extract(&path, &dest).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(fs::read(dest.join("data/b.txt")).unwrap(), b"beta");
        assert_eq!(fs::read(dest.join("scene.blend")).unwrap(), b"alpha");
    }

    #[test]
    fn garbage_is_not_an_archive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.zip");
        fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(
            list_entries(&path),
            Err(ArchiveError::Zip { .. })
        ));
    }
}
