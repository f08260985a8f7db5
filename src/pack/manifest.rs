//! pack::manifest
//!
//! Remap manifests written next to a pack.
//!
//! - `.bam_deps_remap.json`: for each packed file (by destination), the
//!   rewritten stored paths mapped back to what was stored before.
//! - `.bam_paths_remap.json`: each destination mapped to the absolute path
//!   of the source it was copied from.
//!
//! Both are pretty-printed JSON objects with sorted keys.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEPS_REMAP_FILE: &str = ".bam_deps_remap.json";
pub const PATHS_REMAP_FILE: &str = ".bam_paths_remap.json";

/// Rewritten path → original stored path, per packed file.
pub type DepsRemap = BTreeMap<String, BTreeMap<String, String>>;

/// Destination → original absolute source path.
pub type PathsRemap = BTreeMap<String, String>;

/// Both manifests of one pack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackManifest {
    pub deps_remap: DepsRemap,
    pub paths_remap: PathsRemap,
}

impl PackManifest {
    /// Record that `owner` now stores `new` where it stored `old`.
    pub fn record_rewrite(&mut self, owner: &str, new: &str, old: &str) {
        self.deps_remap
            .entry(owner.to_string())
            .or_default()
            .insert(new.to_string(), old.to_string());
    }

    /// Record the source of a destination.
    pub fn record_source(&mut self, dest: &str, source: &Path) {
        self.paths_remap
            .insert(dest.to_string(), source.to_string_lossy().into_owned());
    }

    /// The two manifests as `(file name, JSON)` pairs.
    pub fn render(&self) -> Result<[(&'static str, String); 2], serde_json::Error> {
        Ok([
            (DEPS_REMAP_FILE, serde_json::to_string_pretty(&self.deps_remap)?),
            (PATHS_REMAP_FILE, serde_json::to_string_pretty(&self.paths_remap)?),
        ])
    }

    /// Write both manifests into `dir`.
    pub fn write_to_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (name, json) in self.render().map_err(io::Error::from)? {
            let path = dir.join(name);
            fs::write(&path, json)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Read both manifests from `dir`; a missing file reads as empty.
    pub fn read_from_dir(dir: &Path) -> io::Result<Self> {
        Ok(Self {
            deps_remap: read_json(&dir.join(DEPS_REMAP_FILE))?,
            paths_remap: read_json(&dir.join(PATHS_REMAP_FILE))?,
        })
    }
}

pub(crate) fn read_json<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> io::Result<T> {
    match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).map_err(io::Error::from),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(err),
    }
}
