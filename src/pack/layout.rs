//! pack::layout
//!
//! Destination names for packed files.
//!
//! The root lands at the top of the output under its requested name. Every
//! other file lands flat in the data subdirectory under its own basename; a
//! basename already taken by a different source gets a numeric suffix
//! (`sky.png`, `sky_1.png`, ...). Destinations are `/`-separated and
//! relative to the output root.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Source-to-destination assignment for one pack.
#[derive(Debug, Clone)]
pub struct Layout {
    subdir: String,
    assigned: BTreeMap<PathBuf, String>,
    taken: BTreeSet<String>,
}

impl Layout {
    /// A layout with `root` already placed at `root_name`.
    pub fn new(root: &Path, root_name: &str, subdir: &str) -> Self {
        let mut layout = Self {
            subdir: subdir.trim_matches('/').to_string(),
            assigned: BTreeMap::new(),
            taken: BTreeSet::new(),
        };
        layout.assign(root, root_name.to_string());
        layout
    }

    /// The destination of `source`, assigning one on first use.
    pub fn destination(&mut self, source: &Path) -> String {
        if let Some(dest) = self.assigned.get(source) {
            return dest.clone();
        }
        let basename = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let dest = self.free_name(&basename);
        self.assign(source, dest.clone());
        dest
    }

    /// The destination already assigned to `source`.
    pub fn get(&self, source: &Path) -> Option<&str> {
        self.assigned.get(source).map(String::as_str)
    }

    /// Directory part of a destination (`""` for the output root).
    pub fn dir_of(dest: &str) -> &str {
        dest.rfind('/').map_or("", |pos| &dest[..pos])
    }

    fn assign(&mut self, source: &Path, dest: String) {
        self.taken.insert(dest.clone());
        self.assigned.insert(source.to_path_buf(), dest);
    }

    fn free_name(&self, basename: &str) -> String {
        let join = |name: &str| {
            if self.subdir.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", self.subdir, name)
            }
        };
        let candidate = join(basename);
        if !self.taken.contains(&candidate) {
            return candidate;
        }
        let (stem, ext) = match basename.rfind('.') {
            Some(pos) if pos > 0 => basename.split_at(pos),
            _ => (basename, ""),
        };
        (1..)
            .map(|n| join(&format!("{}_{}{}", stem, n, ext)))
            .find(|name| !self.taken.contains(name))
            .unwrap_or(candidate)
    }
}
