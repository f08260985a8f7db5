//! core::paths
//!
//! Path handling for paths stored inside scene files.
//!
//! # Stored Paths
//!
//! Scene files store paths as raw bytes. A path beginning with the
//! project-relative marker `//` is relative to the directory of the file
//! that stores it; anything else is used as-is. Files authored on another
//! platform may use either separator, so stored paths are normalized with
//! [`compat_path`] before they are joined onto the local filesystem.
//!
//! # Example
//!
//! ```
//! use scenepack::core::paths::{absolute_path, is_project_relative};
//! use std::path::Path;
//!
//! assert!(is_project_relative(b"//textures/sky.png"));
//!
//! let abs = absolute_path(b"//textures/../sky.png", Path::new("/proj/scenes"));
//! assert_eq!(abs, Path::new("/proj/scenes/sky.png"));
//! ```

use std::borrow::Cow;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Prefix marking a path as relative to the storing file's directory.
pub const PROJECT_RELATIVE: &[u8] = b"//";

/// True if a stored path starts with the project-relative marker.
pub fn is_project_relative(stored: &[u8]) -> bool {
    stored.starts_with(PROJECT_RELATIVE)
}

/// Rewrite separators in a stored path to the local convention.
///
/// On `/` platforms every `\` becomes `/`. Elsewhere `/` becomes `\`,
/// except in a leading `//` marker.
pub fn compat_path(stored: &[u8]) -> Cow<'_, [u8]> {
    if std::path::MAIN_SEPARATOR == '/' {
        if stored.contains(&b'\\') {
            Cow::Owned(
                stored
                    .iter()
                    .map(|&b| if b == b'\\' { b'/' } else { b })
                    .collect(),
            )
        } else {
            Cow::Borrowed(stored)
        }
    } else {
        let keep = if is_project_relative(stored) { 2 } else { 0 };
        let mut out = stored[..keep].to_vec();
        out.extend(
            stored[keep..]
                .iter()
                .map(|&b| if b == b'/' { b'\\' } else { b }),
        );
        Cow::Owned(out)
    }
}

/// Resolve a stored path against the directory of the file storing it.
///
/// The result is separator-normalized and lexically normalized (no `.` or
/// `..` components); the filesystem is not consulted.
pub fn absolute_path(stored: &[u8], basedir: &Path) -> PathBuf {
    let stored = compat_path(stored);
    let joined = if is_project_relative(&stored) {
        basedir.join(bytes_to_path(&stored[PROJECT_RELATIVE.len()..]))
    } else {
        let path = bytes_to_path(&stored);
        if path.is_absolute() {
            path
        } else {
            basedir.join(path)
        }
    };
    normalize(&joined)
}

/// Make `path` absolute against the current directory, then normalize it.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    Ok(normalize(&std::env::current_dir()?.join(path)))
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Final component of a stored path, accepting either separator.
pub fn stored_basename(stored: &[u8]) -> &[u8] {
    match stored.iter().rposition(|&b| b == b'/' || b == b'\\') {
        Some(pos) => &stored[pos + 1..],
        None => stored,
    }
}

/// The stored form of a path relative to a file's directory: `//` + `rel`,
/// always with `/` separators.
pub fn project_relative(rel: &str) -> Vec<u8> {
    let mut out = PROJECT_RELATIVE.to_vec();
    out.extend_from_slice(rel.as_bytes());
    out
}

/// Relative path, with `/` separators, from directory `from` to `to`.
///
/// Both arguments are `/`-separated paths relative to a common root.
///
/// ```
/// use scenepack::core::paths::relative_between;
///
/// assert_eq!(relative_between("", "data/sky.png"), "data/sky.png");
/// assert_eq!(relative_between("data", "data/sky.png"), "sky.png");
/// assert_eq!(relative_between("data", "scene.blend"), "../scene.blend");
/// ```
pub fn relative_between(from: &str, to: &str) -> String {
    let from: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend_from_slice(&to[common..]);
    parts.join("/")
}

/// Convert stored bytes to a local path.
#[cfg(unix)]
pub fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

/// Convert stored bytes to a local path.
#[cfg(not(unix))]
pub fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Convert a local path to bytes for storing.
#[cfg(unix)]
pub fn path_to_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

/// Convert a local path to bytes for storing.
#[cfg(not(unix))]
pub fn path_to_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

/// Render stored bytes for display.
pub fn display_bytes(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_relative_paths_join_basedir() {
        assert_eq!(
            absolute_path(b"//tex/a.png", Path::new("/p/s")),
            PathBuf::from("/p/s/tex/a.png")
        );
        assert_eq!(
            absolute_path(b"//../lib/b.blend", Path::new("/p/s")),
            PathBuf::from("/p/lib/b.blend")
        );
    }

    #[test]
    fn absolute_paths_are_kept() {
        assert_eq!(
            absolute_path(b"/abs/./a.png", Path::new("/p")),
            PathBuf::from("/abs/a.png")
        );
    }

    #[cfg(unix)]
    #[test]
    fn backslashes_become_separators() {
        assert_eq!(&*compat_path(b"//tex\\a.png"), b"//tex/a.png");
        assert_eq!(
            absolute_path(b"//tex\\sub\\a.png", Path::new("/p")),
            PathBuf::from("/p/tex/sub/a.png")
        );
    }

    #[test]
    fn basename_accepts_either_separator() {
        assert_eq!(stored_basename(b"//a/b\\c.png"), b"c.png");
        assert_eq!(stored_basename(b"c.png"), b"c.png");
    }

    #[test]
    fn relative_between_walks_up() {
        assert_eq!(relative_between("a/b", "a/c/x"), "../c/x");
        assert_eq!(relative_between("", "x"), "x");
    }

    #[test]
    fn normalize_keeps_leading_parents() {
        assert_eq!(normalize(Path::new("../a/./b/..")), PathBuf::from("../a"));
    }
}
