//! Splitting paths into component names and joining them back.

use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

/// Name of the "this directory" sentinel used for the tree root.
pub const CURRENT_DIR: &str = ".";

/// Split a path into its component names, root to leaf.
///
/// An empty path or a bare root (`/`) yields no components. A leading `.` is
/// kept so callers can recognise a path anchored at the current directory;
/// redundant separators, trailing slashes and interior `.` are dropped.
/// Names keep their raw bytes; nothing is converted to UTF-8.
pub fn split(path: impl AsRef<Path>) -> Vec<OsString> {
    path.as_ref()
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_os_string()),
            Component::CurDir => Some(OsString::from(CURRENT_DIR)),
            Component::ParentDir => Some(OsString::from("..")),
            Component::RootDir | Component::Prefix(_) => None,
        })
        .collect()
}

/// Join component names back into a path.
///
/// Returns `None` for an empty sequence; see [`join_or_current`].
pub fn join<S: AsRef<OsStr>>(components: &[S]) -> Option<PathBuf> {
    let (first, rest) = components.split_first()?;
    Some(
        rest.iter()
            .fold(PathBuf::from(first.as_ref()), |acc, c| acc.join(c.as_ref())),
    )
}

/// Like [`join`], mapping the empty sequence to `.`.
pub fn join_or_current<S: AsRef<OsStr>>(components: &[S]) -> PathBuf {
    join(components).unwrap_or_else(|| PathBuf::from(CURRENT_DIR))
}

/// Relative path of `name` inside `parent`, where `.` is the empty prefix.
pub fn child_path(parent: &Path, name: impl AsRef<OsStr>) -> PathBuf {
    let name = name.as_ref();
    if parent.as_os_str().is_empty() || parent == Path::new(CURRENT_DIR) {
        PathBuf::from(name)
    } else {
        parent.join(name)
    }
}

/// Drop a leading `.` component, as produced by [`split`] on `./x`.
pub fn strip_current<S: AsRef<OsStr>>(components: &[S]) -> &[S] {
    match components.split_first() {
        Some((first, rest)) if first.as_ref() == OsStr::new(CURRENT_DIR) => rest,
        _ => components,
    }
}
