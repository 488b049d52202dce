//! Top-down directory walk producing one triple per directory.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

use globset::{Glob, GlobSet, GlobSetBuilder};
use jwalk::{DirEntry, DirEntryIter, Parallelism, WalkDir};

use shatree_core::path::CURRENT_DIR;
use shatree_core::{BuildWarning, Result, TreeError};

type ReadDirResult = jwalk::Result<DirEntry<((), ())>>;

/// One directory visited by the walk: its path and the names it contains.
///
/// Names are kept exactly as the filesystem returned them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Directory path relative to the walk base; `.` for the base itself.
    pub dir: PathBuf,
    /// Names of child directories.
    pub subdirs: Vec<OsString>,
    /// Names of every other child entry (files, symlinks, special files).
    pub files: Vec<OsString>,
}

impl WalkEntry {
    /// Create an empty triple for `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            subdirs: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Builder-style helper adding child directory names.
    pub fn with_subdirs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.subdirs.extend(names.into_iter().map(Into::into));
        self
    }

    /// Builder-style helper adding file names.
    pub fn with_files<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.files.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Restricts which triples, or which entries of a triple, are visited.
///
/// Returning `None` drops the whole triple and everything below it. Removing
/// names from `subdirs` prunes those directories.
pub trait WalkFilter {
    /// Inspect and optionally rewrite one triple.
    fn filter(&mut self, entry: WalkEntry) -> Option<WalkEntry>;
}

impl<F> WalkFilter for F
where
    F: FnMut(WalkEntry) -> Option<WalkEntry>,
{
    fn filter(&mut self, entry: WalkEntry) -> Option<WalkEntry> {
        self(entry)
    }
}

/// Filter that keeps everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilter;

impl WalkFilter for NoFilter {
    fn filter(&mut self, entry: WalkEntry) -> Option<WalkEntry> {
        Some(entry)
    }
}

/// Drops hidden names and names matching glob patterns.
///
/// Patterns are matched against entry names, not full paths.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    ignore: GlobSet,
    include_hidden: bool,
}

impl PatternFilter {
    /// Build a filter from glob patterns (e.g. `*.log`, `node_modules`).
    pub fn new<I, S>(patterns: I, include_hidden: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|e| TreeError::InvalidConfig {
                message: format!("invalid ignore pattern {pattern:?}: {e}"),
            })?;
            builder.add(glob);
        }
        let ignore = builder.build().map_err(|e| TreeError::InvalidConfig {
            message: e.to_string(),
        })?;

        Ok(Self {
            ignore,
            include_hidden,
        })
    }

    /// Filter that only skips hidden names.
    pub fn hidden_only() -> Self {
        Self {
            ignore: GlobSet::empty(),
            include_hidden: false,
        }
    }

    /// Check whether an entry called `name` is visited.
    pub fn keeps(&self, name: impl AsRef<OsStr>) -> bool {
        let name = name.as_ref();
        if !self.include_hidden && name.as_encoded_bytes().starts_with(b".") {
            return false;
        }
        !self.ignore.is_match(Path::new(name))
    }
}

impl WalkFilter for PatternFilter {
    fn filter(&mut self, mut entry: WalkEntry) -> Option<WalkEntry> {
        entry.subdirs.retain(|name| self.keeps(name));
        entry.files.retain(|name| self.keeps(name));
        Some(entry)
    }
}

/// Serial, name-sorted walk of a directory that never follows links.
#[derive(Debug, Clone)]
pub struct DirWalker {
    base: PathBuf,
    max_depth: Option<usize>,
    skip_hidden: bool,
}

impl DirWalker {
    /// Create a walker rooted at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            max_depth: None,
            skip_hidden: false,
        }
    }

    /// Limit how deep the walk descends; the base is depth 0.
    ///
    /// Directories at the limit still appear in their parent's triple but are
    /// not read.
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Leave out names starting with `.`.
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Directory the walk starts from.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Walk the whole tree.
    pub fn walk(&self) -> Walk {
        self.walk_with(NoFilter)
    }

    /// Walk the tree, passing each triple through `filter` as soon as its
    /// directory has been listed.
    ///
    /// Triples come out in pre-order and directories are read only when the
    /// iterator reaches them. Pruned directories are never read. Unreadable
    /// directories do not stop the walk; they are reported through
    /// [`Walk::take_warnings`].
    pub fn walk_with<F>(&self, filter: F) -> Walk
    where
        F: WalkFilter + Send + 'static,
    {
        let (sender, triples) = mpsc::channel();
        let lister = Lister {
            base: self.base.clone(),
            filter: Mutex::new(filter),
            sender,
        };

        let mut walker = WalkDir::new(&self.base)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(self.skip_hidden)
            .follow_links(false)
            .min_depth(0)
            .process_read_dir(move |depth, dir, _, children| {
                // `None` is the pseudo-listing holding the base entry itself.
                if depth.is_some() {
                    lister.list(dir, children);
                }
            });
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        Walk {
            base: self.base.clone(),
            entries: walker.into_iter(),
            triples,
            warnings: Vec::new(),
        }
    }
}

/// Turns one jwalk directory listing into a filtered triple.
struct Lister<F> {
    base: PathBuf,
    filter: Mutex<F>,
    sender: Sender<WalkEntry>,
}

impl<F: WalkFilter> Lister<F> {
    fn list(&self, dir: &Path, children: &mut Vec<ReadDirResult>) {
        let mut entry = WalkEntry::new(relative(&self.base, dir));
        for child in children.iter().flatten() {
            let name = child.file_name().to_os_string();
            if child.file_type().is_dir() {
                entry.subdirs.push(name);
            } else {
                entry.files.push(name);
            }
        }

        let kept = self
            .filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .filter(entry);

        let Some(kept) = kept else {
            tracing::debug!(dir = %dir.display(), "directory dropped by filter");
            children.retain(|child| child.is_err());
            return;
        };

        // Children left out of the triple are neither yielded nor descended into.
        let subdirs: HashSet<&OsStr> = kept.subdirs.iter().map(OsString::as_os_str).collect();
        let files: HashSet<&OsStr> = kept.files.iter().map(OsString::as_os_str).collect();
        children.retain(|child| match child {
            Ok(child) if child.file_type().is_dir() => subdirs.contains(child.file_name()),
            Ok(child) => files.contains(child.file_name()),
            Err(_) => true,
        });

        // The receiver is gone only when the walk itself was dropped.
        let _ = self.sender.send(kept);
    }
}

/// Path of `path` relative to `base`, `.` for the base itself.
fn relative(base: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(base) {
        Ok(rel) if rel.as_os_str().is_empty() => PathBuf::from(CURRENT_DIR),
        Ok(rel) => rel.to_path_buf(),
        Err(_) => path.to_path_buf(),
    }
}

/// Triples produced by [`DirWalker::walk_with`], in pre-order.
pub struct Walk {
    base: PathBuf,
    entries: DirEntryIter<((), ())>,
    triples: Receiver<WalkEntry>,
    warnings: Vec<BuildWarning>,
}

impl Walk {
    /// Take the read errors met so far.
    ///
    /// Read errors surface while iterating; call this once the walk is done.
    pub fn take_warnings(&mut self) -> Vec<BuildWarning> {
        std::mem::take(&mut self.warnings)
    }

    fn warn(&mut self, path: PathBuf, err: &jwalk::Error) {
        tracing::debug!(path = %path.display(), error = %err, "walk error");
        self.warnings.push(BuildWarning::read_error(path, err));
    }
}

impl Iterator for Walk {
    type Item = Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Ok(triple) = self.triples.try_recv() {
                return Some(Ok(triple));
            }

            let Some(item) = self.entries.next() else {
                return self.triples.try_recv().ok().map(Ok);
            };
            match item {
                Ok(entry) => {
                    if let Some(err) = &entry.read_children_error {
                        let path = relative(&self.base, &entry.path());
                        self.warn(path, err);
                    }
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| relative(&self.base, p))
                        .unwrap_or_default();
                    self.warn(path, &err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn names(list: &[OsString]) -> Vec<&str> {
        list.iter().filter_map(|n| n.to_str()).collect()
    }

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.txt"), "another file here").unwrap();

        temp
    }

    fn collect(walk: Walk) -> Vec<WalkEntry> {
        walk.map(|e| e.unwrap()).collect()
    }

    #[test]
    fn test_walk_yields_preorder_triples() {
        let temp = create_test_tree();
        let base = temp.path().canonicalize().unwrap();

        let mut walk = DirWalker::new(&base).walk();
        let entries: Vec<WalkEntry> = walk.by_ref().map(|e| e.unwrap()).collect();
        assert!(walk.take_warnings().is_empty());

        let dirs: Vec<&Path> = entries.iter().map(|e| e.dir.as_path()).collect();
        assert_eq!(
            dirs,
            vec![
                Path::new("."),
                Path::new("dir1"),
                Path::new("dir1/subdir"),
                Path::new("dir2")
            ]
        );

        assert_eq!(names(&entries[0].subdirs), vec!["dir1", "dir2"]);
        assert_eq!(names(&entries[0].files), vec!["file1.txt"]);
        assert_eq!(names(&entries[1].subdirs), vec!["subdir"]);
        assert_eq!(names(&entries[1].files), vec!["file2.txt"]);
    }

    #[test]
    fn test_directories_are_read_lazily() {
        let temp = create_test_tree();
        let base = temp.path().canonicalize().unwrap();

        let mut walk = DirWalker::new(&base).walk();
        let first = walk.next().unwrap().unwrap();
        assert_eq!(first.dir, Path::new("."));

        // dir2 has not been listed yet, so a file added now is seen.
        fs::write(base.join("dir2/late.txt"), "late").unwrap();
        let rest = collect(walk);
        let dir2 = rest.iter().find(|e| e.dir == Path::new("dir2")).unwrap();
        assert_eq!(names(&dir2.files), vec!["file4.txt", "late.txt"]);
    }

    #[test]
    fn test_pruned_directories_are_not_read() {
        let temp = create_test_tree();
        let base = temp.path().canonicalize().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let record = Arc::clone(&seen);
        let entries = collect(DirWalker::new(&base).walk_with(move |mut entry: WalkEntry| {
            record.lock().unwrap().push(entry.dir.clone());
            entry.subdirs.retain(|d| d != "dir1");
            Some(entry)
        }));

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![PathBuf::from("."), PathBuf::from("dir2")]);
        assert_eq!(entries.len(), 2);
        assert_eq!(names(&entries[0].subdirs), vec!["dir2"]);
    }

    #[test]
    fn test_dropped_triple_stops_descent() {
        let temp = create_test_tree();
        let base = temp.path().canonicalize().unwrap();

        let entries = collect(DirWalker::new(&base).walk_with(|entry: WalkEntry| {
            (entry.dir != Path::new("dir1")).then_some(entry)
        }));

        let dirs: Vec<&Path> = entries.iter().map(|e| e.dir.as_path()).collect();
        assert_eq!(dirs, vec![Path::new("."), Path::new("dir2")]);
    }

    #[test]
    fn test_max_depth_limits_reading() {
        let temp = create_test_tree();
        let base = temp.path().canonicalize().unwrap();

        let entries = collect(DirWalker::new(&base).max_depth(Some(1)).walk());
        assert_eq!(entries.len(), 1);
        assert_eq!(names(&entries[0].subdirs), vec!["dir1", "dir2"]);

        let entries = collect(DirWalker::new(&base).max_depth(Some(2)).walk());
        let dirs: Vec<&Path> = entries.iter().map(|e| e.dir.as_path()).collect();
        assert_eq!(dirs, vec![Path::new("."), Path::new("dir1"), Path::new("dir2")]);
    }

    #[test]
    fn test_skip_hidden() {
        let temp = create_test_tree();
        let base = temp.path().canonicalize().unwrap();
        fs::create_dir(base.join(".git")).unwrap();
        fs::write(base.join(".env"), "secret").unwrap();

        let all = collect(DirWalker::new(&base).walk());
        assert!(names(&all[0].subdirs).contains(&".git"));
        assert!(names(&all[0].files).contains(&".env"));

        let visible = collect(DirWalker::new(&base).skip_hidden(true).walk());
        assert_eq!(names(&visible[0].subdirs), vec!["dir1", "dir2"]);
        assert_eq!(names(&visible[0].files), vec!["file1.txt"]);
        assert!(!visible.iter().any(|e| e.dir == Path::new(".git")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_listed_as_files() {
        let temp = create_test_tree();
        let base = temp.path().canonicalize().unwrap();
        std::os::unix::fs::symlink("dir1", base.join("dirlink")).unwrap();

        let entries = collect(DirWalker::new(&base).walk());
        assert!(entries[0].files.iter().any(|n| n == "dirlink"));
        assert!(!entries[0].subdirs.iter().any(|n| n == "dirlink"));
        assert!(!entries.iter().any(|e| e.dir == Path::new("dirlink")));
    }

    // Filesystems on other Unixes may refuse names that are not UTF-8.
    #[cfg(target_os = "linux")]
    #[test]
    fn test_names_keep_raw_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let base = temp.path().canonicalize().unwrap();
        let bad_file = OsStr::from_bytes(b"bad\xff.txt");
        let bad_dir = OsStr::from_bytes(b"d\xfe");
        fs::write(base.join(bad_file), "x").unwrap();
        fs::create_dir(base.join(bad_dir)).unwrap();
        fs::write(base.join(bad_dir).join("inner.txt"), "y").unwrap();

        let entries = collect(DirWalker::new(&base).walk());
        assert_eq!(entries[0].files, vec![bad_file.to_os_string()]);
        assert_eq!(entries[0].subdirs, vec![bad_dir.to_os_string()]);
        assert_eq!(entries[1].dir, Path::new(bad_dir));
        assert_eq!(names(&entries[1].files), vec!["inner.txt"]);
    }

    #[test]
    fn test_pattern_filter() {
        let mut filter = PatternFilter::new(["*.log", "node_modules"], false).unwrap();
        let entry = WalkEntry::new(".")
            .with_subdirs(["src", "node_modules", ".git"])
            .with_files(["a.txt", "debug.log", ".env"]);

        let kept = filter.filter(entry).unwrap();
        assert_eq!(names(&kept.subdirs), vec!["src"]);
        assert_eq!(names(&kept.files), vec!["a.txt"]);
    }

    #[test]
    fn test_pattern_filter_rejects_bad_glob() {
        let err = PatternFilter::new(["a[b"], true).unwrap_err();
        assert!(matches!(err, TreeError::InvalidConfig { .. }));
    }

    #[test]
    fn test_closure_filter() {
        let mut drop_all = |_entry: WalkEntry| -> Option<WalkEntry> { None };
        assert!(drop_all.filter(WalkEntry::new(".")).is_none());
        assert!(NoFilter.filter(WalkEntry::new(".")).is_some());
    }
}
