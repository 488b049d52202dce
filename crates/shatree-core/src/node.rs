//! File and directory node types.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};
use crate::hasher::{ContentHash, ContentHasher};
use crate::index::TreeContext;
use crate::path::{self, CURRENT_DIR};

/// Metadata captured once when a file is discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Permission and type bits (`st_mode`; synthesized off Unix).
    pub mode: u32,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl FileMeta {
    /// Snapshot the relevant fields of `metadata`.
    ///
    /// Fails if the platform cannot report a modification time.
    pub fn from_metadata(metadata: &fs::Metadata) -> io::Result<Self> {
        Ok(Self {
            mode: get_mode(metadata),
            size: metadata.len(),
            modified: metadata.modified()?,
        })
    }
}

/// Lookup of the remaining components of a split path.
pub trait Resolve {
    /// Resolve `rest` relative to this node; empty `rest` means the node itself.
    fn resolve<'a, S: AsRef<OsStr>>(&'a self, rest: &[S]) -> Option<NodeRef<'a>>;
}

/// One regular file in the tree.
#[derive(Debug)]
pub struct FileNode {
    name: OsString,
    path: PathBuf,
    full_path: PathBuf,
    root: Weak<TreeContext>,
    meta: FileMeta,
    hash: OnceLock<ContentHash>,
}

impl FileNode {
    /// Create a file node for `path`, relative to the tree's base.
    ///
    /// Fails with [`TreeError::NotAFile`] unless the path is a regular file and
    /// not a symbolic link. Errors from reading its metadata afterwards are
    /// returned as [`TreeError::Io`].
    pub fn new(path: impl Into<PathBuf>, root: &Arc<TreeContext>) -> Result<Self> {
        let path = path.into();
        let full_path = root.base().join(&path);

        if !in_fs(&full_path) {
            return Err(TreeError::not_a_file(path));
        }

        let metadata = fs::metadata(&full_path)?;
        let meta = FileMeta::from_metadata(&metadata)?;
        let name = path.file_name().map(OsStr::to_os_string).unwrap_or_default();

        Ok(Self {
            name,
            path,
            full_path,
            root: Arc::downgrade(root),
            meta,
            hash: OnceLock::new(),
        })
    }

    /// File name (last path component), as stored on disk.
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// Path relative to the tree's base.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute path the node was built from.
    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Metadata snapshot taken at construction.
    pub fn meta(&self) -> &FileMeta {
        &self.meta
    }

    /// Size in bytes at discovery time.
    pub fn size(&self) -> u64 {
        self.meta.size
    }

    /// Hash if it has already been computed.
    pub fn cached_hash(&self) -> Option<ContentHash> {
        self.hash.get().copied()
    }

    /// Content hash, computed on first call and cached afterwards.
    ///
    /// When two callers race, both may read the file but only the first
    /// stored digest is kept and recorded in the tree's hash index.
    pub fn hashval(&self) -> Result<ContentHash> {
        if let Some(hash) = self.hash.get() {
            return Ok(*hash);
        }

        let context = self.root.upgrade();
        let hasher = context
            .as_ref()
            .map(|c| c.hasher())
            .unwrap_or_else(ContentHasher::default);
        let computed = hasher.hash(&self.full_path)?;
        tracing::trace!(path = %self.path.display(), hash = %computed, "hashed file");

        if self.hash.set(computed).is_ok() {
            if let Some(context) = context {
                context.index().record(computed, self.path.clone());
            }
        }
        Ok(self.hash.get().copied().unwrap_or(computed))
    }
}

impl Resolve for FileNode {
    fn resolve<'a, S: AsRef<OsStr>>(&'a self, rest: &[S]) -> Option<NodeRef<'a>> {
        rest.is_empty().then_some(NodeRef::File(self))
    }
}

/// One directory in the tree.
#[derive(Debug)]
pub struct DirNode {
    name: OsString,
    path: PathBuf,
    root: Weak<TreeContext>,
    dirs: Vec<DirNode>,
    files: Vec<FileNode>,
}

impl DirNode {
    /// Create an empty directory node.
    pub fn new(
        name: impl Into<OsString>,
        path: impl Into<PathBuf>,
        root: Weak<TreeContext>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            root,
            dirs: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Create the node standing for the base directory itself.
    pub fn new_root(root: &Arc<TreeContext>) -> Self {
        Self::new(CURRENT_DIR, CURRENT_DIR, Arc::downgrade(root))
    }

    /// Directory name; `.` for the root.
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// Path relative to the tree's base; `.` for the root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if this is the base directory of the tree.
    pub fn is_root(&self) -> bool {
        self.path == Path::new(CURRENT_DIR)
    }

    /// Shared tree context, if the tree is still alive.
    pub fn context(&self) -> Option<Arc<TreeContext>> {
        self.root.upgrade()
    }

    /// Direct child directories, in insertion order.
    pub fn dirs(&self) -> &[DirNode] {
        &self.dirs
    }

    /// Direct child files, in insertion order.
    pub fn files(&self) -> &[FileNode] {
        &self.files
    }

    /// Find a direct child directory by name.
    pub fn dir(&self, name: impl AsRef<OsStr>) -> Option<&DirNode> {
        let name = name.as_ref();
        self.dirs.iter().find(|d| d.name.as_os_str() == name)
    }

    /// Find a direct child file by name.
    pub fn file(&self, name: impl AsRef<OsStr>) -> Option<&FileNode> {
        let name = name.as_ref();
        self.files.iter().find(|f| f.name.as_os_str() == name)
    }

    /// Return the child directory `name`, creating it if needed.
    pub fn add_dir(&mut self, name: impl AsRef<OsStr>) -> &mut DirNode {
        let name = name.as_ref();
        let pos = match self.dirs.iter().position(|d| d.name.as_os_str() == name) {
            Some(pos) => pos,
            None => {
                let child = DirNode::new(
                    name,
                    path::child_path(&self.path, name),
                    self.root.clone(),
                );
                self.dirs.push(child);
                self.dirs.len() - 1
            }
        };
        &mut self.dirs[pos]
    }

    /// Append a file node.
    pub fn add_file(&mut self, file: FileNode) {
        self.files.push(file);
    }

    /// Resolve `rest` through child directories only, for mutation.
    pub fn dir_mut<S: AsRef<OsStr>>(&mut self, rest: &[S]) -> Option<&mut DirNode> {
        match rest.split_first() {
            None => Some(self),
            Some((head, tail)) => self
                .dirs
                .iter_mut()
                .find(|d| d.name.as_os_str() == head.as_ref())
                .and_then(|d| d.dir_mut(tail)),
        }
    }

    /// Depth-first iterator over every file in this subtree.
    pub fn walk_files(&self) -> impl Iterator<Item = &FileNode> + '_ {
        let mut stack: Vec<&DirNode> = self.dirs.iter().rev().collect();
        let mut pending = self.files.iter();
        std::iter::from_fn(move || loop {
            if let Some(file) = pending.next() {
                return Some(file);
            }
            let dir = stack.pop()?;
            stack.extend(dir.dirs.iter().rev());
            pending = dir.files.iter();
        })
    }

    /// Total number of files in this subtree.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.dirs.iter().map(DirNode::file_count).sum::<usize>()
    }

    /// Total number of directories below this one.
    pub fn dir_count(&self) -> usize {
        self.dirs.len() + self.dirs.iter().map(DirNode::dir_count).sum::<usize>()
    }
}

impl Resolve for DirNode {
    fn resolve<'a, S: AsRef<OsStr>>(&'a self, rest: &[S]) -> Option<NodeRef<'a>> {
        let Some((head, tail)) = rest.split_first() else {
            return Some(NodeRef::Dir(self));
        };
        let head = head.as_ref();

        if let Some(dir) = self.dirs.iter().find(|d| d.name.as_os_str() == head) {
            return dir.resolve(tail);
        }
        if let Some(file) = self.files.iter().find(|f| f.name.as_os_str() == head) {
            return file.resolve(tail);
        }
        None
    }
}

/// Borrowed view of any node in the tree.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    /// A directory (including the root).
    Dir(&'a DirNode),
    /// A regular file.
    File(&'a FileNode),
}

impl<'a> NodeRef<'a> {
    /// Node name.
    pub fn name(&self) -> &'a OsStr {
        match self {
            NodeRef::Dir(d) => d.name(),
            NodeRef::File(f) => f.name(),
        }
    }

    /// Path relative to the tree's base.
    pub fn path(&self) -> &'a Path {
        match self {
            NodeRef::Dir(d) => d.path(),
            NodeRef::File(f) => f.path(),
        }
    }

    /// Check if this node is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, NodeRef::Dir(_))
    }

    /// Check if this node is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeRef::File(_))
    }

    /// The directory, if this is one.
    pub fn as_dir(&self) -> Option<&'a DirNode> {
        match self {
            NodeRef::Dir(d) => Some(d),
            NodeRef::File(_) => None,
        }
    }

    /// The file, if this is one.
    pub fn as_file(&self) -> Option<&'a FileNode> {
        match self {
            NodeRef::File(f) => Some(f),
            NodeRef::Dir(_) => None,
        }
    }
}

impl Resolve for NodeRef<'_> {
    fn resolve<'b, S: AsRef<OsStr>>(&'b self, rest: &[S]) -> Option<NodeRef<'b>> {
        match *self {
            NodeRef::Dir(d) => d.resolve(rest),
            NodeRef::File(f) => f.resolve(rest),
        }
    }
}

/// Regular file that is not a symbolic link. Any failure to stat counts as no.
fn in_fs(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_file())
}

#[cfg(unix)]
fn get_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.mode()
}

#[cfg(not(unix))]
fn get_mode(metadata: &fs::Metadata) -> u32 {
    // Regular-file type bits plus rw or r permissions.
    if metadata.permissions().readonly() {
        0o100444
    } else {
        0o100666
    }
}
