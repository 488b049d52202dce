//! The tree root: construction from a walk and path lookup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use shatree_core::path;
use shatree_core::{
    BuildWarning, ContentHasher, DirNode, DuplicateGroup, FileNode, HashIndex, NodeRef, Resolve,
    Result, TreeConfig, TreeContext, TreeError,
};

use crate::walk::{DirWalker, NoFilter, WalkEntry, WalkFilter};

/// Entry point of a tree: owns every node and the shared tree context.
///
/// A root starts out unbuilt, holding only itself. [`RootNode::build`] fills
/// it from the filesystem; afterwards the tree is read-only apart from the
/// per-file hash caches and the hash index.
#[derive(Debug)]
pub struct RootNode {
    config: TreeConfig,
    context: Arc<TreeContext>,
    dir: DirNode,
    warnings: Vec<BuildWarning>,
    built: bool,
}

impl RootNode {
    /// Create an unbuilt root for `base` with the default configuration.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self::with_config(TreeConfig::new(base))
    }

    /// Create an unbuilt root from a configuration.
    pub fn with_config(config: TreeConfig) -> Self {
        let context = Arc::new(TreeContext::new(
            &config.root,
            ContentHasher::new(config.hash_algorithm),
        ));
        let dir = DirNode::new_root(&context);
        Self {
            config,
            context,
            dir,
            warnings: Vec::new(),
            built: false,
        }
    }

    /// Walk the base directory and build the tree.
    ///
    /// `filter` sees every directory triple as soon as the directory is
    /// listed; pass [`NoFilter`](crate::NoFilter) to keep everything.
    /// Directories it prunes are never read. Entries that are not regular
    /// files are skipped and recorded in [`RootNode::warnings`]; any other
    /// error aborts the build.
    pub fn build<F>(&mut self, filter: F) -> Result<()>
    where
        F: WalkFilter + Send + 'static,
    {
        let base = self.canonical_base()?;
        let mut walk = DirWalker::new(&base)
            .max_depth(self.config.max_depth)
            .skip_hidden(self.config.skip_hidden)
            .walk_with(filter);

        self.build_from(&mut walk, NoFilter)?;
        self.warnings.extend(walk.take_warnings());
        Ok(())
    }

    /// Build the tree from pre-order directory triples.
    ///
    /// Paths in the triples are relative to the base directory. A triple whose
    /// directory is not yet in the tree (because a filter pruned an ancestor)
    /// is ignored. Any previous contents are discarded first.
    pub fn build_from<I, F>(&mut self, walk: I, mut filter: F) -> Result<()>
    where
        I: IntoIterator<Item = Result<WalkEntry>>,
        F: WalkFilter,
    {
        self.reset()?;
        let context = Arc::clone(&self.context);
        tracing::info!(base = %context.base().display(), "building tree");

        for entry in walk {
            let Some(entry) = filter.filter(entry?) else {
                continue;
            };

            let components = path::split(&entry.dir);
            let Some(dir) = self.dir.dir_mut(path::strip_current(&components)) else {
                tracing::debug!(dir = %entry.dir.display(), "skipping triple outside the tree");
                continue;
            };

            for name in &entry.subdirs {
                dir.add_dir(name);
            }

            for name in &entry.files {
                let file_path = path::child_path(dir.path(), name);
                match FileNode::new(file_path, &context) {
                    Ok(file) => dir.add_file(file),
                    Err(TreeError::NotAFile { path }) => {
                        tracing::debug!(path = %path.display(), "skipping entry, not a regular file");
                        self.warnings.push(BuildWarning::not_a_file(path));
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        self.built = true;
        tracing::info!(
            files = self.dir.file_count(),
            dirs = self.dir.dir_count(),
            skipped = self.warnings.len(),
            "tree built"
        );
        Ok(())
    }

    /// Look up a node by path relative to the base.
    ///
    /// `""`, `"."` and `"./"` name the root itself. An absolute path is
    /// accepted when it lies under the base.
    pub fn by_path(&self, name: impl AsRef<Path>) -> Result<NodeRef<'_>> {
        let name = name.as_ref();
        let relative = if name.is_absolute() {
            name.strip_prefix(self.base())
                .map_err(|_| TreeError::not_found(name))?
        } else {
            name
        };

        let components = path::split(relative);
        self.dir
            .resolve(path::strip_current(&components))
            .ok_or_else(|| TreeError::not_found(name))
    }

    /// Hash every file in the tree, filling the hash index.
    ///
    /// Returns the number of files hashed. Stops at the first I/O error.
    pub fn hash_all(&self) -> Result<usize> {
        let mut count = 0;
        for file in self.dir.walk_files() {
            file.hashval()?;
            count += 1;
        }
        Ok(count)
    }

    /// Groups of files with identical content.
    ///
    /// Only files hashed so far are covered: the index fills as digests are
    /// computed, not as files are discovered. Call [`RootNode::hash_all`]
    /// first for a complete answer.
    pub fn duplicates(&self) -> Vec<DuplicateGroup> {
        self.context.index().duplicates()
    }

    /// The hash-to-files index.
    pub fn index(&self) -> &HashIndex {
        self.context.index()
    }

    /// The root as a directory node.
    pub fn as_dir(&self) -> &DirNode {
        &self.dir
    }

    /// Directory the tree is anchored at (canonical once built).
    pub fn base(&self) -> &Path {
        self.context.base()
    }

    /// Configuration this root was created with.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Check if [`RootNode::build`] has completed.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Entries skipped during the last build.
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Total number of files in the tree.
    pub fn file_count(&self) -> usize {
        self.dir.file_count()
    }

    /// Total number of directories below the root.
    pub fn dir_count(&self) -> usize {
        self.dir.dir_count()
    }

    fn canonical_base(&self) -> Result<PathBuf> {
        let base = self.config.root.canonicalize()?;
        if !base.is_dir() {
            return Err(TreeError::NotADirectory { path: base });
        }
        Ok(base)
    }

    /// Anchor at the canonical base and drop any previous tree.
    fn reset(&mut self) -> Result<()> {
        let base = self.canonical_base()?;
        self.context = Arc::new(TreeContext::new(
            base,
            ContentHasher::new(self.config.hash_algorithm),
        ));
        self.dir = DirNode::new_root(&self.context);
        self.warnings.clear();
        self.built = false;
        Ok(())
    }
}
