//! Tree construction for shatree.
//!
//! This crate walks a directory top-down and builds the in-memory tree
//! defined in `shatree-core`, one directory triple at a time.
//!
//! # Overview
//!
//! - **`DirWalker`** produces `(directory, subdirectories, files)` triples
//!   in pre-order using jwalk, reading each directory only when reached.
//! - **`WalkFilter`** restricts what is visited; closures work directly and
//!   `PatternFilter` handles hidden names and glob patterns.
//! - **`RootNode`** consumes the triples, skips entries that are not regular
//!   files, and answers path lookups.
//!
//! # Example
//!
//! ```rust,no_run
//! use shatree_scan::{NoFilter, RootNode};
//!
//! let mut root = RootNode::new("/path/to/scan");
//! root.build(NoFilter).unwrap();
//!
//! let node = root.by_path("src/main.rs").unwrap();
//! if let Some(file) = node.as_file() {
//!     println!("{}  {}", file.hashval().unwrap(), file.path().display());
//! }
//! ```
//!
//! # Filtering
//!
//! Skip hidden directories the way a top-down walk would, by pruning them:
//!
//! ```rust,no_run
//! use shatree_scan::{RootNode, WalkEntry};
//!
//! let mut root = RootNode::new(".");
//! root.build(|mut entry: WalkEntry| {
//!     entry.subdirs.retain(|name| !name.as_encoded_bytes().starts_with(b"."));
//!     Some(entry)
//! })
//! .unwrap();
//! ```

mod root;
mod walk;

pub use root::RootNode;
pub use walk::{DirWalker, NoFilter, PatternFilter, Walk, WalkEntry, WalkFilter};

// Re-export core types for convenience
pub use shatree_core::{
    BuildWarning, ContentHash, DirNode, DuplicateGroup, FileMeta, FileNode, HashAlgorithm,
    NodeRef, Resolve, TreeConfig, TreeError, WarningKind,
};
