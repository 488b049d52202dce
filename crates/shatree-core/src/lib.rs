//! Core types for shatree.
//!
//! This crate provides the tree model: file and directory nodes, path
//! splitting and lookup, and SHA-1 content hashing with a per-file cache.
//! Building a tree from the filesystem lives in `shatree-scan`.

mod config;
mod error;
mod hasher;
mod index;
mod node;
pub mod path;

pub use config::{HashAlgorithm, TreeConfig, TreeConfigBuilder};
pub use error::{BuildWarning, Result, TreeError, WarningKind};
pub use hasher::{ContentHash, ContentHasher};
pub use index::{DuplicateGroup, HashIndex, TreeContext};
pub use node::{DirNode, FileMeta, FileNode, NodeRef, Resolve};
