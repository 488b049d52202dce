//! Tree configuration types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::TreeError;

/// Digest function used for file contents.
///
/// SHA-1 is the only supported algorithm; the identifier exists so that a
/// configuration file can name it explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-1, 20-byte digest.
    #[default]
    Sha1,
}

impl HashAlgorithm {
    /// Internal block size of the hash function in bytes.
    pub fn block_size(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 64,
        }
    }

    /// Length of the finalized digest in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
        }
    }

    /// Identifier as used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(HashAlgorithm::Sha1),
            other => Err(TreeError::InvalidConfig {
                message: format!("unsupported hash algorithm: {other}"),
            }),
        }
    }
}

/// Configuration for building a tree.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct TreeConfig {
    /// Base directory of the scan.
    pub root: PathBuf,

    /// Digest used for file contents.
    #[builder(default)]
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,

    /// Maximum depth to descend (None = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Leave out hidden files and directories while walking.
    #[builder(default)]
    #[serde(default)]
    pub skip_hidden: bool,
}

impl TreeConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        Ok(())
    }
}

impl TreeConfig {
    /// Create a new tree config builder.
    pub fn builder() -> TreeConfigBuilder {
        TreeConfigBuilder::default()
    }

    /// Create a simple config for a base path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            hash_algorithm: HashAlgorithm::default(),
            max_depth: None,
            skip_hidden: false,
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = TreeConfig::builder()
            .root("/home/user")
            .hash_algorithm(HashAlgorithm::Sha1)
            .max_depth(Some(3))
            .skip_hidden(true)
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/home/user"));
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha1);
        assert_eq!(config.max_depth, Some(3));
        assert!(config.skip_hidden);
    }

    #[test]
    fn test_builder_rejects_empty_root() {
        assert!(TreeConfig::builder().root("").build().is_err());
        assert!(TreeConfig::builder().build().is_err());
    }

    #[test]
    fn test_default_algorithm_is_sha1() {
        let config = TreeConfig::new("/data");
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha1);
        assert_eq!(config.max_depth, None);
        assert!(!config.skip_hidden);
        assert_eq!(config.hash_algorithm.block_size(), 64);
        assert_eq!(config.hash_algorithm.digest_len(), 20);
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("SHA1".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha1);
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }
}
