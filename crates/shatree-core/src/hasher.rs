//! Streaming content hashing.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::config::HashAlgorithm;

/// Chunk size multiplier applied to the hash block size.
const CHUNK_BLOCKS: usize = 128;

/// SHA-1 content hash of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 20]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Computes file digests by streaming fixed-size chunks.
///
/// Holds no state between calls; cloning is free.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl ContentHasher {
    /// Create a hasher for the given algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Algorithm this hasher uses.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Bytes read per chunk.
    pub fn chunk_size(&self) -> usize {
        CHUNK_BLOCKS * self.algorithm.block_size()
    }

    /// Hash the contents of the file at `path`.
    ///
    /// The file is closed before returning, on success and on error.
    pub fn hash(&self, path: impl AsRef<Path>) -> io::Result<ContentHash> {
        let file = File::open(path.as_ref())?;
        self.hash_reader(file)
    }

    /// Hash everything `reader` yields until end of stream.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<ContentHash> {
        match self.algorithm {
            HashAlgorithm::Sha1 => {
                let mut hasher = Sha1::new();
                let mut buffer = vec![0u8; self.chunk_size()];

                loop {
                    let bytes_read = match reader.read(&mut buffer) {
                        Ok(0) => break,
                        Ok(n) => n,
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e),
                    };
                    hasher.update(&buffer[..bytes_read]);
                }

                let mut digest = [0u8; 20];
                digest.copy_from_slice(&hasher.finalize());
                Ok(ContentHash::new(digest))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_hex() {
        let hash = ContentHash::new([0xab; 20]);
        assert_eq!(hash.to_hex().len(), 40);
        assert!(hash.to_hex().starts_with("abab"));
        assert_eq!(hash.to_string(), hash.to_hex());
    }

    #[test]
    fn test_chunk_size() {
        assert_eq!(ContentHasher::default().chunk_size(), 8192);
    }

    #[test]
    fn test_hash_known_vectors() {
        let hasher = ContentHasher::default();
        let empty = hasher.hash_reader(&b""[..]).unwrap();
        assert_eq!(empty.to_hex(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");

        let hello = hasher.hash_reader(&b"hello"[..]).unwrap();
        assert_eq!(hello.to_hex(), "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
    }

    #[test]
    fn test_hash_file_spanning_chunks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big.bin");
        let content: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &content).unwrap();

        let hash = ContentHasher::default().hash(&path).unwrap();
        let expected = Sha1::digest(&content);
        assert_eq!(&hash.as_bytes()[..], &expected[..]);
    }

    #[test]
    fn test_hash_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = ContentHasher::default()
            .hash(temp.path().join("missing"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
