//! Streaming SHA-256 file hashing.
//!
//! `FileHasher` computes the digest recorded when a file is quarantined and
//! recomputed when its isolated copy is verified. Files are streamed through
//! a fixed-size buffer so large artifacts are never loaded into memory.

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Default read buffer size (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Hash and size of a file's contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHash {
    /// Lowercase hex SHA-256 digest.
    pub sha256: String,
    /// Number of bytes hashed.
    pub size: u64,
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.sha256)
    }
}

/// Computes SHA-256 digests of files and byte slices.
///
/// # Examples
///
/// ```rust
/// use filesafe::core::FileHasher;
///
/// let hasher = FileHasher::new();
/// let hash = hasher.hash_bytes(b"hello world");
/// assert_eq!(hash.size, 11);
/// ```
#[derive(Debug, Clone)]
pub struct FileHasher {
    buffer_size: usize,
}

impl Default for FileHasher {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl FileHasher {
    /// Creates a hasher with the default buffer size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the read buffer size. Zero is bumped to one byte.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Returns the read buffer size.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Hashes bytes that are already in memory.
    pub fn hash_bytes(&self, data: &[u8]) -> FileHash {
        FileHash {
            sha256: format!("{:x}", Sha256::digest(data)),
            size: data.len() as u64,
        }
    }

    /// Hashes a file on disk by streaming it.
    pub fn hash_file(&self, path: &Path) -> std::io::Result<FileHash> {
        let mut file = std::fs::File::open(path)?;
        self.hash_reader(&mut file)
    }

    /// Hashes everything a reader yields.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> std::io::Result<FileHash> {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.buffer_size];
        let mut size = 0u64;

        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..bytes_read]);
            size += bytes_read as u64;
        }

        Ok(FileHash {
            sha256: format!("{:x}", hasher.finalize()),
            size,
        })
    }
}
