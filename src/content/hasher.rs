//! Content hashing for backup blobs
//!
//! The algorithm is pluggable: every supported algorithm is listed in [`registry`] under a
//! stable name, and that name is embedded in each blob's path so a later verification pass
//! can tell which algorithm produced a given backup.

use crate::error::ContentStoreError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Size of the read buffer for streaming hashing
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Supported content hash algorithms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha256,
}

impl HashAlgorithm {
    /// Stable name used in configuration and blob paths
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Blake3 => "blake3",
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    /// Length of the hex digest produced by this algorithm
    pub fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Blake3 | HashAlgorithm::Sha256 => 64,
        }
    }

    /// Start a new streaming digest
    pub fn hasher(self) -> Box<dyn ContentDigest> {
        match self {
            HashAlgorithm::Blake3 => Box::new(Blake3Digest(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => Box::new(Sha256Digest(Sha256::new())),
        }
    }

    /// Hash an in-memory buffer
    pub fn hash_bytes(self, content: &[u8]) -> ContentHash {
        let mut digest = self.hasher();
        digest.update(content);
        ContentHash::new(self, digest.finalize_hex())
    }

    /// Hash everything a reader yields, streaming through a fixed buffer
    pub fn hash_reader<R: Read>(self, reader: &mut R) -> std::io::Result<(ContentHash, u64)> {
        let mut digest = self.hasher();
        let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            digest.update(&buffer[..read]);
            total += read as u64;
        }
        Ok((ContentHash::new(self, digest.finalize_hex()), total))
    }

    /// Hash a file on disk
    pub fn hash_file(self, path: &Path) -> Result<ContentHash, ContentStoreError> {
        let mut file =
            std::fs::File::open(path).map_err(|e| ContentStoreError::io(path, e))?;
        let (hash, _) = self
            .hash_reader(&mut file)
            .map_err(|e| ContentStoreError::io(path, e))?;
        Ok(hash)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ContentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        registry()
            .iter()
            .copied()
            .find(|algo| algo.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ContentStoreError::UnknownAlgorithm(s.to_string()))
    }
}

/// All algorithms the content store can read and write
pub fn registry() -> &'static [HashAlgorithm] {
    &[HashAlgorithm::Blake3, HashAlgorithm::Sha256]
}

/// A streaming digest
pub trait ContentDigest: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize_hex(self: Box<Self>) -> String;
}

struct Blake3Digest(blake3::Hasher);

impl ContentDigest for Blake3Digest {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        let Blake3Digest(hasher) = *self;
        hex::encode(hasher.finalize().as_bytes())
    }
}

struct Sha256Digest(Sha256);

impl ContentDigest for Sha256Digest {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        let Sha256Digest(hasher) = *self;
        hex::encode(hasher.finalize())
    }
}

/// A content hash tagged with the algorithm that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash {
    pub algorithm: HashAlgorithm,
    pub hex: String,
}

impl ContentHash {
    pub fn new(algorithm: HashAlgorithm, hex: String) -> Self {
        Self { algorithm, hex }
    }

    /// Parse `algorithm:hex`
    pub fn parse(s: &str) -> Result<Self, ContentStoreError> {
        let (algo, digest) = s
            .split_once(':')
            .ok_or_else(|| ContentStoreError::UnknownAlgorithm(s.to_string()))?;
        let algorithm: HashAlgorithm = algo.parse()?;
        Self::from_hex(algorithm, digest)
    }

    /// Validate and wrap a hex digest for the given algorithm
    pub fn from_hex(algorithm: HashAlgorithm, digest: &str) -> Result<Self, ContentStoreError> {
        let valid = digest.len() == algorithm.hex_len()
            && digest.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase());
        if !valid {
            return Err(ContentStoreError::InvalidLocator(digest.into()));
        }
        Ok(Self::new(algorithm, digest.to_string()))
    }

    /// First two hex characters, used as the shard directory
    pub fn prefix(&self) -> &str {
        &self.hex[..2]
    }

    /// Remaining hex characters after the shard prefix
    pub fn suffix(&self) -> &str {
        &self.hex[2..]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}
