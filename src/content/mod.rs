//! Content-addressed backup storage and its hash registry.

pub mod hasher;
pub mod store;

pub use hasher::{registry, ContentDigest, ContentHash, HashAlgorithm};
pub use store::{BlobReader, ContentStore, StoredBlob};
