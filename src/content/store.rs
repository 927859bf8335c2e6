//! Content-addressed blob storage
//!
//! Backups are stored on the filesystem using a content-addressed path structure:
//! `{base}/blobs/{algorithm}/{hex[0..2]}/{hex[2..]}`
//!
//! This structure:
//! - Bounds directory fan-out (git-style two character shards)
//! - Deduplicates (same content = same path, written at most once)
//! - Names the hash algorithm of every blob, so verification needs no side table

use crate::atomic;
use crate::concurrency::KeyLockManager;
use crate::content::hasher::{ContentHash, HashAlgorithm};
use crate::error::ContentStoreError;
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

const BLOBS_DIR: &str = "blobs";

/// Result of a store request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub content_hash: ContentHash,
    pub backup_path: PathBuf,
    pub size: u64,
    /// `false` when the blob already existed and nothing was written
    pub newly_written: bool,
}

/// Reader over a stored blob
pub type BlobReader = BufReader<File>;

/// Content-addressed backup store
pub struct ContentStore {
    root: PathBuf,
    algorithm: HashAlgorithm,
    locks: KeyLockManager,
    writes: AtomicU64,
}

impl ContentStore {
    /// Open (creating if needed) the blob store under `base_dir/blobs`
    pub fn new<P: AsRef<Path>>(
        base_dir: P,
        algorithm: HashAlgorithm,
    ) -> Result<Self, ContentStoreError> {
        let root = base_dir.as_ref().join(BLOBS_DIR);
        fs::create_dir_all(&root).map_err(|e| ContentStoreError::io(&root, e))?;
        Ok(Self {
            root,
            algorithm,
            locks: KeyLockManager::new(),
            writes: AtomicU64::new(0),
        })
    }

    /// Root of the blob tree (`{base}/blobs`)
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Algorithm used for new blobs
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Number of blobs physically written by this instance
    pub fn blobs_written(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Compute the blob path for a content hash
    pub fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.root
            .join(hash.algorithm.name())
            .join(hash.prefix())
            .join(hash.suffix())
    }

    /// Check whether a blob for this hash exists
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.blob_path(hash).is_file()
    }

    /// Recover the content hash a backup path was derived from
    pub fn locate(&self, backup_path: &Path) -> Result<ContentHash, ContentStoreError> {
        let invalid = || ContentStoreError::InvalidLocator(backup_path.to_path_buf());
        let relative = backup_path.strip_prefix(&self.root).map_err(|_| invalid())?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| match c {
                Component::Normal(part) => part.to_str().ok_or_else(invalid),
                _ => Err(invalid()),
            })
            .collect::<Result<_, _>>()?;
        let [algo, prefix, suffix] = parts.as_slice() else {
            return Err(invalid());
        };
        let algorithm: HashAlgorithm = algo.parse()?;
        ContentHash::from_hex(algorithm, &format!("{}{}", prefix, suffix)).map_err(|_| invalid())
    }

    /// Store the content of a file on disk
    pub fn store_file(&self, path: &Path) -> Result<StoredBlob, ContentStoreError> {
        let mut file = File::open(path).map_err(|e| ContentStoreError::io(path, e))?;
        self.store_open_file(&mut file, path)
    }

    /// Store the content of an already open file
    ///
    /// Pass 1 hashes the file. If the blob exists the call returns without further I/O.
    /// Otherwise pass 2 copies the file into a temp blob while hashing again; a digest
    /// that differs from pass 1 means the file changed underneath us and the store fails.
    pub fn store_open_file(
        &self,
        file: &mut File,
        source: &Path,
    ) -> Result<StoredBlob, ContentStoreError> {
        file.seek(SeekFrom::Start(0))
            .map_err(|e| ContentStoreError::io(source, e))?;
        let (hash, size) = self
            .algorithm
            .hash_reader(file)
            .map_err(|e| ContentStoreError::io(source, e))?;

        let key = hash.to_string();
        self.locks
            .with_write_lock(&key, || self.write_from_file(file, source, hash, size))
    }

    /// Second pass of `store_open_file`; caller holds the hash lock
    fn write_from_file(
        &self,
        file: &mut File,
        source: &Path,
        hash: ContentHash,
        size: u64,
    ) -> Result<StoredBlob, ContentStoreError> {
        let blob_path = self.blob_path(&hash);
        if blob_path.is_file() {
            trace!(hash = %hash, source = %source.display(), "Blob already stored");
            return Ok(StoredBlob {
                content_hash: hash,
                backup_path: blob_path,
                size,
                newly_written: false,
            });
        }

        file.seek(SeekFrom::Start(0))
            .map_err(|e| ContentStoreError::io(source, e))?;
        let shard = self.shard_dir(&hash)?;
        let mut digest = self.algorithm.hasher();
        let (temp_path, written) = atomic::spool_to_temp(&shard, "blob", file, |chunk| {
            digest.update(chunk)
        })
        .map_err(|e| ContentStoreError::io(source, e))?;

        let second = ContentHash::new(self.algorithm, digest.finalize_hex());
        if second != hash || written != size {
            let _ = fs::remove_file(&temp_path);
            return Err(ContentStoreError::SourceChanged(source.to_path_buf()));
        }

        self.publish(&temp_path, &blob_path)?;
        Ok(StoredBlob {
            content_hash: hash,
            backup_path: blob_path,
            size,
            newly_written: true,
        })
    }

    /// Store everything a reader yields
    ///
    /// The reader may not be seekable, so the content is spooled into a temp file while it
    /// is hashed; the temp file is discarded if the blob already exists.
    pub fn store<R: Read>(&self, reader: &mut R) -> Result<StoredBlob, ContentStoreError> {
        let staging = self.root.join(self.algorithm.name());
        fs::create_dir_all(&staging).map_err(|e| ContentStoreError::io(&staging, e))?;

        let mut digest = self.algorithm.hasher();
        let (temp_path, size) =
            atomic::spool_to_temp(&staging, "spool", reader, |chunk| digest.update(chunk))
                .map_err(|e| ContentStoreError::io(&staging, e))?;
        let hash = ContentHash::new(self.algorithm, digest.finalize_hex());
        let key = hash.to_string();
        self.locks
            .with_write_lock(&key, || self.publish_spooled(&temp_path, hash, size))
    }

    /// Move a spooled temp file into its shard; caller holds the hash lock
    fn publish_spooled(
        &self,
        temp_path: &Path,
        hash: ContentHash,
        size: u64,
    ) -> Result<StoredBlob, ContentStoreError> {
        let blob_path = self.blob_path(&hash);
        if blob_path.is_file() {
            let _ = fs::remove_file(temp_path);
            return Ok(StoredBlob {
                content_hash: hash,
                backup_path: blob_path,
                size,
                newly_written: false,
            });
        }

        let shard = self.shard_dir(&hash)?;
        let shard_temp = atomic::temp_path_in(&shard, "blob");
        fs::rename(temp_path, &shard_temp).map_err(|e| {
            let _ = fs::remove_file(temp_path);
            ContentStoreError::io(&shard_temp, e)
        })?;
        self.publish(&shard_temp, &blob_path)?;
        Ok(StoredBlob {
            content_hash: hash,
            backup_path: blob_path,
            size,
            newly_written: true,
        })
    }

    /// Store an in-memory buffer
    pub fn store_bytes(&self, content: &[u8]) -> Result<StoredBlob, ContentStoreError> {
        let mut reader = content;
        self.store(&mut reader)
    }

    /// Open a stored blob for reading
    ///
    /// With `verify`, the blob is first re-hashed with the algorithm named by its path and
    /// compared against the path-derived hash.
    pub fn retrieve(
        &self,
        backup_path: &Path,
        verify: bool,
    ) -> Result<BlobReader, ContentStoreError> {
        let expected = self.locate(backup_path)?;
        if verify {
            let actual = expected.algorithm.hash_file(backup_path)?;
            if actual != expected {
                return Err(ContentStoreError::HashMismatch {
                    algorithm: expected.algorithm.name().to_string(),
                    expected: expected.hex,
                    actual: actual.hex,
                });
            }
        }
        let file = File::open(backup_path).map_err(|e| ContentStoreError::io(backup_path, e))?;
        Ok(BufReader::new(file))
    }

    /// Re-hash a stored blob and compare against its path-derived hash
    pub fn verify(&self, backup_path: &Path) -> Result<bool, ContentStoreError> {
        let expected = self.locate(backup_path)?;
        let actual = expected.algorithm.hash_file(backup_path)?;
        Ok(actual == expected)
    }

    fn shard_dir(&self, hash: &ContentHash) -> Result<PathBuf, ContentStoreError> {
        let shard = self.root.join(hash.algorithm.name()).join(hash.prefix());
        fs::create_dir_all(&shard).map_err(|e| ContentStoreError::io(&shard, e))?;
        Ok(shard)
    }

    /// Rename a finished temp blob into place; caller holds the hash lock
    fn publish(&self, temp_path: &Path, blob_path: &Path) -> Result<(), ContentStoreError> {
        fs::rename(temp_path, blob_path).map_err(|e| {
            let _ = fs::remove_file(temp_path);
            ContentStoreError::io(blob_path, e)
        })?;
        if let Some(shard) = blob_path.parent() {
            atomic::sync_dir(shard);
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        debug!(blob = %blob_path.display(), "Blob written");
        Ok(())
    }
}
