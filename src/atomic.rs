//! Atomic file replacement helpers
//!
//! Every write that a reader could observe goes through a temp file in the destination's own
//! directory, is fsynced, and is then renamed into place. Rename within one directory is
//! atomic, so readers see either the old content or the new content, never a prefix.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique temp path inside `dir`: `.<tag>-<pid>-<n>.tmp`
pub fn temp_path_in(dir: &Path, tag: &str) -> PathBuf {
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(".{}-{}-{}.tmp", tag, std::process::id(), seq))
}

/// Write `bytes` to `path` atomically, creating parent directories as needed
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = parent_dir(path)?;
    fs::create_dir_all(parent)?;
    let temp_path = temp_path_in(parent, "write");

    let write_result = (|| -> io::Result<()> {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();
    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    sync_dir(parent);
    Ok(())
}

/// Stream `reader` into a fresh temp file in `dir`, passing every chunk to `observe`
///
/// Returns the temp path and the number of bytes written. The file is fsynced; on error
/// the temp file is removed.
pub fn spool_to_temp<R, F>(
    dir: &Path,
    tag: &str,
    reader: &mut R,
    mut observe: F,
) -> io::Result<(PathBuf, u64)>
where
    R: Read + ?Sized,
    F: FnMut(&[u8]),
{
    let temp_path = temp_path_in(dir, tag);
    let result = (|| -> io::Result<u64> {
        let mut file = File::create(&temp_path)?;
        let mut buffer = vec![0u8; crate::content::hasher::HASH_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            observe(&buffer[..read]);
            file.write_all(&buffer[..read])?;
            total += read as u64;
        }
        file.sync_all()?;
        Ok(total)
    })();

    match result {
        Ok(total) => Ok((temp_path, total)),
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(e)
        }
    }
}

/// Best-effort fsync of a directory so a completed rename survives power loss
pub fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        if let Ok(handle) = File::open(dir) {
            let _ = handle.sync_all();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
}

fn parent_dir(path: &Path) -> io::Result<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty()).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Path has no parent directory: {}", path.display()),
        )
    })
}
