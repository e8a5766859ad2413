use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, VaultError};

/// Byte storage the part codec runs against: sized blobs addressed by
/// path, with ranged reads. Disk in production; tests can substitute the
/// in-memory implementation.
pub trait PartStore {
    /// Size of the blob at `path`; a missing blob is an `Io` error with
    /// kind `NotFound`.
    fn len(&self, path: &Path) -> Result<u64>;

    /// Read up to `max_len` bytes starting at `offset`.
    fn read_at(&self, path: &Path, offset: u64, max_len: u64) -> Result<Vec<u8>>;

    /// Create or truncate the blob at `path`, creating parent directories
    /// as needed.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Append to the blob at `path`, creating it if absent.
    fn append(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    fn remove(&self, path: &Path) -> Result<()>;
}

/// The real filesystem.
pub struct DiskStore;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

impl PartStore for DiskStore {
    fn len(&self, path: &Path) -> Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn read_at(&self, path: &Path, offset: u64, max_len: u64) -> Result<Vec<u8>> {
        let mut f = fs::File::open(path)?;
        f.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::new();
        f.take(max_len).read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        ensure_parent(path)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    fn append(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        ensure_parent(path)?;
        let mut f = OpenOptions::new().create(true).append(true).open(path)?;
        f.write_all(bytes)?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }
}

/// Path-keyed blobs in memory, for tests.
#[derive(Default)]
pub struct MemStore {
    blobs: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

fn not_found(path: &Path) -> VaultError {
    VaultError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no blob at {}", path.display()),
    ))
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartStore for MemStore {
    fn len(&self, path: &Path) -> Result<u64> {
        let blobs = self.blobs.lock().unwrap();
        blobs.get(path).map(|b| b.len() as u64).ok_or_else(|| not_found(path))
    }

    fn read_at(&self, path: &Path, offset: u64, max_len: u64) -> Result<Vec<u8>> {
        let blobs = self.blobs.lock().unwrap();
        let blob = blobs.get(path).ok_or_else(|| not_found(path))?;
        let start = (offset.min(blob.len() as u64)) as usize;
        let end = start.saturating_add(max_len.min(blob.len() as u64) as usize).min(blob.len());
        Ok(blob[start..end].to_vec())
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.blobs.lock().unwrap().insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn append(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut blobs = self.blobs.lock().unwrap();
        blobs.entry(path.to_path_buf()).or_default().extend_from_slice(bytes);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.blobs.lock().unwrap().remove(path).map(|_| ()).ok_or_else(|| not_found(path))
    }
}
