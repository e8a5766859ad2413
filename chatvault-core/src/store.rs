use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{Result, VaultError};
use crate::manifest::{FileRecord, Manifest};

/// File-backed manifest store. Holds the full document in memory and
/// rewrites it as a whole on every append; readers never observe a record
/// with a truncated part list.
#[derive(Debug)]
pub struct ManifestStore {
    path: PathBuf,
    manifest: Manifest,
}

impl ManifestStore {
    /// Load the manifest at `path`. A missing or zero-length file is an
    /// empty manifest; the document is created on the first append.
    pub fn open(path: &Path) -> Result<Self> {
        let manifest = match fs::read(path) {
            Ok(bytes) if bytes.is_empty() => Manifest::default(),
            Ok(bytes) => {
                let manifest: Manifest =
                    serde_json::from_slice(&bytes).map_err(|e| VaultError::CorruptManifest {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })?;
                for record in &manifest.files {
                    record.validate().map_err(|e| VaultError::CorruptManifest {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })?;
                }
                manifest
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Manifest::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path: path.to_path_buf(), manifest })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.manifest.files
    }

    pub fn find_by_id(&self, id: &str) -> Option<&FileRecord> {
        self.manifest.files.iter().find(|r| r.id == id)
    }

    /// Append one record and persist the whole document. The in-memory
    /// manifest is rolled back if the rewrite fails.
    pub fn append(&mut self, record: FileRecord) -> Result<()> {
        record.validate()?;
        self.manifest.files.push(record);
        if let Err(e) = self.persist() {
            self.manifest.files.pop();
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        // Exclusive advisory lock on a sibling file for the duration of the
        // rewrite; the lock file itself is never renamed over.
        let lock = File::create(self.path.with_extension("lock"))?;
        lock.lock_exclusive()?;

        let json = serde_json::to_string_pretty(&self.manifest).map_err(std::io::Error::other)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| VaultError::Io(e.error))?;

        lock.unlock()?;
        Ok(())
    }
}
