use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, VaultError};

/// Transport-assigned identifier for one sent part.
pub type MessageId = i64;

/// Default per-message attachment cap (5 MB).
pub const DEFAULT_MAX_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Black-box message transport that stores and retrieves opaque byte blobs.
///
/// Implementations must round-trip bytes exactly and keep a returned
/// `MessageId` valid for later fetches. Failures surface as
/// `VaultError::Transport` and are never retried or interpreted here.
pub trait BlobTransport {
    /// Hard per-send size cap the orchestrator splits against.
    fn max_part_size(&self) -> u64;

    /// Upload the file at `part` to `destination`, returning a stable id.
    fn send(&mut self, destination: &str, part: &Path) -> Result<MessageId>;

    /// Write the bytes previously sent under `id` verbatim to `out`,
    /// truncating any existing file there.
    fn fetch(&mut self, destination: &str, id: MessageId, out: &Path) -> Result<()>;
}

/// Directory-backed transport: one subdirectory per destination, one
/// `msg-NNNNNNNN.bin` file per sent part. Ids are allocated as one past the
/// highest id present, so they stay stable across processes.
pub struct DirTransport {
    root: PathBuf,
    max_part_size: u64,
}

impl DirTransport {
    pub fn new(root: impl Into<PathBuf>, max_part_size: u64) -> Self {
        Self { root: root.into(), max_part_size }
    }

    fn dest_dir(&self, destination: &str) -> PathBuf {
        self.root.join(destination)
    }

    fn msg_path(dir: &Path, id: MessageId) -> PathBuf {
        dir.join(format!("msg-{id:08}.bin"))
    }

    fn next_id(dir: &Path) -> Result<MessageId> {
        let mut max_id = 0i64;
        match fs::read_dir(dir) {
            Ok(entries) => {
                for ent in entries {
                    let name = ent?.file_name();
                    let name = name.to_string_lossy();
                    if let Some(num) =
                        name.strip_prefix("msg-").and_then(|s| s.strip_suffix(".bin"))
                    {
                        if let Ok(id) = num.parse::<i64>() {
                            max_id = max_id.max(id);
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(max_id + 1)
    }
}

impl BlobTransport for DirTransport {
    fn max_part_size(&self) -> u64 {
        self.max_part_size
    }

    fn send(&mut self, destination: &str, part: &Path) -> Result<MessageId> {
        let len = fs::metadata(part)?.len();
        if len > self.max_part_size {
            return Err(VaultError::Transport(format!(
                "attachment of {len} bytes exceeds the {} byte cap",
                self.max_part_size
            )));
        }
        let dir = self.dest_dir(destination);
        fs::create_dir_all(&dir)?;
        let id = Self::next_id(&dir)?;
        fs::copy(part, Self::msg_path(&dir, id))?;
        Ok(id)
    }

    fn fetch(&mut self, destination: &str, id: MessageId, out: &Path) -> Result<()> {
        let src = Self::msg_path(&self.dest_dir(destination), id);
        if !src.exists() {
            return Err(VaultError::Transport(format!(
                "no message {id} under destination {destination}"
            )));
        }
        fs::copy(&src, out)?;
        Ok(())
    }
}
