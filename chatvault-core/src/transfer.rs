use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, VaultError};
use crate::manifest::{FileRecord, PartRef};
use crate::progress::Progress;
use crate::split;
use crate::storage::DiskStore;
use crate::store::ManifestStore;
use crate::transport::BlobTransport;

fn blake3_file(path: &Path) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut f = fs::File::open(path)?;
    io::copy(&mut f, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Split `source` against the transport's attachment cap, send every part
/// strictly in order, and append one record to the manifest.
///
/// The first failure aborts the whole operation: nothing is appended, and
/// parts already sent stay orphaned on the transport. Scratch parts are
/// deleted once the record is durable; the no-split fast path hands back
/// the source file itself, which is never deleted.
pub fn upload<T: BlobTransport>(
    transport: &mut T,
    store: &mut ManifestStore,
    chat_target: &str,
    source: &Path,
    scratch_dir: &Path,
    progress: &Progress,
) -> Result<FileRecord> {
    let meta = fs::metadata(source).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            VaultError::InvalidArgument(format!("no such file: {}", source.display()))
        }
        _ => VaultError::Io(e),
    })?;
    let size = meta.len();

    progress.set_stage("Splitting");
    let parts = split::split(&DiskStore, source, transport.max_part_size(), scratch_dir)?;

    progress.set_stage("Uploading");
    progress.set_parts_total(parts.len());
    progress.reset_bytes(size);

    let mut part_refs = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let len = fs::metadata(part)?.len();
        let hash_hex = blake3_file(part)?;
        let message_id = transport.send(chat_target, part)?;
        part_refs.push(PartRef {
            order: (i + 1) as u32,
            message_id,
            file_path: part.to_string_lossy().to_string(),
            len,
            hash_hex: Some(hash_hex),
        });
        progress.inc_part();
        progress.add_bytes(len);
    }

    let record = FileRecord {
        id: uuid::Uuid::new_v4().to_string(),
        chat_target: chat_target.to_string(),
        file_path: source.to_string_lossy().to_string(),
        size,
        created_utc: chrono::Utc::now().to_rfc3339(),
        parts: part_refs,
    };
    store.append(record.clone())?;

    // Scratch parts are single-use; the record is already durable, so a
    // failed cleanup must not fail the upload.
    for part in &parts {
        if part != source {
            let _ = fs::remove_file(part);
        }
    }
    Ok(record)
}

/// Fetch every recorded part of `id` in ascending order and reassemble the
/// file at `output` (the record's original path if none is given).
///
/// Part files left over from an earlier attempt are overwritten by the
/// fetch, never reused. A single-part record is fetched straight into the
/// destination with no join step.
pub fn download<T: BlobTransport>(
    transport: &mut T,
    store: &ManifestStore,
    id: &str,
    output: Option<&Path>,
    progress: &Progress,
) -> Result<PathBuf> {
    let record = store.find_by_id(id).ok_or_else(|| VaultError::NotFound(id.to_string()))?;
    let dest = match output {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(&record.file_path),
    };

    progress.set_stage("Fetching");
    progress.set_parts_total(record.parts.len());
    progress.reset_bytes(record.size);

    if let [part] = record.parts.as_slice() {
        fetch_verified(transport, record, part, &dest)?;
        progress.inc_part();
        progress.add_bytes(part.len);
        return Ok(dest);
    }

    let mut part_paths = Vec::with_capacity(record.parts.len());
    for part in &record.parts {
        let path = PathBuf::from(&part.file_path);
        fetch_verified(transport, record, part, &path)?;
        progress.inc_part();
        progress.add_bytes(part.len);
        part_paths.push(path);
    }

    progress.set_stage("Joining");
    split::join(&DiskStore, &dest, &part_paths)
}

/// Fetch one part to `out`, overwriting whatever is there, and check it
/// against the recorded digest when one exists.
fn fetch_verified<T: BlobTransport>(
    transport: &mut T,
    record: &FileRecord,
    part: &PartRef,
    out: &Path,
) -> Result<()> {
    ensure_parent(out)?;
    transport.fetch(&record.chat_target, part.message_id, out)?;
    if let Some(expected) = &part.hash_hex {
        let got = blake3_file(out)?;
        if got != *expected {
            return Err(VaultError::Transport(format!(
                "part {} of {} came back corrupted (hash mismatch)",
                part.order, record.id
            )));
        }
    }
    Ok(())
}
