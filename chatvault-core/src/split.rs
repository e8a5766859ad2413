use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, VaultError};
use crate::storage::PartStore;

/// Split `source` into contiguous parts of at most `max_part_size` bytes,
/// returned in reassembly order.
///
/// A file at or under the limit (including an empty file) is returned
/// as-is: the single element is the original path and nothing is written to
/// `scratch_dir`. Otherwise every part is exactly `max_part_size` bytes
/// except the last, which holds the remainder. Parts are named
/// `{file_name}.partN` with N starting at 1.
pub fn split<S: PartStore>(
    store: &S,
    source: &Path,
    max_part_size: u64,
    scratch_dir: &Path,
) -> Result<Vec<PathBuf>> {
    if max_part_size == 0 {
        return Err(VaultError::InvalidArgument("max part size must be positive".into()));
    }
    let size = match store.len(source) {
        Ok(n) => n,
        Err(VaultError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            return Err(VaultError::InvalidArgument(format!(
                "no such file: {}",
                source.display()
            )))
        }
        Err(e) => return Err(e),
    };
    if size <= max_part_size {
        return Ok(vec![source.to_path_buf()]);
    }

    let file_name = source
        .file_name()
        .ok_or_else(|| {
            VaultError::InvalidArgument(format!("no file name: {}", source.display()))
        })?
        .to_string_lossy()
        .to_string();

    let mut parts = Vec::with_capacity(size.div_ceil(max_part_size) as usize);
    let mut offset = 0u64;
    let mut num = 1u32;
    while offset < size {
        let chunk = store.read_at(source, offset, max_part_size)?;
        if chunk.is_empty() {
            // Source shrank underneath us; keep what was read.
            break;
        }
        let part_path = scratch_dir.join(format!("{file_name}.part{num}"));
        store.write(&part_path, &chunk)?;
        offset += chunk.len() as u64;
        parts.push(part_path);
        num += 1;
    }
    Ok(parts)
}

/// Concatenate `parts` into `dest` in the given order, deleting each part
/// once it has been fully copied.
///
/// Callers supply the order from the manifest, never re-derived from file
/// names. On failure the error propagates and parts not yet consumed are
/// left in place.
pub fn join<S: PartStore>(store: &S, dest: &Path, parts: &[PathBuf]) -> Result<PathBuf> {
    if parts.is_empty() {
        return Err(VaultError::InvalidArgument("no parts to join".into()));
    }
    store.write(dest, &[])?;
    for part in parts {
        let len = store.len(part)?;
        let bytes = store.read_at(part, 0, len)?;
        store.append(dest, &bytes)?;
        store.remove(part)?;
    }
    Ok(dest.to_path_buf())
}
