use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// One bounded-size slice of an uploaded file, as sent to the transport.
/// `order` is 1-based; `file_path` is the local scratch path the part was
/// read from on upload and is written back to on download.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PartRef {
    pub order: u32,
    pub message_id: i64,
    pub file_path: String,
    #[serde(default)]
    pub len: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_hex: Option<String>,
}

/// One logical upload: identity, destination, and the ordered parts needed
/// to reconstruct the original file. Immutable once appended.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FileRecord {
    pub id: String,
    pub chat_target: String,
    pub file_path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created_utc: String,
    pub parts: Vec<PartRef>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Manifest {
    pub files: Vec<FileRecord>,
}

impl FileRecord {
    /// Part orders must be exactly 1..=n, ascending, no gaps or duplicates.
    pub fn validate(&self) -> Result<()> {
        if self.parts.is_empty() {
            return Err(VaultError::InvalidArgument(format!("record {} has no parts", self.id)));
        }
        for (i, part) in self.parts.iter().enumerate() {
            let expected = (i + 1) as u32;
            if part.order != expected {
                return Err(VaultError::InvalidArgument(format!(
                    "record {}: part order {} at position {} (expected {})",
                    self.id, part.order, i, expected
                )));
            }
        }
        Ok(())
    }
}
