//! Input file metadata and raw reads.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DashError, Result};

/// Format of a loaded input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Json,
    Csv,
    Tsv,
    /// Semicolon or pipe separated text.
    Delimited,
}

impl InputFormat {
    /// Format implied by a field delimiter.
    pub fn from_delimiter(delimiter: u8) -> Self {
        match delimiter {
            b'\t' => Self::Tsv,
            b',' => Self::Csv,
            _ => Self::Delimited,
        }
    }
}

/// Metadata about a loaded input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    pub format: InputFormat,
    /// Number of records loaded (cases, columns or reference entries).
    pub row_count: usize,
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    pub fn new(raw: &RawInput, format: InputFormat, row_count: usize) -> Self {
        let file = raw
            .path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path: raw.path.clone(),
            hash: raw.hash.clone(),
            size_bytes: raw.contents.len() as u64,
            format,
            row_count,
            loaded_at: Utc::now(),
        }
    }
}

/// File contents with their hash.
#[derive(Debug, Clone)]
pub struct RawInput {
    pub path: PathBuf,
    pub contents: Vec<u8>,
    pub hash: String,
}

impl RawInput {
    /// Read a whole file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|e| DashError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if contents.iter().all(u8::is_ascii_whitespace) {
            return Err(DashError::EmptyData(format!("{} is empty", path.display())));
        }

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        Ok(Self {
            path: path.to_path_buf(),
            contents,
            hash,
        })
    }

    /// Lowercased file extension.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    /// Whether the contents look like a JSON document.
    pub fn looks_like_json(&self) -> bool {
        self.extension().as_deref() == Some("json")
            || self
                .contents
                .iter()
                .find(|b| !b.is_ascii_whitespace())
                .is_some_and(|b| matches!(b, b'[' | b'{'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_hashes_contents() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "id\nc1\n").unwrap();

        let raw = RawInput::read(file.path()).unwrap();
        assert!(raw.hash.starts_with("sha256:"));
        assert_eq!(raw.hash.len(), "sha256:".len() + 64);
        assert_eq!(raw.extension().as_deref(), Some("csv"));
        assert!(!raw.looks_like_json());

        let meta = SourceMetadata::new(&raw, InputFormat::Csv, 1);
        assert_eq!(meta.size_bytes, 6);
        assert!(meta.file.ends_with(".csv"));
    }

    #[test]
    fn test_read_rejects_empty_and_missing() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(RawInput::read(file.path()), Err(DashError::EmptyData(_))));
        assert!(matches!(
            RawInput::read("/definitely/not/here.json"),
            Err(DashError::Io { .. })
        ));
    }
}
