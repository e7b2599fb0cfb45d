use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::fsio;

/// Record of the previous generation, persisted next to the output artifact
/// and fully rewritten on every successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Exact concatenated input content that produced the current output.
    pub previous_input_content: String,
    /// Prompt used for the previous generation.
    pub previous_prompt: String,
    /// Hex-encoded SHA-256 of the current output bytes.
    pub output_checksum: String,
}

#[derive(Debug)]
pub enum MetadataError {
    Io(io::Error),
    Format(serde_json::Error),
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataError::Io(e) => write!(f, "I/O error: {}", e),
            MetadataError::Format(e) => write!(f, "malformed metadata: {}", e),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<io::Error> for MetadataError {
    fn from(e: io::Error) -> Self {
        MetadataError::Io(e)
    }
}

impl From<serde_json::Error> for MetadataError {
    fn from(e: serde_json::Error) -> Self {
        MetadataError::Format(e)
    }
}

pub fn checksum(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    format!("{:x}", digest)
}

pub fn read(path: &Path) -> Result<Metadata, MetadataError> {
    let content = std::fs::read(path)?;
    let md = serde_json::from_slice(&content)?;
    Ok(md)
}

pub fn write(path: &Path, md: &Metadata) -> Result<(), MetadataError> {
    let encoded = serde_json::to_vec_pretty(md)?;
    fsio::atomic_write(path, &encoded)?;
    Ok(())
}
