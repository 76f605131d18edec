//! Container format detection.
//!
//! Detects the two container shapes the engine edits, from magic bytes
//! with a file-extension fallback:
//! - AVI (RIFF)
//! - Annex-B raw H.264 byte stream

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Container format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// AVI container (RIFF)
    Avi,
    /// Raw H.264 Annex-B byte stream
    AnnexB,
}

impl ContainerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::Avi => "AVI",
            ContainerKind::AnnexB => "Annex-B",
        }
    }
}

/// Detect from file extension.
pub fn detect_from_extension(path: &Path) -> Option<ContainerKind> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("avi") => Some(ContainerKind::Avi),
        Some("h264") | Some("264") | Some("avc") => Some(ContainerKind::AnnexB),
        _ => None,
    }
}

/// Detect from leading bytes.
pub fn detect_from_magic_bytes(bytes: &[u8]) -> Option<ContainerKind> {
    // AVI: RIFF....AVI
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"AVI " {
        return Some(ContainerKind::Avi);
    }

    // Annex-B: start code followed by a plausible H.264 NAL type.
    if bytes.len() >= 5 && bytes[0] == 0 && bytes[1] == 0 {
        let nal_byte = if bytes[2] == 1 {
            Some(bytes[3])
        } else if bytes[2] == 0 && bytes[3] == 1 {
            Some(bytes[4])
        } else {
            None
        };
        if let Some(byte) = nal_byte {
            let nal_type = byte & 0x1F;
            if (1..=9).contains(&nal_type) {
                return Some(ContainerKind::AnnexB);
            }
        }
    }

    None
}

/// Detect using magic bytes first, extension as fallback.
pub fn detect_container_kind(path: &Path, bytes: &[u8]) -> Option<ContainerKind> {
    detect_from_magic_bytes(bytes).or_else(|| detect_from_extension(path))
}
