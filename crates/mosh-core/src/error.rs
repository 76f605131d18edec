//! Error types for mosh

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage identifier, used to annotate errors with their origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Prep transcode (long-GOP re-encode of the source)
    Prep,
    /// Scene-cut detection
    Detect,
    /// Plan construction
    Plan,
    /// Plan execution (bitstream rewrite)
    Execute,
    /// Bake transcode (robust re-encode of the moshed stream)
    Bake,
}

impl Stage {
    /// Stage name as reported in progress and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Prep => "prep",
            Stage::Detect => "detect",
            Stage::Plan => "plan",
            Stage::Execute => "execute",
            Stage::Bake => "bake",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Main error type for mosh operations
#[derive(Error, Debug)]
pub enum MoshError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error at {path}: {source}")]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file too small for a container header: {len} bytes (minimum {min})")]
    TooSmall { len: u64, min: u64 },

    #[error("unsupported container format: {0}")]
    FormatUnsupported(String),

    #[error("container corrupt at offset {offset}: {message}")]
    ContainerCorrupt { offset: u64, message: String },

    #[error("invalid range: offset={offset}, length={length}")]
    InvalidRange { offset: u64, length: usize },

    #[error("bad melt target: frame {index} is {found}, expected a P frame")]
    BadMeltTarget { index: usize, found: String },

    #[error("invalid plan: {0}")]
    PlanInvalid(String),

    #[error("output size {size} exceeds the 32-bit container limit")]
    OverflowSize { size: u64 },

    #[error("no scene cuts above threshold")]
    NoScenes,

    #[error("pixel frame decoder unavailable: {0}")]
    DecoderUnavailable(String),

    #[error("insufficient frames for scene detection: {count}")]
    InsufficientFrames { count: usize },

    #[error("cancelled")]
    Cancelled,

    #[error("stage {stage} failed")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<MoshError>,
    },
}

impl MoshError {
    /// Wrap an error with the pipeline stage it originated from.
    ///
    /// `Cancelled` passes through unwrapped so callers can distinguish a
    /// caller-initiated abort from a stage failure.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            MoshError::Cancelled => MoshError::Cancelled,
            other => MoshError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage annotation, if this error carries one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            MoshError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The root cause with any stage annotation stripped.
    pub fn cause(&self) -> &MoshError {
        match self {
            MoshError::Stage { source, .. } => source.cause(),
            other => other,
        }
    }

    pub fn corrupt(offset: u64, message: impl Into<String>) -> Self {
        MoshError::ContainerCorrupt {
            offset,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MoshError>;
