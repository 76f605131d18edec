//! Read-only byte access to a container file.

use crate::error::{MoshError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Smallest byte count any supported container can occupy (a bare RIFF
/// header).
pub const MIN_CONTAINER_LEN: u64 = 12;

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

/// Read-only view of a container's bytes.
///
/// Files are memory-mapped; synthetic streams can be wrapped directly from
/// a buffer. The source exclusively owns its bytes; frame index entries
/// reference it by offset and length only. All range reads are
/// bounds-checked.
pub struct ByteSource {
    backing: Backing,
    path: PathBuf,
}

impl ByteSource {
    /// Map a file read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| MoshError::IoAt {
            path: path.to_path_buf(),
            source: e,
        })?;
        let len = file
            .metadata()
            .map_err(|e| MoshError::IoAt {
                path: path.to_path_buf(),
                source: e,
            })?
            .len();
        if len < MIN_CONTAINER_LEN {
            return Err(MoshError::TooSmall {
                len,
                min: MIN_CONTAINER_LEN,
            });
        }

        let mmap = unsafe {
            Mmap::map(&file).map_err(|e| MoshError::IoAt {
                path: path.to_path_buf(),
                source: e,
            })?
        };

        Ok(Self {
            backing: Backing::Mapped(mmap),
            path: path.to_path_buf(),
        })
    }

    /// Wrap an in-memory buffer (synthetic streams, tests).
    pub fn from_vec(bytes: Vec<u8>) -> Result<Self> {
        if (bytes.len() as u64) < MIN_CONTAINER_LEN {
            return Err(MoshError::TooSmall {
                len: bytes.len() as u64,
                min: MIN_CONTAINER_LEN,
            });
        }
        Ok(Self {
            backing: Backing::Owned(bytes),
            path: PathBuf::from("<memory>"),
        })
    }

    pub fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full contents.
    pub fn bytes(&self) -> &[u8] {
        match &self.backing {
            Backing::Mapped(mmap) => mmap,
            Backing::Owned(buf) => buf,
        }
    }

    /// Bounds-checked range read.
    pub fn read_range(&self, offset: u64, length: usize) -> Result<&[u8]> {
        let end = offset
            .checked_add(length as u64)
            .ok_or(MoshError::InvalidRange { offset, length })?;
        if end > self.len() {
            return Err(MoshError::InvalidRange { offset, length });
        }
        Ok(&self.bytes()[offset as usize..end as usize])
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSource")
            .field("path", &self.path)
            .field("len", &self.len())
            .finish()
    }
}
