//! Composed output writing.
//!
//! An output container is described as an ordered list of chunks, each
//! either a verbatim byte range of the source or freshly built bytes.
//! Unmodified regions are copied straight from the source map, so the
//! writer can never introduce corruption outside the edited spans.

use crate::error::Result;
use crate::source::ByteSource;
use std::io::Write;

/// One piece of a composed output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteChunk {
    /// Verbatim bytes `[offset, offset + length)` of the source.
    CopyRange { offset: u64, length: u64 },
    /// Freshly constructed bytes (rewritten headers, index tables).
    Literal(Vec<u8>),
}

impl WriteChunk {
    pub fn len(&self) -> u64 {
        match self {
            WriteChunk::CopyRange { length, .. } => *length,
            WriteChunk::Literal(bytes) => bytes.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Copy window for streaming `CopyRange` chunks.
const COPY_BUF_LEN: usize = 64 * 1024;

/// An ordered chunk list plus the machinery to measure and stream it.
#[derive(Debug, Default)]
pub struct ComposedWrite {
    chunks: Vec<WriteChunk>,
}

impl ComposedWrite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: WriteChunk) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    pub fn push_copy(&mut self, offset: u64, length: u64) {
        self.push(WriteChunk::CopyRange { offset, length });
    }

    pub fn push_literal(&mut self, bytes: Vec<u8>) {
        self.push(WriteChunk::Literal(bytes));
    }

    pub fn chunks(&self) -> &[WriteChunk] {
        &self.chunks
    }

    /// Append another composition's chunks in order.
    pub fn append(&mut self, mut other: ComposedWrite) {
        self.chunks.append(&mut other.chunks);
    }

    /// Total output length without performing any I/O. This is the
    /// measurement pass that header size fields are computed from.
    pub fn measure(&self) -> u64 {
        self.chunks.iter().map(WriteChunk::len).sum()
    }

    /// Stream every chunk to `out` in order. Copy ranges go through a
    /// fixed window; the full output is never buffered.
    pub fn write_to<W: Write>(&self, source: &ByteSource, out: &mut W) -> Result<()> {
        for chunk in &self.chunks {
            match chunk {
                WriteChunk::CopyRange { offset, length } => {
                    let mut pos = *offset;
                    let mut remaining = *length;
                    while remaining > 0 {
                        let step = remaining.min(COPY_BUF_LEN as u64) as usize;
                        out.write_all(source.read_range(pos, step)?)?;
                        pos += step as u64;
                        remaining -= step as u64;
                    }
                }
                WriteChunk::Literal(bytes) => out.write_all(bytes)?,
            }
        }
        out.flush()?;
        Ok(())
    }
}
