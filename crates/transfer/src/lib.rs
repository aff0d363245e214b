//! Chunked file transfer primitives: chunk planning, per-chunk state
//! tracking, progress arithmetic and byte sources.

mod plan;
mod progress;
mod source;
mod state;
mod validation;

pub use plan::{ChunkDescriptor, ChunkPlan, total_chunks};
pub use progress::{COMPLETE_PERCENTAGE, MAX_PROGRESS_PERCENTAGE, progress_percentage};
pub use source::{ByteSource, FileSource, MemorySource};
pub use state::{ChunkState, ChunkTracker};
pub use validation::validate_file_name;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(u64),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("byte range {start}..{end} exceeds source size {size}")]
    RangeOutOfBounds { start: u64, end: u64, size: u64 },
}
