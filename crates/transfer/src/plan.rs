use std::ops::Range;

use crate::TransferError;

/// One contiguous slice of the source, uploaded as an independent unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// 0-based ordinal, also the `chunk_index` sent on the wire.
    pub index: usize,
    /// Half-open byte range `[start, end)` within the source.
    pub range: Range<u64>,
}

impl ChunkDescriptor {
    /// Number of bytes in this chunk.
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    /// Always false for chunks produced by [`ChunkPlan`].
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Number of chunks needed to cover `total_size` bytes: `ceil(size / chunk)`.
///
/// Returns 0 when `chunk_size` is 0.
pub fn total_chunks(total_size: u64, chunk_size: u64) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    total_size.div_ceil(chunk_size) as usize
}

/// Ordered, read-only split of a source into chunk descriptors.
///
/// The ranges are contiguous, do not overlap and their union is
/// `[0, total_size)`. Only the last chunk may be shorter than `chunk_size`.
/// Descriptors are computed on demand, so a plan is constant-size whatever
/// the chunk count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    total_size: u64,
    chunk_size: u64,
    total_chunks: usize,
}

impl ChunkPlan {
    /// Splits `total_size` bytes into chunks of `chunk_size`.
    pub fn new(total_size: u64, chunk_size: u64) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize(chunk_size));
        }

        Ok(Self {
            total_size,
            chunk_size,
            total_chunks: total_chunks(total_size, chunk_size),
        })
    }

    /// Size of the planned source in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Nominal chunk size the plan was built with.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks in the plan.
    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    /// Returns the descriptor for `index`, if it exists.
    pub fn get(&self, index: usize) -> Option<ChunkDescriptor> {
        if index >= self.total_chunks {
            return None;
        }
        let start = index as u64 * self.chunk_size;
        let end = start.saturating_add(self.chunk_size).min(self.total_size);
        Some(ChunkDescriptor {
            index,
            range: start..end,
        })
    }

    /// Descriptors in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = ChunkDescriptor> + '_ {
        (0..self.total_chunks).filter_map(|index| self.get(index))
    }
}
