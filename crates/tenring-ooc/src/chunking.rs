//! Deterministic chunking of a single mode range
//!
//! Out-of-core fiber fetches read the tensor one contiguous slab at a time
//! along the target mode. [`ModeChunks`] splits `0..len` into at most
//! `num_increments` contiguous pieces using ceiling division, the same rule
//! used for tile counts elsewhere in the stack.
//!
//! # Example
//!
//! ```
//! use tenring_ooc::chunking::ModeChunks;
//!
//! let chunks = ModeChunks::split(10, 4);
//! let ranges: Vec<_> = chunks.iter().collect();
//! assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..10]);
//! ```

use std::ops::Range;

/// Contiguous partition of `0..len`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChunks {
    len: usize,
    chunk_size: usize,
}

impl ModeChunks {
    /// Split `0..len` into at most `num_increments` chunks
    ///
    /// `num_increments == 0` means a single chunk covering the whole range.
    /// Requests for more chunks than elements are clamped to one element per
    /// chunk, so no chunk is ever empty.
    pub fn split(len: usize, num_increments: usize) -> Self {
        let pieces = num_increments.clamp(1, len.max(1));
        Self {
            len,
            chunk_size: len.div_ceil(pieces).max(1),
        }
    }

    /// Length of the partitioned range
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the partitioned range is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of every chunk except possibly the last
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks produced
    pub fn num_chunks(&self) -> usize {
        self.len.div_ceil(self.chunk_size)
    }

    /// Iterate over the chunk ranges in ascending order
    pub fn iter(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.num_chunks()).map(move |c| {
            let start = c * self.chunk_size;
            start..(start + self.chunk_size).min(self.len)
        })
    }
}
