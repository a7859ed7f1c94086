//! Read-only window over the producer's linear memory
//!
//! A [`MemoryView`] borrows the memory slice handed to a single call. The
//! borrow ties the view to that call: the producer's memory may be grown (and
//! therefore reallocated) between calls, so a view can never be cached across
//! them.

use crate::error::{Error, Result};

/// Size of one sample in linear memory (little-endian f32)
pub const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/// `sample_count` f32 values starting at a byte offset into linear memory
#[derive(Debug, Clone, Copy)]
pub struct MemoryView<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> MemoryView<'a> {
    /// Window `sample_count` f32 values starting at byte `offset`.
    ///
    /// The offset need not be aligned. Fails if any part of the window lies
    /// outside `memory`.
    pub fn new(memory: &'a [u8], offset: usize, sample_count: usize) -> Result<Self> {
        let len = sample_count.checked_mul(SAMPLE_BYTES).ok_or(Error::MemoryAccess {
            offset,
            len: usize::MAX,
            memory_len: memory.len(),
        })?;
        let window = offset
            .checked_add(len)
            .and_then(|end| memory.get(offset..end));

        match window {
            Some(bytes) => Ok(Self { bytes, offset }),
            None => Err(Error::MemoryAccess {
                offset,
                len,
                memory_len: memory.len(),
            }),
        }
    }

    /// Byte offset of the window in linear memory
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of f32 samples in the window
    pub fn len(&self) -> usize {
        self.bytes.len() / SAMPLE_BYTES
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Sample at `index`, or None past the end of the window
    pub fn get(&self, index: usize) -> Option<f32> {
        let start = index.checked_mul(SAMPLE_BYTES)?;
        let chunk = self.bytes.get(start..start.checked_add(SAMPLE_BYTES)?)?;
        Some(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    /// All samples in memory order
    pub fn samples(&self) -> impl Iterator<Item = f32> + 'a {
        self.bytes
            .chunks_exact(SAMPLE_BYTES)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
    }
}
