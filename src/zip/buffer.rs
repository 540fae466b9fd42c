//! Backward-growing byte buffer used by the tail-first scanning passes.
//!
//! Scans read the archive in fixed windows moving toward the start of the
//! file. Each new window is prepended with [`GrowableBuffer::coalesce_front`]
//! so a signature or record that straddles two windows is seen whole, and
//! the buffer is capped after every pass so memory stays bounded.
//!
//! All copy ranges are clamped to the source and destination; out-of-range
//! requests truncate silently instead of failing.

use super::bytes;

#[derive(Debug, Default, Clone)]
pub struct GrowableBuffer {
    data: Vec<u8>,
}

impl GrowableBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn u16_at(&self, offset: usize) -> Option<u16> {
        bytes::u16_at(&self.data, offset)
    }

    pub fn u32_at(&self, offset: usize) -> Option<u32> {
        bytes::u32_at(&self.data, offset)
    }

    /// Place `chunk[offset..offset + length]` in front of the current contents.
    ///
    /// The range is clamped to `chunk`. Zero length is a no-op.
    pub fn coalesce_front(&mut self, chunk: &[u8], offset: usize, length: usize) {
        let start = offset.min(chunk.len());
        let end = start.saturating_add(length).min(chunk.len());
        let length = end - start;
        if length == 0 {
            return;
        }

        let old_len = self.data.len();
        self.resize(old_len + length, 0, length, None);
        self.data[..length].copy_from_slice(&chunk[start..end]);
    }

    /// Reallocate to `new_len` zeroed bytes and copy part of the old contents over.
    ///
    /// Copies `copy_len` bytes (all of the old contents when `None`) from
    /// `src_offset` in the old buffer to `dst_offset` in the new one. The
    /// count is clamped so neither range leaves its buffer.
    pub fn resize(
        &mut self,
        new_len: usize,
        src_offset: usize,
        dst_offset: usize,
        copy_len: Option<usize>,
    ) {
        let old = std::mem::replace(&mut self.data, vec![0u8; new_len]);

        let src_offset = src_offset.min(old.len());
        let dst_offset = dst_offset.min(new_len);
        let n = copy_len
            .unwrap_or(old.len())
            .min(old.len() - src_offset)
            .min(new_len - dst_offset);

        self.data[dst_offset..dst_offset + n].copy_from_slice(&old[src_offset..src_offset + n]);
    }

    /// Shrink to the last `max_len` bytes, dropping the front.
    pub fn ensure_size(&mut self, max_len: usize) {
        let len = self.data.len();
        if len > max_len {
            self.resize(max_len, len - max_len, 0, None);
        }
    }

    /// Shrink to the first `max_len` bytes, dropping the back.
    ///
    /// This is the per-pass cap: the front holds the bytes adjacent to the
    /// next window, which must survive for straddle matching.
    pub fn retain_front(&mut self, max_len: usize) {
        if self.data.len() > max_len {
            self.resize(max_len, 0, 0, Some(max_len));
        }
    }
}

/// Per-scan bookkeeping: number of passes and the largest buffer seen.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub passes: usize,
    pub peak_buffer_len: usize,
}

impl ScanStats {
    pub(crate) fn record_pass(&mut self, buffer: &GrowableBuffer) {
        self.passes += 1;
        self.peak_buffer_len = self.peak_buffer_len.max(buffer.len());
    }
}
