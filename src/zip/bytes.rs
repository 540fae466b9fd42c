//! Little-endian field decoding over byte slices.
//!
//! The `*_at` functions are bounds-checked and return `None` when the field
//! does not fit. [`FieldReader`] walks a header whose length the caller has
//! already checked; it saturates instead of failing.

use byteorder::{ByteOrder, LittleEndian};

fn window(data: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    data.get(offset..offset.checked_add(len)?)
}

pub fn u16_at(data: &[u8], offset: usize) -> Option<u16> {
    window(data, offset, 2).map(LittleEndian::read_u16)
}

pub fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    window(data, offset, 4).map(LittleEndian::read_u32)
}

pub fn u64_at(data: &[u8], offset: usize) -> Option<u64> {
    window(data, offset, 8).map(LittleEndian::read_u64)
}

/// Borrow `len` bytes starting at `offset`.
pub fn slice_at(data: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    window(data, offset, len)
}

/// Copy `len` bytes starting at `offset` out as text.
///
/// Invalid UTF-8 is replaced rather than rejected; archive names in the wild
/// are frequently CP437 or some local code page.
pub fn text_at(data: &[u8], offset: usize, len: usize) -> Option<String> {
    window(data, offset, len).map(|b| String::from_utf8_lossy(b).into_owned())
}

/// Sequential reader for fixed-layout headers.
///
/// Reads past the end yield zero and leave the position at the end.
#[derive(Debug)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n).min(self.data.len());
    }

    pub fn u16(&mut self) -> u16 {
        let v = u16_at(self.data, self.pos).unwrap_or(0);
        self.skip(2);
        v
    }

    pub fn u32(&mut self) -> u32 {
        let v = u32_at(self.data, self.pos).unwrap_or(0);
        self.skip(4);
        v
    }

    pub fn u64(&mut self) -> u64 {
        let v = u64_at(self.data, self.pos).unwrap_or(0);
        self.skip(8);
        v
    }

    /// Take up to `n` bytes; fewer if the data ends first.
    pub fn bytes(&mut self, n: usize) -> &'a [u8] {
        let start = self.pos.min(self.data.len());
        let end = start.saturating_add(n).min(self.data.len());
        self.pos = end;
        &self.data[start..end]
    }
}
