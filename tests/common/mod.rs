//! Deterministic archive builder for integration tests.
//!
//! Writes local headers, the central directory and the trailer with fixed
//! timestamps and explicit sizes. Knobs exist for the layouts the reader
//! must cope with: data before the archive, trailer comments, ZIP64
//! trailers, ZIP64 extra fields, multi-disk markers and bogus header values.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;

pub const LOC_SIG: u32 = 0x04034b50;
pub const CDIR_SIG: u32 = 0x02014b50;
pub const EOCD_SIG: u32 = 0x06054b50;
pub const EOCD64_SIG: u32 = 0x06064b50;
pub const EOCD64_LOCATOR_SIG: u32 = 0x07064b50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Store,
    Deflate,
    /// Written as-is with the payload stored; for unsupported method ids.
    Raw(u16),
}

/// Values written into the central directory's fixed header instead of the
/// real ones.
#[derive(Debug, Clone, Copy)]
pub struct HeaderOverride {
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub lfh_offset: u32,
    pub disk_number: u16,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub data: Vec<u8>,
    pub method: Method,
    pub flags: u16,
    pub comment: Vec<u8>,
    /// Raw extra field bytes for the central directory record.
    pub cd_extra: Vec<u8>,
    pub header_override: Option<HeaderOverride>,
    /// Append a ZIP64 extra holding the real sizes and offset, plus the disk
    /// number when given.
    pub zip64_extra: Option<Option<u32>>,
}

impl Entry {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>, method: Method) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            method,
            flags: 0,
            comment: Vec::new(),
            cd_extra: Vec::new(),
            header_override: None,
            zip64_extra: None,
        }
    }

    pub fn stored(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(name, data, Method::Store)
    }

    pub fn deflated(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(name, data, Method::Deflate)
    }

    pub fn with_comment(mut self, comment: impl Into<Vec<u8>>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_header_override(mut self, header: HeaderOverride) -> Self {
        self.header_override = Some(header);
        self
    }

    pub fn with_zip64_extra(mut self, disk: Option<u32>) -> Self {
        self.zip64_extra = Some(disk);
        self
    }
}

/// Where things ended up in the built archive.
#[derive(Debug, Clone)]
pub struct Built {
    pub bytes: Vec<u8>,
    pub lfh_offsets: Vec<u64>,
    pub cd_offset: u64,
    pub cd_size: u64,
    pub eocd_offset: u64,
    pub eocd64_offset: Option<u64>,
    /// Offset of each entry's payload.
    pub data_offsets: Vec<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder {
    prefix: Vec<u8>,
    suffix: Vec<u8>,
    entries: Vec<Entry>,
    comment: Vec<u8>,
    zip64: bool,
    disk_number: u32,
    declared_entries: Option<u64>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes placed before the first local header. Offsets stay absolute.
    pub fn prefix(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.prefix = bytes.into();
        self
    }

    /// Bytes placed after the trailer, outside the declared comment.
    pub fn suffix(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.suffix = bytes.into();
        self
    }

    pub fn entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn entries(mut self, entries: impl IntoIterator<Item = Entry>) -> Self {
        self.entries.extend(entries);
        self
    }

    pub fn comment(mut self, comment: impl Into<Vec<u8>>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Write a ZIP64 EOCD and locator and put sentinels in the EOCD.
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    pub fn disk_number(mut self, disk: u32) -> Self {
        self.disk_number = disk;
        self
    }

    /// Entry count written to the trailer instead of the real one.
    pub fn declared_entries(mut self, count: u64) -> Self {
        self.declared_entries = Some(count);
        self
    }

    pub fn build(self) -> Built {
        let mut out = self.prefix.clone();
        let mut cd = Vec::new();
        let mut lfh_offsets = Vec::with_capacity(self.entries.len());
        let mut data_offsets = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let (method, payload) = match entry.method {
                Method::Store => (0u16, entry.data.clone()),
                Method::Deflate => (8u16, deflate(&entry.data)),
                Method::Raw(id) => (id, entry.data.clone()),
            };
            let crc = crc32fast::hash(&entry.data);
            let name = entry.name.as_bytes();
            let local_off = out.len() as u64;
            lfh_offsets.push(local_off);

            put_u32(&mut out, LOC_SIG);
            put_u16(&mut out, 20);
            put_u16(&mut out, entry.flags);
            put_u16(&mut out, method);
            put_u16(&mut out, 0x6000);
            put_u16(&mut out, 0x5821);
            put_u32(&mut out, crc);
            put_u32(&mut out, payload.len() as u32);
            put_u32(&mut out, entry.data.len() as u32);
            put_u16(&mut out, name.len() as u16);
            put_u16(&mut out, 0);
            out.extend_from_slice(name);
            data_offsets.push(out.len() as u64);
            out.extend_from_slice(&payload);

            let mut extra = entry.cd_extra.clone();
            if let Some(disk) = entry.zip64_extra {
                extra.extend(zip64_extra(
                    entry.data.len() as u64,
                    payload.len() as u64,
                    local_off,
                    disk,
                ));
            }

            let header = entry.header_override.unwrap_or(HeaderOverride {
                compressed_size: payload.len() as u32,
                uncompressed_size: entry.data.len() as u32,
                lfh_offset: local_off as u32,
                disk_number: 0,
            });

            put_u32(&mut cd, CDIR_SIG);
            put_u16(&mut cd, 0x031e);
            put_u16(&mut cd, 20);
            put_u16(&mut cd, entry.flags);
            put_u16(&mut cd, method);
            put_u16(&mut cd, 0x6000);
            put_u16(&mut cd, 0x5821);
            put_u32(&mut cd, crc);
            put_u32(&mut cd, header.compressed_size);
            put_u32(&mut cd, header.uncompressed_size);
            put_u16(&mut cd, name.len() as u16);
            put_u16(&mut cd, extra.len() as u16);
            put_u16(&mut cd, entry.comment.len() as u16);
            put_u16(&mut cd, header.disk_number);
            put_u16(&mut cd, 0);
            put_u32(&mut cd, 0o100644 << 16);
            put_u32(&mut cd, header.lfh_offset);
            cd.extend_from_slice(name);
            cd.extend_from_slice(&extra);
            cd.extend_from_slice(&entry.comment);
        }

        let cd_offset = out.len() as u64;
        let cd_size = cd.len() as u64;
        out.extend_from_slice(&cd);

        let count = self.declared_entries.unwrap_or(self.entries.len() as u64);
        let disk = self.disk_number;

        let eocd64_offset = if self.zip64 {
            let eocd64_offset = out.len() as u64;
            put_u32(&mut out, EOCD64_SIG);
            put_u64(&mut out, 44);
            put_u16(&mut out, 45);
            put_u16(&mut out, 45);
            put_u32(&mut out, disk);
            put_u32(&mut out, disk);
            put_u64(&mut out, count);
            put_u64(&mut out, count);
            put_u64(&mut out, cd_size);
            put_u64(&mut out, cd_offset);

            put_u32(&mut out, EOCD64_LOCATOR_SIG);
            put_u32(&mut out, disk);
            put_u64(&mut out, eocd64_offset);
            put_u32(&mut out, disk + 1);
            Some(eocd64_offset)
        } else {
            None
        };

        let eocd_offset = out.len() as u64;
        put_u32(&mut out, EOCD_SIG);
        if self.zip64 {
            put_u16(&mut out, 0xFFFF);
            put_u16(&mut out, 0xFFFF);
            put_u16(&mut out, 0xFFFF);
            put_u16(&mut out, 0xFFFF);
            put_u32(&mut out, 0xFFFF_FFFF);
            put_u32(&mut out, 0xFFFF_FFFF);
        } else {
            put_u16(&mut out, disk as u16);
            put_u16(&mut out, disk as u16);
            put_u16(&mut out, count as u16);
            put_u16(&mut out, count as u16);
            put_u32(&mut out, cd_size as u32);
            put_u32(&mut out, cd_offset as u32);
        }
        put_u16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);
        out.extend_from_slice(&self.suffix);

        Built {
            bytes: out,
            lfh_offsets,
            cd_offset,
            cd_size,
            eocd_offset,
            eocd64_offset,
            data_offsets,
        }
    }
}

/// ZIP64 extended information block: uncompressed, compressed, offset and
/// optionally the disk number.
pub fn zip64_extra(uncompressed: u64, compressed: u64, offset: u64, disk: Option<u32>) -> Vec<u8> {
    let mut data = Vec::new();
    put_u64(&mut data, uncompressed);
    put_u64(&mut data, compressed);
    put_u64(&mut data, offset);
    if let Some(disk) = disk {
        put_u32(&mut data, disk);
    }

    let mut out = Vec::new();
    put_u16(&mut out, 0x0001);
    put_u16(&mut out, data.len() as u16);
    out.extend(data);
    out
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("deflate into memory");
    encoder.finish().expect("finish deflate")
}

/// Repeatable pseudo-random bytes (xorshift).
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect()
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}
