//! Error types for archive location, scanning and extraction.

use std::io;

use thiserror::Error;

use crate::zip::CompressionMethod;

/// Errors raised while reading a ZIP archive.
///
/// Every variant is terminal for the operation that produced it. The only
/// recoverable failure, [`ZipError::CdirDecode`], is caught by the central
/// directory scanner and kept in
/// [`CentralDirectory::diagnostics`](crate::zip::CentralDirectory::diagnostics).
#[derive(Debug, Error)]
pub enum ZipError {
    /// The byte source failed to serve a read.
    #[error("read failed at offset {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// A read that must be complete came back short.
    #[error("unexpected end of file at offset {offset}: expected {expected} bytes, got {actual}")]
    UnexpectedEof {
        offset: u64,
        expected: u64,
        actual: u64,
    },

    /// No End of Central Directory record within the search ceiling.
    #[error("end of central directory not found in the last {searched} bytes")]
    EocdNotFound { searched: u64 },

    /// The EOCD announced ZIP64 but no ZIP64 EOCD record was found.
    #[error("ZIP64 end of central directory not found in the last {searched} bytes")]
    Zip64EocdNotFound { searched: u64 },

    #[error("multi-disk archives are not supported (disk {disk_number}, central directory on disk {disk_with_cd})")]
    MultiDiskUnsupported { disk_number: u32, disk_with_cd: u32 },

    /// The scanner decoded a different number of records than the EOCD declares.
    #[error("central directory entry count mismatch: expected {expected}, found {actual}")]
    CdirCountMismatch { expected: u64, actual: u64 },

    /// A single central directory record could not be decoded.
    #[error("invalid central directory record at offset {offset}: {reason}")]
    CdirDecode { offset: u64, reason: String },

    /// The local header plus payload window could not be read.
    #[error("failed to read entry at offset {offset}: {source}")]
    EntryReadFailed {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("bad local file header at offset {offset}: signature {signature:#010x}")]
    BadLocalHeader { offset: u64, signature: u32 },

    #[error("CRC-32 mismatch for {name}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("unsupported compression method: {0}")]
    UnsupportedCompressionMethod(CompressionMethod),

    #[error("failed to decompress {name}: {source}")]
    Decompression {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("encrypted entries are not supported: {name}")]
    EncryptedEntry { name: String },

    /// Writing extracted bytes to a file or stdout failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl ZipError {
    /// Whether this error belongs to the end-of-file class (failed or short read).
    pub fn is_eof(&self) -> bool {
        matches!(self, ZipError::Read { .. } | ZipError::UnexpectedEof { .. })
    }

    pub(crate) fn cdir_decode(offset: u64, reason: impl Into<String>) -> Self {
        ZipError::CdirDecode {
            offset,
            reason: reason.into(),
        }
    }
}

/// Why a single record could not be decoded from a byte slice.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("{record} truncated: need {needed} bytes, have {available}")]
    Truncated {
        record: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("{record} signature mismatch: expected {expected:#010x}, got {actual:#010x}")]
    BadSignature {
        record: &'static str,
        expected: u32,
        actual: u32,
    },
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ZipError>;
