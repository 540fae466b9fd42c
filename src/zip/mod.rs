//! ZIP archive location, listing and extraction.
//!
//! ## Architecture
//!
//! Reading is split into three passes over a random-access byte source:
//!
//! - [`locator`]: backward search from the end of the file for the End of
//!   Central Directory, then for the ZIP64 record when the first one says so
//! - [`scanner`]: backward walk over the central directory, decoding every
//!   entry record
//! - [`extractor`]: on-demand read of one entry's local header and payload,
//!   inflate and CRC-32 check
//!
//! [`ZipArchive`] ties them together. Both scans go through a
//! [`GrowableBuffer`](buffer::GrowableBuffer) so a signature or record split
//! across two reads is still seen whole while memory stays bounded by the
//! chunk sizes in [`ScanConfig`].
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - Only STORED and DEFLATE entries can be extracted

pub mod buffer;
pub mod bytes;
pub mod extra;
pub mod locator;
pub mod scanner;

mod archive;
mod config;
mod extractor;
mod structures;

pub use archive::ZipArchive;
pub use buffer::ScanStats;
pub use config::{
    DEFAULT_CDIR_CHUNK_SIZE, DEFAULT_EOCD_CHUNK_SIZE, DEFAULT_EOCD_SEARCH_LIMIT,
    DEFAULT_EXTRACT_SLACK, ScanConfig,
};
pub use extra::{ExtraField, ExtraFieldId, Zip64Fields};
pub use extractor::EntryExtractor;
pub use locator::{EocdLocator, LocatedTrailer};
pub use scanner::{CdirScanner, CentralDirectory};
pub use structures::*;
