//! # zipseek
//!
//! Reads ZIP and ZIP64 archives from the end, without loading the whole file.
//!
//! The End of Central Directory is found by a backward, chunked signature
//! search; the central directory is then scanned in bounded windows and
//! entries are extracted one at a time on demand. Any [`ReadAt`] source
//! works: local files, in-memory bytes, or remote files over HTTP Range
//! requests.
//!
//! ## Features
//!
//! - ZIP64 trailers and ZIP64 extra fields
//! - Garbage or arbitrary data before the archive and after the trailer comment
//! - STORED and DEFLATE extraction with CRC-32 verification
//! - Memory bounded by the scan chunk sizes, not the archive size
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zipseek::{HttpRangeReader, ZipArchive};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let reader = Arc::new(HttpRangeReader::new("https://example.com/archive.zip".to_string()).await?);
//!     let archive = ZipArchive::open(reader).await?;
//!
//!     for entry in archive.entries() {
//!         println!("{} ({} bytes)", entry.file_name, entry.uncompressed_size);
//!     }
//!
//!     if let Some(entry) = archive.find("README.md") {
//!         let data = archive.extract(entry).await?;
//!         println!("{}", String::from_utf8_lossy(&data));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{RecordError, Result, ZipError};
pub use io::{HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use zip::{
    CdirRecord, CompressionMethod, EndOfCentralDirectory, LocRecord, ScanConfig, Trailer,
    ZipArchive,
};
