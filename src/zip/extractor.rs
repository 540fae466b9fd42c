//! Single-entry extraction: local header, payload, codec, CRC-32.

use std::io::{self, Read};
use std::path::Path;

use flate2::read::DeflateDecoder;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use crate::error::{RecordError, Result, ZipError};
use crate::io::ReadAt;

use super::bytes;
use super::config::ScanConfig;
use super::structures::{CdirRecord, CompressionMethod, FLAG_ENCRYPTED, LocRecord};

/// Upper bound for the output pre-allocation; the declared size is not trusted.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Reads and decodes the data of central directory entries.
pub struct EntryExtractor<'a, R: ReadAt + ?Sized> {
    reader: &'a R,
    config: ScanConfig,
}

impl<'a, R: ReadAt + ?Sized> EntryExtractor<'a, R> {
    pub fn new(reader: &'a R, config: ScanConfig) -> Self {
        Self { reader, config }
    }

    /// Extract one entry to memory and verify its CRC-32.
    ///
    /// One read covers the local header and the compressed payload: the
    /// entry's compressed size plus the configured slack. Headers or payloads
    /// that do not fit in that window are read separately.
    ///
    /// # Errors
    ///
    /// - [`ZipError::EntryReadFailed`] if the window cannot be read.
    /// - [`ZipError::BadLocalHeader`] if no local header sits at the offset.
    /// - [`ZipError::UnexpectedEof`] if the header or payload is cut short.
    /// - [`ZipError::EncryptedEntry`], [`ZipError::UnsupportedCompressionMethod`]
    ///   or [`ZipError::Decompression`] if the payload cannot be decoded.
    /// - [`ZipError::ChecksumMismatch`] if the decoded bytes fail the CRC check.
    pub async fn extract(&self, entry: &CdirRecord) -> Result<Vec<u8>> {
        let offset = entry.lfh_offset;
        let available = self.reader.size().saturating_sub(offset);
        let window_len = entry
            .compressed_size
            .saturating_add(self.config.extract_slack() as u64)
            .min(available);

        let mut window = vec![0u8; to_usize(window_len, offset)?];
        let n = self
            .reader
            .read_from_head(offset, &mut window)
            .await
            .map_err(|source| ZipError::EntryReadFailed { offset, source })?;
        window.truncate(n);

        let Some(signature) = bytes::u32_at(&window, 0) else {
            return Err(ZipError::UnexpectedEof {
                offset,
                expected: LocRecord::SIZE as u64,
                actual: n as u64,
            });
        };
        if signature != LocRecord::SIGNATURE {
            return Err(ZipError::BadLocalHeader { offset, signature });
        }

        let loc = match LocRecord::parse(&window) {
            Ok(loc) => loc,
            Err(RecordError::Truncated { needed, .. }) => {
                trace!(offset, needed, "local header extends past the read window");
                let header = self.read_exact(offset, needed).await?;
                LocRecord::parse(&header).map_err(|err| ZipError::EntryReadFailed {
                    offset,
                    source: io::Error::new(io::ErrorKind::InvalidData, err),
                })?
            }
            Err(err) => {
                return Err(ZipError::EntryReadFailed {
                    offset,
                    source: io::Error::new(io::ErrorKind::InvalidData, err),
                });
            }
        };

        let payload_start = loc.header_size;
        let data_offset = offset + payload_start as u64;

        // Checked before anything is allocated for the payload.
        let size = self.reader.size();
        let fits = data_offset
            .checked_add(entry.compressed_size)
            .is_some_and(|end| end <= size);
        if !fits {
            return Err(ZipError::UnexpectedEof {
                offset: data_offset,
                expected: entry.compressed_size,
                actual: size.saturating_sub(data_offset),
            });
        }

        let payload_len = to_usize(entry.compressed_size, offset)?;
        let covered = window
            .get(payload_start..)
            .and_then(|rest| rest.get(..payload_len));
        let payload = match covered {
            Some(slice) => slice.to_vec(),
            None => {
                trace!(data_offset, payload_len, "payload extends past the read window");
                self.read_exact(data_offset, payload_len).await?
            }
        };

        if entry.is_encrypted() || loc.flags & FLAG_ENCRYPTED != 0 {
            return Err(ZipError::EncryptedEntry {
                name: entry.file_name.clone(),
            });
        }

        debug!(
            name = %entry.file_name,
            method = %entry.compression_method,
            compressed = entry.compressed_size,
            uncompressed = entry.uncompressed_size,
            "extracting entry"
        );

        let data = match entry.compression_method {
            CompressionMethod::Stored => payload,
            CompressionMethod::Deflated => inflate(&payload, entry)?,
            other => return Err(ZipError::UnsupportedCompressionMethod(other)),
        };

        // Streamed entries leave the local CRC zero and put the real value
        // in the data descriptor, which the central directory repeats.
        let expected = if loc.has_data_descriptor() && loc.crc32 == 0 {
            entry.crc32
        } else {
            loc.crc32
        };
        let actual = crc32fast::hash(&data);
        if actual != expected {
            return Err(ZipError::ChecksumMismatch {
                name: entry.file_name.clone(),
                expected,
                actual,
            });
        }

        Ok(data)
    }

    /// Extract an entry to `output_path`, creating parent directories.
    pub async fn extract_to_file(&self, entry: &CdirRecord, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let data = self.extract(entry).await?;

        let mut file = fs::File::create(output_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        Ok(())
    }

    pub async fn extract_to_stdout(&self, entry: &CdirRecord) -> Result<()> {
        let data = self.extract(entry).await?;

        let mut stdout = tokio::io::stdout();
        stdout.write_all(&data).await?;
        stdout.flush().await?;

        Ok(())
    }

    async fn read_exact(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = self
            .reader
            .read_from_head(offset, &mut buf)
            .await
            .map_err(|source| ZipError::EntryReadFailed { offset, source })?;
        if n < len {
            return Err(ZipError::UnexpectedEof {
                offset,
                expected: len as u64,
                actual: n as u64,
            });
        }
        Ok(buf)
    }
}

/// Inflate at most one byte more than the declared size, so an overrun is
/// caught without decoding the rest of the stream.
fn inflate(payload: &[u8], entry: &CdirRecord) -> Result<Vec<u8>> {
    let declared = entry.uncompressed_size;
    let mut out = Vec::with_capacity(declared.min(MAX_PREALLOC) as usize);
    let decompression = |source: io::Error| ZipError::Decompression {
        name: entry.file_name.clone(),
        source,
    };

    DeflateDecoder::new(payload)
        .take(declared.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(decompression)?;

    if out.len() as u64 > declared {
        return Err(decompression(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("inflates past the declared {declared} bytes"),
        )));
    }
    Ok(out)
}

fn to_usize(len: u64, offset: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| ZipError::EntryReadFailed {
        offset,
        source: io::Error::new(
            io::ErrorKind::OutOfMemory,
            format!("{len} bytes do not fit in memory"),
        ),
    })
}
