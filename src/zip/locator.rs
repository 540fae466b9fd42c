//! Backward search for the End of Central Directory.
//!
//! The archive is read from the tail in small windows. Each window is
//! prepended to a [`GrowableBuffer`] and the new bytes, plus the three bytes
//! of the seam with the previous window, are scanned backward one byte at a
//! time for the EOCD signature. A hit whose counts or offsets hold the ZIP64
//! sentinel switches the search over to the ZIP64 EOCD signature, which sits
//! further toward the start of the file.

use std::borrow::Cow;

use tracing::{debug, trace};

use crate::error::{RecordError, Result, ZipError};
use crate::io::ReadAt;

use super::buffer::{GrowableBuffer, ScanStats};
use super::config::ScanConfig;
use super::structures::{EndOfCentralDirectory, Eocd64Record, EocdRecord, Trailer};

/// Outcome of a successful search.
#[derive(Debug, Clone)]
pub struct LocatedTrailer {
    pub trailer: Trailer,
    /// The trailer with ZIP64 values merged in.
    pub eocd: EndOfCentralDirectory,
    pub eocd_offset: u64,
    pub eocd64_offset: Option<u64>,
    pub stats: ScanStats,
}

/// Finds and decodes the archive trailer of one byte source.
pub struct EocdLocator<'a, R: ReadAt + ?Sized> {
    reader: &'a R,
    config: ScanConfig,
}

impl<'a, R: ReadAt + ?Sized> EocdLocator<'a, R> {
    pub fn new(reader: &'a R, config: ScanConfig) -> Self {
        Self { reader, config }
    }

    /// Search backward from the end of the source for the trailer.
    ///
    /// # Errors
    ///
    /// - [`ZipError::Read`] if a tail read fails.
    /// - [`ZipError::EocdNotFound`] / [`ZipError::Zip64EocdNotFound`] when the
    ///   search ceiling (or the start of the source) is reached first.
    /// - [`ZipError::MultiDiskUnsupported`] if the resolved trailer names a
    ///   disk other than 0.
    pub async fn locate(&self) -> Result<LocatedTrailer> {
        let size = self.reader.size();
        let chunk_size = self.config.eocd_chunk_size();
        let limit = self.config.eocd_search_limit().min(size);

        let mut chunk = vec![0u8; chunk_size];
        let mut buffer = GrowableBuffer::new();
        let mut stats = ScanStats::default();

        // Distance from the end of the source to buffer[0]; the buffer always
        // holds one contiguous range of the source.
        let mut distance = 0u64;
        let mut eocd: Option<(EocdRecord, u64)> = None;

        while distance < limit {
            let want = chunk_size.min(usize::try_from(limit - distance).unwrap_or(usize::MAX));
            let n = self
                .reader
                .read_from_tail(distance, &mut chunk[..want])
                .await
                .map_err(|source| ZipError::Read {
                    offset: size - distance,
                    source,
                })?;
            if n == 0 {
                break;
            }

            buffer.coalesce_front(&chunk, 0, n);
            distance += n as u64;
            stats.record_pass(&buffer);

            let base = size - distance;
            let found = self
                .scan_window(&buffer, n, base, eocd.is_some(), stats.passes)
                .await?;

            match (found, eocd.take()) {
                (Some((_, Found::Eocd64(eocd64, eocd64_offset))), Some((record, eocd_offset))) => {
                    debug!(offset = eocd64_offset, entries = eocd64.total_entries, "found ZIP64 EOCD");
                    return self.finish(
                        Trailer::Zip64 {
                            eocd: record,
                            eocd64,
                        },
                        eocd_offset,
                        Some(eocd64_offset),
                        stats,
                    );
                }
                (Some((pos, Found::Eocd(record, abs))), _) => {
                    debug!(
                        offset = abs,
                        entries = record.total_entries,
                        zip64 = record.is_zip64(),
                        "found EOCD"
                    );
                    if !record.is_zip64() {
                        return self.finish(Trailer::Zip32(record), abs, None, stats);
                    }

                    // Keep the bytes from the hit onward and make the next
                    // window end exactly at the hit.
                    buffer.ensure_size(buffer.len() - pos);
                    distance -= pos as u64;
                    eocd = Some((record, abs));
                }
                (_, previous) => eocd = previous,
            }

            buffer.retain_front(chunk_size);
        }

        match eocd {
            None => Err(ZipError::EocdNotFound { searched: distance }),
            Some(_) => Err(ZipError::Zip64EocdNotFound { searched: distance }),
        }
    }

    /// Scan the newest window backward for the wanted signature.
    ///
    /// Returns the buffer position of the first decodable hit.
    async fn scan_window(
        &self,
        buffer: &GrowableBuffer,
        n: usize,
        base: u64,
        zip64: bool,
        pass: usize,
    ) -> Result<Option<(usize, Found)>> {
        let wanted = if zip64 {
            Eocd64Record::SIGNATURE
        } else {
            EocdRecord::SIGNATURE
        };

        // `+ 4` re-checks the seam: a signature split 1/3, 2/2 or 3/1
        // between this window and the previous one starts at n-3..n-1.
        let Some(top) = (n + 4).min(buffer.len()).checked_sub(4) else {
            return Ok(None);
        };
        trace!(pass, buffered = buffer.len(), top, zip64, "scanning tail window");

        for pos in (0..=top).rev() {
            if buffer.u32_at(pos) != Some(wanted) {
                continue;
            }
            let abs = base + pos as u64;

            let found = if zip64 {
                let max_extensible = self.config.eocd_search_limit();
                let parse = |data: &[u8]| Eocd64Record::parse(data, max_extensible);
                self.decode_at(buffer, pos, abs, parse)
                    .await?
                    .map(|record| Found::Eocd64(record, abs))
            } else {
                self.decode_at(buffer, pos, abs, EocdRecord::parse)
                    .await?
                    .map(|record| Found::Eocd(record, abs))
            };

            match found {
                Some(found) => return Ok(Some((pos, found))),
                None => trace!(offset = abs, "signature without a decodable record, skipping"),
            }
        }

        Ok(None)
    }

    /// Decode a record at `buffer[pos]`, reading it from the source when the
    /// buffer holds only part of it.
    ///
    /// `None` means the signature was a false hit: the record does not fit
    /// in the source or does not decode.
    async fn decode_at<T>(
        &self,
        buffer: &GrowableBuffer,
        pos: usize,
        abs: u64,
        parse: impl Fn(&[u8]) -> std::result::Result<T, RecordError>,
    ) -> Result<Option<T>> {
        let mut data = Cow::Borrowed(&buffer.as_slice()[pos..]);

        loop {
            match parse(&data) {
                Ok(record) => return Ok(Some(record)),
                Err(RecordError::Truncated { needed, .. }) if needed > data.len() => {
                    let fits = abs
                        .checked_add(needed as u64)
                        .is_some_and(|end| end <= self.reader.size());
                    if !fits {
                        return Ok(None);
                    }

                    let mut bytes = vec![0u8; needed];
                    let n = self
                        .reader
                        .read_from_head(abs, &mut bytes)
                        .await
                        .map_err(|source| ZipError::Read { offset: abs, source })?;
                    if n < needed {
                        return Err(ZipError::UnexpectedEof {
                            offset: abs,
                            expected: needed as u64,
                            actual: n as u64,
                        });
                    }
                    data = Cow::Owned(bytes);
                }
                Err(_) => return Ok(None),
            }
        }
    }

    fn finish(
        &self,
        trailer: Trailer,
        eocd_offset: u64,
        eocd64_offset: Option<u64>,
        stats: ScanStats,
    ) -> Result<LocatedTrailer> {
        let eocd = trailer.resolve();
        if eocd.disk_number != 0 || eocd.disk_with_cd != 0 {
            return Err(ZipError::MultiDiskUnsupported {
                disk_number: eocd.disk_number,
                disk_with_cd: eocd.disk_with_cd,
            });
        }

        Ok(LocatedTrailer {
            trailer,
            eocd,
            eocd_offset,
            eocd64_offset,
            stats,
        })
    }
}

enum Found {
    Eocd(EocdRecord, u64),
    Eocd64(Eocd64Record, u64),
}
