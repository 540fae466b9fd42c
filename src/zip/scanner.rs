//! Backward scan of the central directory.
//!
//! The central directory is read in windows that walk from its end toward
//! its start. Every window is prepended to a [`GrowableBuffer`] and the
//! bytes not yet claimed by a record are searched forward for the CDIR
//! signature. After a record decodes the search jumps past it, so signature
//! bytes inside a file name, extra field or comment are never tried.
//!
//! A window usually starts in the middle of a record, and a signature
//! inside that partial record can decode as garbage. Candidates are
//! therefore accepted from the back: a record is kept only if it ends where
//! the next kept record starts (or at the end of the directory). Whatever is
//! left in front of the first kept record is searched again once the next
//! window has been prepended.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, trace, warn};

use crate::error::{Result, ZipError};
use crate::io::ReadAt;

use super::buffer::{GrowableBuffer, ScanStats};
use super::config::ScanConfig;
use super::structures::{CdirRecord, EndOfCentralDirectory};

/// Header of the central directory digital signature, which may follow the
/// last record inside the declared directory size.
pub const DIGITAL_SIGNATURE: u32 = 0x05054b50;

/// Decoded central directory.
#[derive(Debug)]
pub struct CentralDirectory {
    /// Records in file order.
    pub entries: Vec<CdirRecord>,
    /// Records that failed to decode and were skipped, as
    /// [`ZipError::CdirDecode`] values ordered by offset.
    pub diagnostics: Vec<ZipError>,
    pub stats: ScanStats,
}

/// Walks the central directory named by a resolved trailer.
pub struct CdirScanner<'a, R: ReadAt + ?Sized> {
    reader: &'a R,
    config: ScanConfig,
}

impl<'a, R: ReadAt + ?Sized> CdirScanner<'a, R> {
    pub fn new(reader: &'a R, config: ScanConfig) -> Self {
        Self { reader, config }
    }

    /// Decode every record in `[cd_offset, cd_offset + cd_size)`.
    ///
    /// # Errors
    ///
    /// - [`ZipError::Read`] if a window read fails.
    /// - [`ZipError::UnexpectedEof`] if the directory runs past the end of
    ///   the source.
    /// - [`ZipError::CdirCountMismatch`] if the number of decoded records
    ///   differs from the trailer's entry count.
    pub async fn scan(&self, eocd: &EndOfCentralDirectory) -> Result<CentralDirectory> {
        let cd_start = eocd.cd_offset;
        let Some(cd_end) = eocd.cd_end() else {
            return Err(ZipError::UnexpectedEof {
                offset: cd_start,
                expected: eocd.cd_size,
                actual: self.reader.size().saturating_sub(cd_start),
            });
        };

        let chunk_size = self.config.cdir_chunk_size();
        let mut chunk = vec![0u8; chunk_size.min(usize::try_from(eocd.cd_size).unwrap_or(usize::MAX))];
        let mut buffer = GrowableBuffer::new();
        let mut stats = ScanStats::default();

        let mut entries: VecDeque<(u64, CdirRecord)> = VecDeque::new();
        let mut failures: BTreeMap<u64, String> = BTreeMap::new();

        // File offset of buffer[0].
        let mut offset = cd_end;
        // Bytes from buffer[0] up to the first accepted record.
        let mut anchor = 0usize;

        debug!(cd_start, cd_end, expected = eocd.total_entries, "scanning central directory");

        while offset > cd_start {
            let want = chunk.len().min(usize::try_from(offset - cd_start).unwrap_or(usize::MAX));
            let start = offset - want as u64;
            let n = self
                .reader
                .read_from_head(start, &mut chunk[..want])
                .await
                .map_err(|source| ZipError::Read {
                    offset: start,
                    source,
                })?;
            if n < want {
                return Err(ZipError::UnexpectedEof {
                    offset: start,
                    expected: want as u64,
                    actual: n as u64,
                });
            }

            buffer.coalesce_front(&chunk, 0, n);
            offset = start;
            anchor += n;
            stats.record_pass(&buffer);

            let candidates = self.candidates(&buffer, anchor, offset, cd_start, &mut failures);
            let chain = accept_chain(&buffer, candidates, anchor);
            trace!(
                pass = stats.passes,
                buffered = buffer.len(),
                accepted = chain.len(),
                "central directory window"
            );

            for (pos, record) in chain {
                anchor = pos;
                entries.push_front((offset + pos as u64, record));
            }

            buffer.retain_front(chunk_size);
            if anchor > buffer.len() {
                debug!(
                    unclaimed = anchor,
                    kept = buffer.len(),
                    "unclaimed bytes exceed the window, dropping the excess"
                );
                anchor = buffer.len();
            }
        }

        if anchor > 0 {
            debug!(
                offset = cd_start,
                unclaimed = anchor,
                "bytes at the start of the central directory belong to no record"
            );
        }

        let diagnostics = collect_diagnostics(failures, &entries);
        for diagnostic in &diagnostics {
            warn!("skipping central directory record: {diagnostic}");
        }

        let actual = entries.len() as u64;
        if actual != eocd.total_entries {
            return Err(ZipError::CdirCountMismatch {
                expected: eocd.total_entries,
                actual,
            });
        }

        Ok(CentralDirectory {
            entries: entries.into_iter().map(|(_, record)| record).collect(),
            diagnostics,
            stats,
        })
    }

    /// Forward search of `buffer[..anchor]`, skipping past every decoded record.
    ///
    /// A record whose local header offset is not before `cd_start` counts as
    /// a decode failure.
    fn candidates(
        &self,
        buffer: &GrowableBuffer,
        anchor: usize,
        base: u64,
        cd_start: u64,
        failures: &mut BTreeMap<u64, String>,
    ) -> Vec<(usize, CdirRecord)> {
        let data = &buffer.as_slice()[..anchor];
        let mut found = Vec::new();
        let mut pos = 0usize;

        while pos + 4 <= data.len() {
            if buffer.u32_at(pos) != Some(CdirRecord::SIGNATURE) {
                pos += 1;
                continue;
            }

            let decoded = CdirRecord::parse(&data[pos..])
                .map_err(|err| err.to_string())
                .and_then(|record| {
                    // Local headers always precede the central directory.
                    if record.lfh_offset < cd_start {
                        Ok(record)
                    } else {
                        Err(format!(
                            "local header offset {} is not before the central directory at {cd_start}",
                            record.lfh_offset
                        ))
                    }
                });

            match decoded {
                Ok(record) => {
                    let size = record.record_size;
                    found.push((pos, record));
                    pos += size;
                }
                Err(reason) => {
                    failures.entry(base + pos as u64).or_insert(reason);
                    pos += 1;
                }
            }
        }

        found
    }
}

/// Keep the candidates that form an unbroken run ending at `anchor`.
///
/// Returned back to front. The last record may instead be followed by a
/// digital signature block that ends at `anchor`.
fn accept_chain(
    buffer: &GrowableBuffer,
    candidates: Vec<(usize, CdirRecord)>,
    anchor: usize,
) -> Vec<(usize, CdirRecord)> {
    let mut next = anchor;
    let mut chain = Vec::new();

    for (pos, record) in candidates.into_iter().rev() {
        let end = pos + record.record_size;
        let chained = end == next || (next == anchor && signature_block_ends_at(buffer, end, anchor));
        if chained {
            next = pos;
            chain.push((pos, record));
        } else {
            trace!(pos, end, next, "candidate does not chain");
        }
    }

    chain
}

fn signature_block_ends_at(buffer: &GrowableBuffer, pos: usize, anchor: usize) -> bool {
    if buffer.u32_at(pos) != Some(DIGITAL_SIGNATURE) {
        return false;
    }
    buffer
        .u16_at(pos + 4)
        .is_some_and(|size| pos + 6 + size as usize == anchor)
}

/// Turn decode failures into diagnostics, dropping those that sit inside an
/// accepted record (signature bytes in a name or comment).
fn collect_diagnostics(
    failures: BTreeMap<u64, String>,
    entries: &VecDeque<(u64, CdirRecord)>,
) -> Vec<ZipError> {
    failures
        .into_iter()
        .filter(|&(offset, _)| {
            let idx = entries.partition_point(|(start, _)| *start <= offset);
            idx == 0 || {
                let (start, record) = &entries[idx - 1];
                offset >= start + record.record_size as u64
            }
        })
        .map(|(offset, reason)| ZipError::cdir_decode(offset, reason))
        .collect()
}
