use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, ZipError};
use crate::io::ReadAt;

use super::buffer::ScanStats;
use super::config::ScanConfig;
use super::extractor::EntryExtractor;
use super::locator::{EocdLocator, LocatedTrailer};
use super::scanner::{CdirScanner, CentralDirectory};
use super::structures::{CdirRecord, EndOfCentralDirectory};

/// An opened archive: the resolved trailer, every central directory record,
/// and on-demand extraction.
///
/// Opening runs the trailer search and the central directory scan once;
/// entry data is only read when an entry is extracted.
pub struct ZipArchive<R: ReadAt> {
    reader: Arc<R>,
    config: ScanConfig,
    trailer: LocatedTrailer,
    directory: CentralDirectory,
}

impl<R: ReadAt> ZipArchive<R> {
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        Self::open_with_config(reader, ScanConfig::default()).await
    }

    /// Locate the trailer and scan the central directory.
    ///
    /// # Errors
    ///
    /// Any error from the trailer search or the central directory scan. A
    /// multi-disk trailer is rejected before the directory is read.
    pub async fn open_with_config(reader: Arc<R>, config: ScanConfig) -> Result<Self> {
        let trailer = EocdLocator::new(reader.as_ref(), config).locate().await?;
        let directory = CdirScanner::new(reader.as_ref(), config)
            .scan(&trailer.eocd)
            .await?;

        debug!(
            entries = directory.entries.len(),
            zip64 = trailer.eocd.is_zip64,
            skipped = directory.diagnostics.len(),
            "opened archive"
        );

        Ok(Self {
            reader,
            config,
            trailer,
            directory,
        })
    }

    /// The trailer with ZIP64 values merged in.
    pub fn eocd(&self) -> &EndOfCentralDirectory {
        &self.trailer.eocd
    }

    /// The raw trailer records and where they were found.
    pub fn trailer(&self) -> &LocatedTrailer {
        &self.trailer
    }

    /// Central directory records in file order.
    pub fn entries(&self) -> &[CdirRecord] {
        &self.directory.entries
    }

    /// Records skipped during the scan.
    pub fn diagnostics(&self) -> &[ZipError] {
        &self.directory.diagnostics
    }

    pub fn scan_stats(&self) -> ScanStats {
        self.directory.stats
    }

    /// First entry with exactly this name.
    pub fn find(&self, name: &str) -> Option<&CdirRecord> {
        self.entries().iter().find(|e| e.file_name == name)
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    pub fn config(&self) -> ScanConfig {
        self.config
    }

    /// Extract one entry to memory. Failures affect only this call.
    pub async fn extract(&self, entry: &CdirRecord) -> Result<Vec<u8>> {
        self.extractor().extract(entry).await
    }

    pub async fn extract_to_file(&self, entry: &CdirRecord, output_path: &Path) -> Result<()> {
        self.extractor().extract_to_file(entry, output_path).await
    }

    pub async fn extract_to_stdout(&self, entry: &CdirRecord) -> Result<()> {
        self.extractor().extract_to_stdout(entry).await
    }

    /// Drop the decoded records and hand back the byte source.
    pub fn close(self) -> Arc<R> {
        self.reader
    }

    fn extractor(&self) -> EntryExtractor<'_, R> {
        EntryExtractor::new(self.reader.as_ref(), self.config)
    }
}
