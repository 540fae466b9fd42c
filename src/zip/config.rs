//! Tunables for the scanning passes and entry extraction.

use super::structures::CdirRecord;

/// Default window for the backward EOCD search.
pub const DEFAULT_EOCD_CHUNK_SIZE: usize = 64;

/// How far back from the end of the file the EOCD search may go.
pub const DEFAULT_EOCD_SEARCH_LIMIT: u64 = 4 * 1024 * 1024;

/// Default window for the central directory scan.
pub const DEFAULT_CDIR_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Bytes read past the compressed size to cover the local header.
pub const DEFAULT_EXTRACT_SLACK: usize = 1024;

/// Smallest EOCD window: one signature.
const MIN_EOCD_CHUNK_SIZE: usize = 4;

/// Chunk sizes and limits used while reading an archive.
///
/// ```
/// use zipseek::ScanConfig;
///
/// let config = ScanConfig::default().with_eocd_chunk_size(4);
/// assert_eq!(config.eocd_chunk_size(), 4);
/// assert_eq!(config.cdir_chunk_size(), 2 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    eocd_chunk_size: usize,
    eocd_search_limit: u64,
    cdir_chunk_size: usize,
    extract_slack: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            eocd_chunk_size: DEFAULT_EOCD_CHUNK_SIZE,
            eocd_search_limit: DEFAULT_EOCD_SEARCH_LIMIT,
            cdir_chunk_size: DEFAULT_CDIR_CHUNK_SIZE,
            extract_slack: DEFAULT_EXTRACT_SLACK,
        }
    }
}

impl ScanConfig {
    /// Window size for the EOCD search; at least 4 bytes.
    pub fn with_eocd_chunk_size(mut self, size: usize) -> Self {
        self.eocd_chunk_size = size.max(MIN_EOCD_CHUNK_SIZE);
        self
    }

    pub fn with_eocd_search_limit(mut self, limit: u64) -> Self {
        self.eocd_search_limit = limit;
        self
    }

    /// Window size for the central directory scan.
    ///
    /// Clamped to at least [`CdirRecord::MAX_SIZE`] so a record that starts
    /// in one window always ends inside the retained part of the buffer.
    pub fn with_cdir_chunk_size(mut self, size: usize) -> Self {
        self.cdir_chunk_size = size.max(CdirRecord::MAX_SIZE);
        self
    }

    pub fn with_extract_slack(mut self, slack: usize) -> Self {
        self.extract_slack = slack;
        self
    }

    pub fn eocd_chunk_size(&self) -> usize {
        self.eocd_chunk_size
    }

    pub fn eocd_search_limit(&self) -> u64 {
        self.eocd_search_limit
    }

    pub fn cdir_chunk_size(&self) -> usize {
        self.cdir_chunk_size
    }

    pub fn extract_slack(&self) -> usize {
        self.extract_slack
    }
}
