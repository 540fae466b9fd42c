//! Random-access byte sources.
//!
//! Everything the archive reader needs from storage is expressed through
//! [`ReadAt`]: positional reads plus the total size. Reads relative to the
//! start (`read_from_head`) and to the end (`read_from_tail`) are provided
//! on top of that and clamp to the source bounds instead of failing.

mod http;
mod local;
mod memory;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;
pub use memory::MemoryReader;

use std::io;

use async_trait::async_trait;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer.
    ///
    /// May return fewer bytes than requested; `Ok(0)` means end of source.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Read `buf.len()` bytes starting at `offset`.
    ///
    /// The request is clamped to the end of the source, so the returned count
    /// is short only when the source ends first. An `offset` past the end is
    /// an `InvalidInput` error.
    async fn read_from_head(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.size();
        if offset > size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("offset {offset} is past the end of a {size} byte source"),
            ));
        }

        let available = usize::try_from(size - offset).unwrap_or(usize::MAX);
        let want = buf.len().min(available);

        let mut filled = 0;
        while filled < want {
            let n = self
                .read_at(offset + filled as u64, &mut buf[filled..want])
                .await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        Ok(filled)
    }

    /// Read up to `buf.len()` bytes ending `distance` bytes before the end.
    ///
    /// The bytes land at the front of `buf`. Near the start of the source
    /// fewer bytes are returned; `Ok(0)` once `distance` reaches the size.
    async fn read_from_tail(&self, distance: u64, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.size();
        if distance > size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("distance {distance} is past the start of a {size} byte source"),
            ));
        }

        let end = size - distance;
        let len = (buf.len() as u64).min(end);
        let start = end - len;
        self.read_from_head(start, &mut buf[..len as usize]).await
    }
}
