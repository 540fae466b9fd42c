use std::io;
use std::sync::Arc;

use async_trait::async_trait;

use super::ReadAt;

/// In-memory byte source.
///
/// Cheap to clone; clones share the same backing bytes.
#[derive(Debug, Clone)]
pub struct MemoryReader {
    data: Arc<[u8]>,
}

impl MemoryReader {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for MemoryReader {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

#[async_trait]
impl ReadAt for MemoryReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.data.len() {
            return Ok(0);
        }

        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
