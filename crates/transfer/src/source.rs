use std::fmt;
use std::io::SeekFrom;
use std::ops::Range;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::TransferError;

/// Opaque byte source with a known total size.
///
/// Reads are positional so several chunks can be read concurrently.
pub trait ByteSource: Send + Sync {
    /// File name announced to the server.
    fn file_name(&self) -> &str;

    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Reads exactly the bytes in `range`.
    fn read_range(&self, range: Range<u64>) -> BoxFuture<'_, Result<Bytes, TransferError>>;
}

fn check_range(range: &Range<u64>, size: u64) -> Result<(), TransferError> {
    if range.start > range.end || range.end > size {
        return Err(TransferError::RangeOutOfBounds {
            start: range.start,
            end: range.end,
            size,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// FileSource
// ---------------------------------------------------------------------------

/// A file on local disk. The size is captured when the source is opened.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    file_name: String,
    size: u64,
}

impl FileSource {
    /// Opens `path` and records its current size.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TransferError> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(TransferError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            )));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransferError::InvalidFileName(path.display().to_string()))?;

        tracing::debug!(path = %path.display(), size = metadata.len(), "opened file source");
        Ok(Self {
            path,
            file_name,
            size: metadata.len(),
        })
    }

}

impl ByteSource for FileSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_range(&self, range: Range<u64>) -> BoxFuture<'_, Result<Bytes, TransferError>> {
        Box::pin(async move {
            check_range(&range, self.size)?;
            tracing::trace!(
                path = %self.path.display(),
                start = range.start,
                end = range.end,
                "reading range"
            );

            let mut file = tokio::fs::File::open(&self.path).await?;
            file.seek(SeekFrom::Start(range.start)).await?;

            let mut buf = vec![0u8; (range.end - range.start) as usize];
            file.read_exact(&mut buf).await?;
            Ok(Bytes::from(buf))
        })
    }
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// An in-memory buffer, e.g. data already received from elsewhere.
#[derive(Clone)]
pub struct MemorySource {
    file_name: String,
    data: Bytes,
}

impl MemorySource {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

impl fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySource")
            .field("file_name", &self.file_name)
            .field("size", &self.data.len())
            .finish()
    }
}

impl ByteSource for MemorySource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_range(&self, range: Range<u64>) -> BoxFuture<'_, Result<Bytes, TransferError>> {
        Box::pin(async move {
            check_range(&range, self.size())?;
            Ok(self.data.slice(range.start as usize..range.end as usize))
        })
    }
}
