//! Output filesystem capability
//!
//! The middleware never touches `std::fs` directly. Build output may live on
//! disk or only in memory, so everything goes through [`OutputFileSystem`].

mod disk;
mod memory;

use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::time::SystemTime;

use tokio::io::AsyncRead;

pub use disk::DiskFileSystem;
pub use memory::MemoryFileSystem;

/// Byte stream over one artifact window
pub type ArtifactReader = Pin<Box<dyn AsyncRead + Send>>;

/// Pending open of an artifact window
pub type OpenFuture<'a> = Pin<Box<dyn Future<Output = io::Result<ArtifactReader>> + Send + 'a>>;

/// Kind of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Other,
}

/// Metadata returned by [`OutputFileSystem::stat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileKind,
    pub size: u64,
    pub mtime: SystemTime,
}

impl FileStat {
    #[inline]
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

pub trait OutputFileSystem: Send + Sync {
    /// Stat `path` without following it into the file contents
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Read the whole file
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Open the inclusive byte window `[start, end]` for streaming.
    ///
    /// The default reads the whole file and serves the window from memory;
    /// implementations with real streaming should override it.
    fn open_range<'a>(&'a self, path: &'a Path, start: u64, end: u64) -> OpenFuture<'a> {
        Box::pin(async move {
            let data = self.read_file(path)?;
            let len = u64::try_from(data.len()).unwrap_or(u64::MAX);
            let window = if start >= len {
                Vec::new()
            } else {
                let end = end.min(len - 1);
                let (from, to) = (to_index(start)?, to_index(end)?);
                data[from..=to].to_vec()
            };
            Ok(Box::pin(io::Cursor::new(window)) as ArtifactReader)
        })
    }
}

fn to_index(offset: u64) -> io::Result<usize> {
    usize::try_from(offset).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds address space"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    struct Fixed(Vec<u8>);

    impl OutputFileSystem for Fixed {
        fn stat(&self, _path: &Path) -> io::Result<FileStat> {
            Ok(FileStat {
                kind: FileKind::File,
                size: self.0.len() as u64,
                mtime: SystemTime::UNIX_EPOCH,
            })
        }

        fn read_file(&self, _path: &Path) -> io::Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    async fn read_all(mut reader: ArtifactReader) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_default_open_range() {
        let fs = Fixed(b"0123456789".to_vec());
        let path = Path::new("/x");

        let reader = fs.open_range(path, 2, 5).await.unwrap();
        assert_eq!(read_all(reader).await, b"2345");

        let reader = fs.open_range(path, 8, 100).await.unwrap();
        assert_eq!(read_all(reader).await, b"89");

        let reader = fs.open_range(path, 20, 30).await.unwrap();
        assert!(read_all(reader).await.is_empty());
    }
}
