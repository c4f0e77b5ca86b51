// Real-disk output filesystem

use std::io::{self, SeekFrom};
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::{ArtifactReader, FileKind, FileStat, OpenFuture, OutputFileSystem};

/// Serves build output straight from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem;

impl OutputFileSystem for DiskFileSystem {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(path)?;
        let kind = if meta.is_file() {
            FileKind::File
        } else if meta.is_dir() {
            FileKind::Directory
        } else {
            FileKind::Other
        };
        Ok(FileStat {
            kind,
            size: meta.len(),
            mtime: meta.modified()?,
        })
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn open_range<'a>(&'a self, path: &'a Path, start: u64, end: u64) -> OpenFuture<'a> {
        Box::pin(async move {
            let mut file = tokio::fs::File::open(path).await?;
            file.seek(SeekFrom::Start(start)).await?;
            let limit = end.saturating_sub(start).saturating_add(1);
            Ok(Box::pin(file.take(limit)) as ArtifactReader)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bundle.js");
        std::fs::write(&file, b"console.log(1);").unwrap();

        let stat = DiskFileSystem.stat(&file).unwrap();
        assert!(stat.is_file());
        assert_eq!(stat.size, 15);

        let stat = DiskFileSystem.stat(dir.path()).unwrap();
        assert!(stat.is_dir());

        let missing = DiskFileSystem.stat(&dir.path().join("nope.js"));
        assert_eq!(missing.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_open_range_streams_window() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.bin");
        std::fs::write(&file, b"abcdefghij").unwrap();

        let mut reader = DiskFileSystem.open_range(&file, 3, 6).await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"defg");
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DiskFileSystem
            .open_range(&dir.path().join("gone.js"), 0, 0)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
