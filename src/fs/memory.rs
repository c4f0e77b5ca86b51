//! In-memory output filesystem
//!
//! Holds build output that never touches the disk. Directories are explicit
//! entries, created implicitly for every parent of a written file.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use super::{FileKind, FileStat, OutputFileSystem};

#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, mtime: SystemTime },
    Directory { mtime: SystemTime },
}

#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    entries: RwLock<BTreeMap<PathBuf, Entry>>,
}

fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `path` and all missing parents as directories
    pub fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let now = SystemTime::now();
        for dir in path.ancestors() {
            if dir.as_os_str().is_empty() {
                continue;
            }
            match entries.get(dir) {
                Some(Entry::File { .. }) => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotADirectory,
                        format!("{} is a file", dir.display()),
                    ))
                }
                Some(Entry::Directory { .. }) => {}
                None => {
                    entries.insert(dir.to_path_buf(), Entry::Directory { mtime: now });
                }
            }
        }
        Ok(())
    }

    /// Write (or replace) a file, creating parent directories
    pub fn write_file(&self, path: &Path, data: impl Into<Vec<u8>>) -> io::Result<()> {
        let path = normalize(path);
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if matches!(entries.get(&path), Some(Entry::Directory { .. })) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            ));
        }
        entries.insert(
            path,
            Entry::File {
                data: data.into(),
                mtime: SystemTime::now(),
            },
        );
        Ok(())
    }

    /// Remove a file
    pub fn remove_file(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&path) {
            Some(Entry::File { .. }) => {
                entries.remove(&path);
                Ok(())
            }
            Some(Entry::Directory { .. }) => Err(io::Error::from(io::ErrorKind::IsADirectory)),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }

    fn lookup(&self, path: &Path) -> io::Result<Entry> {
        let path = normalize(path);
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(&path) {
            return Ok(entry.clone());
        }
        // A file used as a directory component
        if path
            .ancestors()
            .skip(1)
            .any(|a| matches!(entries.get(a), Some(Entry::File { .. })))
        {
            return Err(io::Error::from(io::ErrorKind::NotADirectory));
        }
        Err(io::Error::from(io::ErrorKind::NotFound))
    }
}

impl OutputFileSystem for MemoryFileSystem {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        Ok(match self.lookup(path)? {
            Entry::File { data, mtime } => FileStat {
                kind: FileKind::File,
                size: data.len() as u64,
                mtime,
            },
            Entry::Directory { mtime } => FileStat {
                kind: FileKind::Directory,
                size: 0,
                mtime,
            },
        })
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.lookup(path)? {
            Entry::File { data, .. } => Ok(data),
            Entry::Directory { .. } => Err(io::Error::from(io::ErrorKind::IsADirectory)),
        }
    }
}
