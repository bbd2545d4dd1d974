//! Filesystem trait and the real implementation.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use nix::sys::statvfs::statvfs;
use thiserror::Error;

/// Errors from filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("path error: {0}")]
    Path(String),
}

impl FsError {
    /// The underlying IO error kind, used to classify failures for callers.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            FsError::Io(e) => e.kind(),
            FsError::Path(_) => io::ErrorKind::InvalidInput,
        }
    }

    /// Shorthand for an IO error of the given kind.
    pub fn io(kind: io::ErrorKind, message: impl Into<String>) -> Self {
        FsError::Io(io::Error::new(kind, message.into()))
    }
}

/// Trait for filesystem operations.
/// Abstracted for testing with mock implementations.
pub trait Filesystem: Send + Sync {
    /// Create directory and parents if needed.
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;

    /// Remove a directory tree. A missing directory is not an error.
    fn remove_dir_all(&self, path: &Path) -> Result<(), FsError>;

    /// Remove a single file.
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Create or truncate a file and write `data` to it.
    /// The parent directory must already exist.
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    /// Read file contents as a string.
    fn read_file(&self, path: &Path) -> Result<String, FsError>;

    /// Create an empty file, failing if it already exists.
    fn create_marker(&self, path: &Path) -> Result<(), FsError>;

    /// Size of a file in bytes.
    fn file_size(&self, path: &Path) -> Result<u64, FsError>;

    /// Bytes available to unprivileged users on the partition holding `path`.
    fn available_space(&self, path: &Path) -> Result<u64, FsError>;

    /// Copy a file byte-for-byte. Returns the number of bytes copied.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<u64, FsError>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path exists and is a regular file.
    fn is_file(&self, path: &Path) -> bool;
}

/// Real filesystem implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

impl Filesystem for RealFilesystem {
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), FsError> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_file(path)?;
        Ok(())
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        fs::write(path, data)?;
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<String, FsError> {
        Ok(fs::read_to_string(path)?)
    }

    fn create_marker(&self, path: &Path) -> Result<(), FsError> {
        OpenOptions::new().write(true).create_new(true).open(path)?;
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64, FsError> {
        Ok(fs::metadata(path)?.len())
    }

    fn available_space(&self, path: &Path) -> Result<u64, FsError> {
        let stats = statvfs(path).map_err(io::Error::from)?;

        #[allow(clippy::unnecessary_cast)]
        let available =
            (stats.blocks_available() as u64).saturating_mul(stats.fragment_size() as u64);
        Ok(available)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<u64, FsError> {
        Ok(fs::copy(from, to)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}
