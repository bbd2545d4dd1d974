//! Collector settings.
//!
//! Paths, the persistent-storage reservation and per-category timeouts.
//! Defaults match a SONiC host; every value can be overridden from the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Volatile staging area for run directories and archives.
pub const DEFAULT_STAGING_ROOT: &str = "/tmp/dump";

/// The staging area as seen from inside containers.
pub const DEFAULT_CONTAINER_ROOT: &str = "/var/dump";

/// Partition whose free space gates the persistent copy.
pub const DEFAULT_PERSISTENT_PARTITION: &str = "/var/log/";

/// Destination directory for the persistent copy.
pub const DEFAULT_PERSISTENT_DIR: &str = "/var/log/dump";

/// Marker recording that a persistent save already happened this boot.
pub const DEFAULT_MARKER_PATH: &str = "/tmp/nonvolatile_saved";

/// Bytes that must stay free on the persistent partition after the copy.
pub const DEFAULT_RESERVED_BYTES: u64 = 500_000_000;

/// Process log file.
pub const DEFAULT_LOG_FILE: &str = "/var/log/debug_info.log";

pub const DEFAULT_COMMON_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_COUNTER_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_DATABASE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_ARCHIVE_TIMEOUT_SECS: u64 = 60;

/// Name of the host subtree inside a run directory.
pub const HOST_DIR: &str = "host";

/// Core dumps directory inside the host subtree.
pub const CORE_DIR: &str = "core";

/// Database dumps directory inside the host subtree.
pub const DB_DIR: &str = "db";

/// Errors from settings validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{name} must be an absolute path, got {path}")]
    RelativePath { name: &'static str, path: PathBuf },

    #[error("{name} timeout must be at least 1 second")]
    ZeroTimeout { name: &'static str },
}

/// Collector settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub staging_root: PathBuf,
    pub container_root: PathBuf,
    pub persistent_partition: PathBuf,
    pub persistent_dir: PathBuf,
    pub marker_path: PathBuf,
    pub reserved_bytes: u64,
    pub common_timeout: Duration,
    pub counter_timeout: Duration,
    pub database_timeout: Duration,
    pub archive_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            staging_root: PathBuf::from(DEFAULT_STAGING_ROOT),
            container_root: PathBuf::from(DEFAULT_CONTAINER_ROOT),
            persistent_partition: PathBuf::from(DEFAULT_PERSISTENT_PARTITION),
            persistent_dir: PathBuf::from(DEFAULT_PERSISTENT_DIR),
            marker_path: PathBuf::from(DEFAULT_MARKER_PATH),
            reserved_bytes: DEFAULT_RESERVED_BYTES,
            common_timeout: Duration::from_secs(DEFAULT_COMMON_TIMEOUT_SECS),
            counter_timeout: Duration::from_secs(DEFAULT_COUNTER_TIMEOUT_SECS),
            database_timeout: Duration::from_secs(DEFAULT_DATABASE_TIMEOUT_SECS),
            archive_timeout: Duration::from_secs(DEFAULT_ARCHIVE_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the staging root.
    pub fn with_staging_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_root = path.into();
        self
    }

    /// Builder: set the container-side staging root.
    pub fn with_container_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.container_root = path.into();
        self
    }

    /// Builder: set the persistent partition and destination directory.
    pub fn with_persistent_storage(
        mut self,
        partition: impl Into<PathBuf>,
        dir: impl Into<PathBuf>,
    ) -> Self {
        self.persistent_partition = partition.into();
        self.persistent_dir = dir.into();
        self
    }

    /// Builder: set the marker path.
    pub fn with_marker_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.marker_path = path.into();
        self
    }

    /// Builder: set the reserved byte floor.
    pub fn with_reserved_bytes(mut self, bytes: u64) -> Self {
        self.reserved_bytes = bytes;
        self
    }

    /// Builder: set the common command timeout.
    pub fn with_common_timeout(mut self, timeout: Duration) -> Self {
        self.common_timeout = timeout;
        self
    }

    /// Builder: set the counter command timeout.
    pub fn with_counter_timeout(mut self, timeout: Duration) -> Self {
        self.counter_timeout = timeout;
        self
    }

    /// Builder: set the database dump timeout.
    pub fn with_database_timeout(mut self, timeout: Duration) -> Self {
        self.database_timeout = timeout;
        self
    }

    /// Builder: set the archive timeout.
    pub fn with_archive_timeout(mut self, timeout: Duration) -> Self {
        self.archive_timeout = timeout;
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let paths: [(&'static str, &Path); 5] = [
            ("staging-root", &self.staging_root),
            ("container-root", &self.container_root),
            ("persistent-partition", &self.persistent_partition),
            ("persistent-dir", &self.persistent_dir),
            ("marker", &self.marker_path),
        ];
        for (name, path) in paths {
            if !path.is_absolute() {
                return Err(SettingsError::RelativePath {
                    name,
                    path: path.to_path_buf(),
                });
            }
        }

        let timeouts = [
            ("common", self.common_timeout),
            ("counter", self.counter_timeout),
            ("database", self.database_timeout),
            ("archive", self.archive_timeout),
        ];
        for (name, timeout) in timeouts {
            if timeout.is_zero() {
                return Err(SettingsError::ZeroTimeout { name });
            }
        }
        Ok(())
    }

    /// `<staging_root>/<dir_name>`
    pub fn run_dir(&self, dir_name: &str) -> PathBuf {
        self.staging_root.join(dir_name)
    }

    /// `<staging_root>/<dir_name>/host`
    pub fn host_dir(&self, dir_name: &str) -> PathBuf {
        self.run_dir(dir_name).join(HOST_DIR)
    }

    /// `<staging_root>/<dir_name>/host/db`
    pub fn db_dir(&self, dir_name: &str) -> PathBuf {
        self.host_dir(dir_name).join(DB_DIR)
    }

    /// `<staging_root>/<archive_name>`
    pub fn archive_path(&self, archive_name: &str) -> PathBuf {
        self.staging_root.join(archive_name)
    }
}
