//! Persistent copy of an archive.
//!
//! At most one archive per boot is mirrored onto the persistent partition.
//! A zero-byte marker in volatile storage records that the save was
//! attempted; once it exists no further copy is made until it is removed
//! externally (normally by a reboot). The copy also requires the partition
//! to keep `reserved_bytes` free after the archive lands.
//!
//! Every step is best effort: the outcome is logged and returned for
//! inspection, but never fails the collection that triggered it.

use std::path::PathBuf;

use dinfo_fs::Filesystem;

use crate::logger::Logger;
use crate::settings::Settings;

/// Which branch of the save policy was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The marker already existed.
    AlreadySaved,
    /// The marker could not be created.
    GuardFailed,
    /// The source archive does not exist.
    SourceMissing,
    /// Free space on the partition could not be determined.
    SpaceQueryFailed,
    /// Not enough free space for the archive plus the reservation.
    InsufficientSpace { required: u64, available: u64 },
    /// The destination directory or copy failed.
    CopyFailed,
    /// The archive was copied to the given path.
    Saved(PathBuf),
}

/// Saves archives to the persistent partition.
pub struct PersistentStore<'a, F: Filesystem, L: Logger> {
    fs: &'a F,
    settings: &'a Settings,
    logger: &'a L,
}

impl<'a, F: Filesystem, L: Logger> PersistentStore<'a, F, L> {
    pub fn new(fs: &'a F, settings: &'a Settings, logger: &'a L) -> Self {
        Self {
            fs,
            settings,
            logger,
        }
    }

    /// Try to copy `<staging_root>/<archive_name>` into the persistent directory.
    pub fn try_save(&self, archive_name: &str) -> SaveOutcome {
        let marker = &self.settings.marker_path;
        if self.fs.is_file(marker) {
            self.logger.warn(&format!(
                "{} already exists, skipping saving artifacts to persistent storage",
                marker.display()
            ));
            return SaveOutcome::AlreadySaved;
        }
        if let Err(e) = self.fs.create_marker(marker) {
            self.logger.warn(&format!(
                "error creating flag in tmp: {}. Error: {}",
                marker.display(),
                e
            ));
            return SaveOutcome::GuardFailed;
        }

        // Only the latest saved archive is kept.
        let dest_dir = &self.settings.persistent_dir;
        if let Err(e) = self.fs.remove_dir_all(dest_dir) {
            self.logger
                .debug(&format!("cannot clear {}: {}", dest_dir.display(), e));
        }

        let source = self.settings.archive_path(archive_name);
        let size = match self.fs.file_size(&source) {
            Ok(size) => size,
            Err(_) => {
                self.logger
                    .warn(&format!("path {} did not exist", source.display()));
                return SaveOutcome::SourceMissing;
            }
        };

        let partition = &self.settings.persistent_partition;
        let available = match self.fs.available_space(partition) {
            Ok(available) => available,
            Err(e) => {
                self.logger.warn(&format!(
                    "cannot determine free space on {}: {}. Not saving artifacts to persistent storage",
                    partition.display(),
                    e
                ));
                return SaveOutcome::SpaceQueryFailed;
            }
        };
        let required = self.settings.reserved_bytes.saturating_add(size);
        if available < required {
            self.logger.warn(&format!(
                "free space remaining on {} is less than {}: {}. Not saving artifacts to persistent storage",
                partition.display(),
                required,
                available
            ));
            return SaveOutcome::InsufficientSpace {
                required,
                available,
            };
        }

        let dest = dest_dir.join(archive_name);
        let copied = self
            .fs
            .create_dir_all(dest_dir)
            .and_then(|()| self.fs.copy_file(&source, &dest));
        match copied {
            Ok(bytes) => {
                self.logger.info(&format!(
                    "saved {} ({} bytes) to persistent storage",
                    dest.display(),
                    bytes
                ));
                SaveOutcome::Saved(dest)
            }
            Err(e) => {
                self.logger.warn(&format!(
                    "fail to copy '{}' to '{}': {}",
                    source.display(),
                    dest.display(),
                    e
                ));
                SaveOutcome::CopyFailed
            }
        }
    }
}
