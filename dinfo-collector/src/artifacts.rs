//! Artifact tree builder.
//!
//! Drives one collection run:
//!
//! 1. counters (pre), for `critical` and `all`
//! 2. common host artifacts
//! 3. `host/core`
//! 4. port-channel diagnostics
//! 5. database dumps into `host/db`, for `critical` and `all`
//! 6. counters (post), for `critical` and `all`
//! 7. archive, then remove the run directory
//! 8. optional persistent copy
//!
//! A failing catalog command is logged and the run continues. Only invalid
//! input, filesystem errors creating the tree, and a failed archive end the
//! run with an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dinfo_clock::{counter_dir_name, Clock};
use dinfo_exec::CommandRunner;
use dinfo_fs::{Filesystem, FsError};
use thiserror::Error;

use crate::archive::{self, archive_name, ArchiveError};
use crate::catalog::{CommandCatalog, CommandSpec};
use crate::logger::Logger;
use crate::persist::PersistentStore;
use crate::request::CollectionRequest;
use crate::settings::{Settings, CORE_DIR};
use crate::trunk::collect_trunk_diagnostics;

/// Prefix of the counter snapshot taken before the heavy steps.
pub const PRE_PREFIX: &str = "pre_";

/// Prefix of the counter snapshot taken after the heavy steps.
pub const POST_PREFIX: &str = "post_";

/// Errors ending a collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Artifact collection failed: {0}")]
    Filesystem(#[from] FsError),
}

impl CollectError {
    /// Reply code for the control bus.
    pub fn code(&self) -> i32 {
        match self {
            CollectError::InvalidInput(_) => 1,
            // A zero code would read as success.
            CollectError::Archive(e) if e.exit_code != 0 => e.exit_code,
            CollectError::Archive(_) => 1,
            CollectError::Filesystem(_) => 1,
        }
    }

    /// Reply message for the control bus.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Name of the run directory: `<hostname>_<timestamp>`.
pub fn run_dir_name(hostname: &str, timestamp: &str) -> String {
    format!("{}_{}", hostname, timestamp)
}

/// Runs the collection steps against injected collaborators.
pub struct ArtifactCollector<'a, R, F, C, L>
where
    R: CommandRunner,
    F: Filesystem,
    C: Clock,
    L: Logger,
{
    runner: &'a R,
    fs: &'a F,
    clock: &'a C,
    logger: &'a L,
    settings: &'a Settings,
    catalog: &'a CommandCatalog,
}

impl<'a, R, F, C, L> ArtifactCollector<'a, R, F, C, L>
where
    R: CommandRunner,
    F: Filesystem,
    C: Clock,
    L: Logger,
{
    pub fn new(
        runner: &'a R,
        fs: &'a F,
        clock: &'a C,
        logger: &'a L,
        settings: &'a Settings,
        catalog: &'a CommandCatalog,
    ) -> Self {
        Self {
            runner,
            fs,
            clock,
            logger,
            settings,
            catalog,
        }
    }

    /// Collect, archive and optionally persist one run.
    ///
    /// Returns the absolute path of the archive in the staging root.
    pub fn collect_artifacts(
        &self,
        raw: &str,
        timestamp: &str,
        board_type: &str,
        hostname: &str,
    ) -> Result<PathBuf, CollectError> {
        let request = CollectionRequest::parse(raw)
            .map_err(|_| CollectError::InvalidInput(raw.to_string()))?;
        let counters = request.log_level.collects_counters();

        let dir_name = run_dir_name(hostname, timestamp);
        let host_dir = self.settings.host_dir(&dir_name);
        self.fs.create_dir_all(&host_dir)?;
        self.logger.info(&format!(
            "collecting {} artifacts into {}",
            request.log_level,
            host_dir.display()
        ));

        if counters {
            self.collect_counters(&host_dir, PRE_PREFIX, board_type)?;
        }

        self.run_all(&self.catalog.common, &host_dir, self.settings.common_timeout);

        self.fs.create_dir_all(&host_dir.join(CORE_DIR))?;

        collect_trunk_diagnostics(
            self.runner,
            self.fs,
            self.catalog,
            &host_dir,
            self.settings.common_timeout,
            self.logger,
        );

        if counters {
            let db_dir = self.settings.db_dir(&dir_name);
            self.fs.create_dir_all(&db_dir)?;
            self.run_all(
                &self.catalog.databases,
                &db_dir,
                self.settings.database_timeout,
            );
            self.collect_counters(&host_dir, POST_PREFIX, board_type)?;
        }

        let archived = archive::archive(
            self.runner,
            &self.settings.staging_root,
            &dir_name,
            self.settings.archive_timeout,
        );
        let run_dir = self.settings.run_dir(&dir_name);
        if let Err(e) = self.fs.remove_dir_all(&run_dir) {
            self.logger
                .warn(&format!("cannot remove {}: {}", run_dir.display(), e));
        }
        let archive_path = archived?;

        if request.use_persistent_storage {
            PersistentStore::new(self.fs, self.settings, self.logger)
                .try_save(&archive_name(&dir_name));
        }

        self.logger
            .info(&format!("artifact ready: {}", archive_path.display()));
        Ok(archive_path)
    }

    fn collect_counters(
        &self,
        host_dir: &Path,
        prefix: &str,
        board_type: &str,
    ) -> Result<(), FsError> {
        let dir = host_dir.join(counter_dir_name(prefix, &self.clock.now()));
        self.fs.create_dir_all(&dir)?;
        self.run_all(
            self.catalog.counter_commands(board_type),
            &dir,
            self.settings.counter_timeout,
        );
        Ok(())
    }

    fn run_all(&self, specs: &[CommandSpec], dir: &Path, default_timeout: Duration) {
        for spec in specs {
            let command = spec.render(dir);
            let output = self.runner.run(&command, spec.timeout_or(default_timeout));
            if !output.success() {
                self.logger.warn(&format!(
                    "fail to execute command '{}': {}",
                    command, output.stderr
                ));
            }
        }
    }
}
