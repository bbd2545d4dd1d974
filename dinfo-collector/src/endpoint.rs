//! Control-bus endpoint.
//!
//! `collect`, `check` and `ack` each take the bus argument list and return a
//! `(code, message)` reply. Errors from the collection stages are flattened
//! into replies here and nowhere else.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use dinfo_clock::{run_timestamp, Clock};
use dinfo_exec::CommandRunner;
use dinfo_fs::Filesystem;

use crate::artifacts::{ArtifactCollector, CollectError};
use crate::catalog::CommandCatalog;
use crate::identity::HostIdentity;
use crate::logger::Logger;
use crate::request::CollectionRequest;
use crate::settings::Settings;

/// Name the module registers under on the bus.
pub const MODULE_NAME: &str = "debug_info";

/// Message returned by `check`.
pub const READY_MESSAGE: &str = "Artifact ready";

/// Module name for the bus host.
pub fn register() -> &'static str {
    MODULE_NAME
}

/// Arguments of a bus call. A bare string is a one-element list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusArgs(Vec<String>);

impl BusArgs {
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for BusArgs {
    fn from(arg: &str) -> Self {
        BusArgs(vec![arg.to_string()])
    }
}

impl From<String> for BusArgs {
    fn from(arg: String) -> Self {
        BusArgs(vec![arg])
    }
}

impl From<Vec<String>> for BusArgs {
    fn from(args: Vec<String>) -> Self {
        BusArgs(args)
    }
}

impl From<&[&str]> for BusArgs {
    fn from(args: &[&str]) -> Self {
        BusArgs(args.iter().map(|s| s.to_string()).collect())
    }
}

/// Reply to a bus call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusReply {
    pub code: i32,
    pub message: String,
}

impl BusReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
        }
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

impl From<CollectError> for BusReply {
    fn from(error: CollectError) -> Self {
        BusReply::failure(error.code(), error.message())
    }
}

/// The debug-info session.
///
/// Owns its collaborators and caches the host identity between calls.
pub struct DebugInfo<R, F, C, L>
where
    R: CommandRunner,
    F: Filesystem,
    C: Clock,
    L: Logger,
{
    runner: R,
    fs: F,
    clock: C,
    logger: L,
    settings: Settings,
    catalog: CommandCatalog,
    identity: HostIdentity,
}

impl<R, F, C, L> DebugInfo<R, F, C, L>
where
    R: CommandRunner,
    F: Filesystem,
    C: Clock,
    L: Logger,
{
    pub fn new(
        runner: R,
        fs: F,
        clock: C,
        logger: L,
        settings: Settings,
        catalog: CommandCatalog,
    ) -> Self {
        Self {
            runner,
            fs,
            clock,
            logger,
            settings,
            catalog,
            identity: HostIdentity::new(),
        }
    }

    /// Start with a known identity instead of querying the host.
    pub fn with_identity(mut self, identity: HostIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Collect artifacts. Replies with the archive path on success.
    pub fn collect(&mut self, args: impl Into<BusArgs>) -> BusReply {
        let args = args.into();
        let Some(raw) = args.first() else {
            return BusReply::failure(1, "invalid input: no request given");
        };
        if CollectionRequest::parse(raw).is_err() {
            return CollectError::InvalidInput(raw.to_string()).into();
        }

        self.identity.resolve(
            &self.runner,
            &self.catalog,
            self.settings.common_timeout,
            &self.logger,
        );
        let timestamp = run_timestamp(&self.clock.now());

        let collector = ArtifactCollector::new(
            &self.runner,
            &self.fs,
            &self.clock,
            &self.logger,
            &self.settings,
            &self.catalog,
        );
        match collector.collect_artifacts(
            raw,
            &timestamp,
            self.identity.board_type(),
            self.identity.hostname(),
        ) {
            Ok(path) => BusReply::ok(path.to_string_lossy()),
            Err(e) => {
                self.logger.error(&e.message());
                e.into()
            }
        }
    }

    /// Collection is synchronous, so an artifact is always ready.
    pub fn check(&self, _args: impl Into<BusArgs>) -> BusReply {
        BusReply::ok(READY_MESSAGE)
    }

    /// Delete an artifact, given either its host or container path.
    pub fn ack(&self, args: impl Into<BusArgs>) -> BusReply {
        let args = args.into();
        let Some(raw) = args.first() else {
            return BusReply::failure(1, "invalid input: no artifact given");
        };
        let Some(artifact) = normalize_artifact_path(raw, &self.settings) else {
            self.logger
                .error(&format!("refusing to remove {} outside the staging root", raw));
            return BusReply::failure(1, format!("invalid input: {}", raw));
        };

        match self.fs.remove_file(&artifact) {
            Ok(()) => {
                self.logger
                    .info(&format!("removed artifact {}", artifact.display()));
                BusReply::ok("")
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                BusReply::failure(1, format!("Artifact file not found: {}", artifact.display()))
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => BusReply::failure(
                1,
                format!("Artifact file permission denied: {}", artifact.display()),
            ),
            Err(e) => BusReply::failure(
                1,
                format!("Failed to delete artifact file with error: {}", e),
            ),
        }
    }
}

/// Map an artifact path to the host staging root.
///
/// A leading container root or staging root is stripped and the remainder is
/// placed under the staging root. Any other path is taken as relative to the
/// staging root. Returns `None` when the remainder could leave the staging
/// root (a `..` component).
pub fn normalize_artifact_path(raw: &str, settings: &Settings) -> Option<PathBuf> {
    let path = Path::new(raw);
    let relative = [&settings.container_root, &settings.staging_root]
        .into_iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);
    let relative = relative.strip_prefix("/").unwrap_or(relative);
    let contained = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    contained.then(|| settings.staging_root.join(relative))
}
