//! Debug artifact collector for SONiC hosts.
//!
//! This crate provides:
//! - Request parsing and the declarative command catalog
//! - The artifact tree builder, port-channel diagnostics and archiving
//! - The persistent-storage policy
//! - The control-bus endpoint (`collect`, `check`, `ack`)
//! - CLI parsing and exit codes for the `debug-info` binary

pub mod archive;
pub mod artifacts;
pub mod catalog;
pub mod cli;
pub mod endpoint;
pub mod exit;
pub mod identity;
pub mod logger;
pub mod persist;
pub mod request;
pub mod settings;
pub mod trunk;

pub use archive::{archive, archive_command, ArchiveError};
pub use artifacts::{ArtifactCollector, CollectError};
pub use catalog::{load_catalog, parse_catalog, CatalogError, CommandCatalog, CommandSpec};
pub use cli::{dispatch, parse_from, Cli, CliError, Command};
pub use endpoint::{register, BusArgs, BusReply, DebugInfo, MODULE_NAME};
pub use identity::HostIdentity;
pub use logger::{FileLogger, Level, Logger, MockLogger, NullLogger, StderrLogger};
pub use persist::{PersistentStore, SaveOutcome};
pub use request::{CollectionRequest, LogLevel, RequestError};
pub use settings::{Settings, SettingsError};
