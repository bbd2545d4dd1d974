//! CLI argument parsing for debug-info.
//!
//! Every bus operation is a subcommand. Global flags override the settings
//! and select the command catalog and log file.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use dinfo_clock::Clock;
use dinfo_exec::CommandRunner;
use dinfo_fs::Filesystem;
use thiserror::Error;

use crate::catalog::{load_catalog, CatalogError, CommandCatalog};
use crate::endpoint::{BusReply, DebugInfo};
use crate::logger::{Level, Logger};
use crate::settings::{
    Settings, SettingsError, DEFAULT_ARCHIVE_TIMEOUT_SECS, DEFAULT_COMMON_TIMEOUT_SECS,
    DEFAULT_CONTAINER_ROOT, DEFAULT_COUNTER_TIMEOUT_SECS, DEFAULT_DATABASE_TIMEOUT_SECS,
    DEFAULT_LOG_FILE, DEFAULT_MARKER_PATH, DEFAULT_PERSISTENT_DIR, DEFAULT_PERSISTENT_PARTITION,
    DEFAULT_RESERVED_BYTES, DEFAULT_STAGING_ROOT,
};

/// Version string shown by `--version`.
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Errors raised before a bus operation runs.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Debug artifact collector for SONiC hosts.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "debug-info")]
#[command(version = VERSION, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Directory holding run directories and archives.
    #[arg(long, global = true, default_value = DEFAULT_STAGING_ROOT)]
    pub staging_root: PathBuf,

    /// The staging directory as mounted inside containers.
    #[arg(long, global = true, default_value = DEFAULT_CONTAINER_ROOT)]
    pub container_root: PathBuf,

    /// Partition checked for free space before a persistent copy.
    #[arg(long, global = true, default_value = DEFAULT_PERSISTENT_PARTITION)]
    pub persistent_partition: PathBuf,

    /// Destination directory of the persistent copy.
    #[arg(long, global = true, default_value = DEFAULT_PERSISTENT_DIR)]
    pub persistent_dir: PathBuf,

    /// Marker recording that a persistent copy was made this boot.
    #[arg(long, global = true, default_value = DEFAULT_MARKER_PATH)]
    pub marker: PathBuf,

    /// Bytes to keep free on the persistent partition.
    #[arg(long, global = true, default_value_t = DEFAULT_RESERVED_BYTES)]
    pub reserved_bytes: u64,

    /// Timeout in seconds for common artifact commands.
    #[arg(long, global = true, default_value_t = DEFAULT_COMMON_TIMEOUT_SECS)]
    pub common_timeout: u64,

    /// Timeout in seconds for counter commands.
    #[arg(long, global = true, default_value_t = DEFAULT_COUNTER_TIMEOUT_SECS)]
    pub counter_timeout: u64,

    /// Timeout in seconds for database dumps.
    #[arg(long, global = true, default_value_t = DEFAULT_DATABASE_TIMEOUT_SECS)]
    pub database_timeout: u64,

    /// Timeout in seconds for archiving.
    #[arg(long, global = true, default_value_t = DEFAULT_ARCHIVE_TIMEOUT_SECS)]
    pub archive_timeout: u64,

    /// JSON command catalog. The built-in SONiC catalog is used when absent.
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Process log file.
    #[arg(long, global = true, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Also log debug records.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// Settings built from the flags.
    pub fn settings(&self) -> Settings {
        Settings::new()
            .with_staging_root(&self.staging_root)
            .with_container_root(&self.container_root)
            .with_persistent_storage(&self.persistent_partition, &self.persistent_dir)
            .with_marker_path(&self.marker)
            .with_reserved_bytes(self.reserved_bytes)
            .with_common_timeout(Duration::from_secs(self.common_timeout))
            .with_counter_timeout(Duration::from_secs(self.counter_timeout))
            .with_database_timeout(Duration::from_secs(self.database_timeout))
            .with_archive_timeout(Duration::from_secs(self.archive_timeout))
    }

    /// Settings built from the flags, validated.
    pub fn validated_settings(&self) -> Result<Settings, CliError> {
        let settings = self.settings();
        settings.validate()?;
        Ok(settings)
    }

    /// The catalog named by `--catalog`, or the built-in one.
    pub fn load_catalog<F: Filesystem>(&self, fs: &F) -> Result<CommandCatalog, CliError> {
        match &self.catalog {
            Some(path) => Ok(load_catalog(fs, path)?),
            None => Ok(CommandCatalog::sonic()),
        }
    }

    pub fn log_level(&self) -> Level {
        Level::from_count(self.verbose)
    }
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Collect artifacts and print the archive path.
    Collect(CollectArgs),
    /// Report whether an artifact is ready.
    Check(CheckArgs),
    /// Delete a collected artifact.
    Ack(AckArgs),
}

/// Arguments for the collect command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CollectArgs {
    /// JSON request, e.g. '{"level": "critical", "use_persistent_storage": true}'.
    #[arg(default_value = "{}")]
    pub request: String,
}

/// Arguments for the check command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CheckArgs {
    /// Ignored.
    pub args: Vec<String>,
}

/// Arguments for the ack command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct AckArgs {
    /// Archive path, on the host or inside a container.
    pub artifact: String,
}

/// Parse CLI arguments from an iterator of strings.
/// Useful for testing.
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(iter)
}

/// Run one subcommand against a session.
pub fn dispatch<R, F, C, L>(session: &mut DebugInfo<R, F, C, L>, command: &Command) -> BusReply
where
    R: CommandRunner,
    F: Filesystem,
    C: Clock,
    L: Logger,
{
    match command {
        Command::Collect(args) => session.collect(args.request.as_str()),
        Command::Check(args) => session.check(args.args.clone()),
        Command::Ack(args) => session.ack(args.artifact.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MockLogger;
    use chrono::NaiveDate;
    use dinfo_clock::MockClock;
    use dinfo_exec::MockRunner;
    use dinfo_fs::MockFilesystem;
    use std::path::Path;

    fn session() -> (
        DebugInfo<MockRunner, MockFilesystem, MockClock, MockLogger>,
        MockFilesystem,
    ) {
        let fs = MockFilesystem::new();
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let session = DebugInfo::new(
            MockRunner::new(),
            fs.clone(),
            MockClock::new(now),
            MockLogger::new(),
            Settings::default(),
            CommandCatalog::sonic(),
        );
        (session, fs)
    }

    // ===========================================
    // Parsing
    // ===========================================

    #[test]
    fn test_requires_subcommand() {
        assert!(parse_from(["debug-info"]).is_err());
    }

    #[test]
    fn test_collect_with_request() {
        let cli = parse_from(["debug-info", "collect", r#"{"level":"all"}"#]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Collect(CollectArgs {
                request: r#"{"level":"all"}"#.to_string()
            })
        );
    }

    #[test]
    fn test_collect_request_defaults_to_empty_object() {
        let cli = parse_from(["debug-info", "collect"]).expect("parse");
        match cli.command {
            Command::Collect(args) => assert_eq!(args.request, "{}"),
            _ => panic!("expected Collect"),
        }
    }

    #[test]
    fn test_check_accepts_any_arguments() {
        let cli = parse_from(["debug-info", "check", "a", "b"]).expect("parse");
        match cli.command {
            Command::Check(args) => assert_eq!(args.args, vec!["a", "b"]),
            _ => panic!("expected Check"),
        }
    }

    #[test]
    fn test_ack_requires_artifact() {
        assert!(parse_from(["debug-info", "ack"]).is_err());
        let cli = parse_from(["debug-info", "ack", "/var/dump/x.tar.gz"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Ack(AckArgs {
                artifact: "/var/dump/x.tar.gz".to_string()
            })
        );
    }

    #[test]
    fn test_defaults_match_settings() {
        let cli = parse_from(["debug-info", "check"]).expect("parse");
        assert_eq!(cli.global.settings(), Settings::default());
        assert_eq!(cli.global.log_file, PathBuf::from("/var/log/debug_info.log"));
        assert!(cli.global.catalog.is_none());
        assert_eq!(cli.global.log_level(), Level::Info);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse_from([
            "debug-info",
            "collect",
            "{}",
            "--staging-root",
            "/data/dump",
            "--reserved-bytes",
            "42",
            "--archive-timeout",
            "300",
            "-v",
        ])
        .expect("parse");

        let settings = cli.global.settings();
        assert_eq!(settings.staging_root, PathBuf::from("/data/dump"));
        assert_eq!(settings.reserved_bytes, 42);
        assert_eq!(settings.archive_timeout, Duration::from_secs(300));
        assert_eq!(cli.global.log_level(), Level::Debug);
    }

    #[test]
    fn test_non_numeric_timeout_rejected() {
        assert!(parse_from(["debug-info", "--common-timeout", "abc", "check"]).is_err());
    }

    #[test]
    fn test_validated_settings_rejects_zero_timeout() {
        let cli = parse_from(["debug-info", "--counter-timeout", "0", "check"]).expect("parse");
        let err = cli.global.validated_settings().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid settings: counter timeout must be at least 1 second"
        );
    }

    #[test]
    fn test_validated_settings_rejects_relative_root() {
        let cli = parse_from(["debug-info", "--staging-root", "dump", "check"]).expect("parse");
        assert!(matches!(
            cli.global.validated_settings(),
            Err(CliError::Settings(SettingsError::RelativePath { .. }))
        ));
    }

    // ===========================================
    // Catalog selection
    // ===========================================

    #[test]
    fn test_builtin_catalog_when_flag_absent() {
        let cli = parse_from(["debug-info", "check"]).expect("parse");
        let catalog = cli.global.load_catalog(&MockFilesystem::new()).expect("catalog");
        assert_eq!(catalog, CommandCatalog::sonic());
    }

    #[test]
    fn test_missing_catalog_file_is_an_error() {
        let cli =
            parse_from(["debug-info", "--catalog", "/etc/nope.json", "check"]).expect("parse");
        let err = cli.global.load_catalog(&MockFilesystem::new()).unwrap_err();
        assert!(matches!(err, CliError::Catalog(CatalogError::Read(_))));
    }

    // ===========================================
    // dispatch
    // ===========================================

    #[test]
    fn test_dispatch_check() {
        let (mut session, _) = session();
        let cli = parse_from(["debug-info", "check"]).expect("parse");
        assert_eq!(dispatch(&mut session, &cli.command), BusReply::ok("Artifact ready"));
    }

    #[test]
    fn test_dispatch_collect_then_ack() {
        let (mut session, fs) = session();
        let cli = parse_from(["debug-info", "collect"]).expect("parse");

        let reply = dispatch(&mut session, &cli.command);
        assert_eq!(reply.code, 0);
        fs.add_file(reply.message.clone(), b"x".to_vec());

        let container_path = reply.message.replacen("/tmp/dump", "/var/dump", 1);
        let cli = parse_from(["debug-info", "ack", container_path.as_str()]).expect("parse");
        assert_eq!(dispatch(&mut session, &cli.command), BusReply::ok(""));
        assert!(!fs.exists(Path::new(&reply.message)));
    }

    #[test]
    fn test_dispatch_collect_invalid() {
        let (mut session, _) = session();
        let cli = parse_from(["debug-info", "collect", "nope"]).expect("parse");
        assert_eq!(
            dispatch(&mut session, &cli.command),
            BusReply::failure(1, "invalid input: nope")
        );
    }
}
