//! Run directory archiving.
//!
//! Compression is delegated to `tar`; this module only builds the command
//! and turns a failed exit into an error the endpoint can report verbatim.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dinfo_exec::CommandRunner;
use thiserror::Error;

/// Extension of produced archives.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Archiving failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("fail to execute command '{command}': {stderr}")]
pub struct ArchiveError {
    pub command: String,
    pub exit_code: i32,
    pub stderr: String,
}

/// File name of the archive for a run directory.
pub fn archive_name(dir_name: &str) -> String {
    format!("{}{}", dir_name, ARCHIVE_EXTENSION)
}

/// The tar invocation packing `<root>/<dir_name>` into `<root>/<dir_name>.tar.gz`.
pub fn archive_command(staging_root: &Path, dir_name: &str) -> String {
    let root = staging_root.display();
    format!(
        "tar -C {} -zcvf {}/{} {}",
        root,
        root,
        archive_name(dir_name),
        dir_name
    )
}

/// Archive a run directory. Returns the archive path.
///
/// The run directory is left in place; the caller removes it whatever the
/// outcome.
pub fn archive<R: CommandRunner>(
    runner: &R,
    staging_root: &Path,
    dir_name: &str,
    timeout: Duration,
) -> Result<PathBuf, ArchiveError> {
    let command = archive_command(staging_root, dir_name);
    let output = runner.run(&command, timeout);
    if !output.success() {
        return Err(ArchiveError {
            command,
            exit_code: output.exit_code,
            stderr: output.stderr,
        });
    }
    Ok(staging_root.join(archive_name(dir_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dinfo_exec::{CommandOutput, MockRunner};

    #[test]
    fn test_archive_command() {
        assert_eq!(
            archive_command(Path::new("/tmp/dump"), "sonic_20240101_000000000000"),
            "tar -C /tmp/dump -zcvf /tmp/dump/sonic_20240101_000000000000.tar.gz sonic_20240101_000000000000"
        );
    }

    #[test]
    fn test_archive_success_returns_path() {
        let runner = MockRunner::new();
        let path = archive(&runner, Path::new("/tmp/dump"), "sw_1", Duration::from_secs(60))
            .expect("archive");

        assert_eq!(path, PathBuf::from("/tmp/dump/sw_1.tar.gz"));
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_archive_failure_carries_command_and_stderr() {
        let runner = MockRunner::new();
        runner.respond("tar", CommandOutput::failed(2, "tar: sw_1: Cannot stat"));

        let err = archive(&runner, Path::new("/tmp/dump"), "sw_1", Duration::from_secs(60))
            .unwrap_err();

        assert_eq!(err.exit_code, 2);
        assert_eq!(
            err.to_string(),
            "fail to execute command 'tar -C /tmp/dump -zcvf /tmp/dump/sw_1.tar.gz sw_1': tar: sw_1: Cannot stat"
        );
    }

    #[test]
    fn test_archive_timeout_is_a_failure() {
        let runner = MockRunner::new();
        runner.respond("tar", CommandOutput::timed_out());

        let err = archive(&runner, Path::new("/tmp/dump"), "sw_1", Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(err.exit_code, 1);
        assert!(err.to_string().ends_with(": command timeout"));
    }
}
