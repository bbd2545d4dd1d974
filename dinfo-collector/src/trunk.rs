//! Port-channel diagnostics.
//!
//! Lists the link-aggregation keys in the state database and dumps the
//! teamd state of each trunk into `teamdctl_<trunk>.txt`. Nothing here is
//! reported to the caller; every failure ends up in the log.

use std::path::Path;
use std::time::Duration;

use dinfo_exec::CommandRunner;
use dinfo_fs::Filesystem;

use crate::catalog::CommandCatalog;
use crate::logger::Logger;

/// Field separator in state database keys (`TABLE|PortChannel01`).
pub const KEY_SEPARATOR: char = '|';

/// File name for one trunk's dump.
pub fn dump_file_name(trunk: &str) -> String {
    format!("teamdctl_{}.txt", trunk)
}

/// Extract trunk ids from the key listing. Records without a second field
/// are skipped.
pub fn parse_trunk_ids(listing: &str) -> Vec<&str> {
    listing
        .trim()
        .split('\n')
        .filter_map(|line| line.split(KEY_SEPARATOR).nth(1))
        .collect()
}

/// Dump every trunk's state into `out_dir`.
pub fn collect_trunk_diagnostics<R, F, L>(
    runner: &R,
    fs: &F,
    catalog: &CommandCatalog,
    out_dir: &Path,
    timeout: Duration,
    logger: &L,
) where
    R: CommandRunner,
    F: Filesystem,
    L: Logger,
{
    let listing = runner.run(&catalog.list_trunks, timeout);
    if !listing.success() {
        logger.warn(&format!(
            "Error running Redis command '{}' (exit {}): {}",
            catalog.list_trunks, listing.exit_code, listing.stderr
        ));
        return;
    }

    for trunk in parse_trunk_ids(&listing.stdout) {
        let dump = runner.run(&catalog.trunk_dump_command(trunk), timeout);
        if !dump.success() {
            logger.warn(&format!(
                "Error running teamdctl for {}: {}",
                trunk, dump.stderr
            ));
            continue;
        }

        let path = out_dir.join(dump_file_name(trunk));
        if let Err(e) = fs.write_file(&path, dump.stdout.as_bytes()) {
            logger.debug(&format!(
                "cannot write {}: {}; skipping remaining trunks",
                path.display(),
                e
            ));
            return;
        }
    }
}
