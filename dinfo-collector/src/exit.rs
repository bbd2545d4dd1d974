//! Exit codes for the debug-info CLI.
//!
//! A bus reply's code becomes the process exit status. Errors raised before
//! the bus operation runs get their own codes.

use crate::catalog::CatalogError;
use crate::cli::CliError;

/// Exit code constants.
pub mod codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Operation failed (the bus reply code for most failures).
    pub const FAILURE: i32 = 1;
    /// Invalid arguments or settings.
    pub const INVALID_ARGS: i32 = 2;
    /// Command catalog could not be read.
    pub const CATALOG_READ_ERROR: i32 = 3;
    /// Command catalog is malformed.
    pub const CATALOG_INVALID: i32 = 4;
}

/// Map a CliError to an exit code.
pub fn exit_code(error: &CliError) -> i32 {
    match error {
        CliError::Settings(_) => codes::INVALID_ARGS,
        CliError::Catalog(CatalogError::Read(_)) => codes::CATALOG_READ_ERROR,
        CliError::Catalog(_) => codes::CATALOG_INVALID,
    }
}

/// Exit status for a bus reply code, clamped to the range a process can report.
/// A negative code is still a failure.
pub fn reply_exit_code(code: i32) -> u8 {
    if code < 0 {
        return codes::FAILURE as u8;
    }
    code.min(255) as u8
}
