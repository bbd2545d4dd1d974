//! Host identity used to name collection runs.
//!
//! Board type and hostname are resolved lazily and cached on the session.
//! A field whose query failed stays unresolved, so the next collection asks
//! again instead of keeping the fallback forever.

use std::time::Duration;

use dinfo_exec::CommandRunner;

use crate::catalog::CommandCatalog;
use crate::logger::Logger;

/// Board type reported when the platform query fails.
pub const FALLBACK_BOARD_TYPE: &str = "";

/// Hostname reported when the hostname query fails.
pub const FALLBACK_HOSTNAME: &str = "switch";

/// Cached board type and hostname.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostIdentity {
    pub board_type: Option<String>,
    pub hostname: Option<String>,
}

impl HostIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query whichever fields are still unresolved.
    pub fn resolve<R: CommandRunner, L: Logger>(
        &mut self,
        runner: &R,
        catalog: &CommandCatalog,
        timeout: Duration,
        logger: &L,
    ) {
        if self.board_type.is_none() {
            self.board_type = query(runner, &catalog.board_type, timeout, logger, true);
        }
        if self.hostname.is_none() {
            self.hostname = query(runner, &catalog.hostname, timeout, logger, false);
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.board_type.is_some() && self.hostname.is_some()
    }

    /// Board type, or the fallback when unresolved.
    pub fn board_type(&self) -> &str {
        self.board_type.as_deref().unwrap_or(FALLBACK_BOARD_TYPE)
    }

    /// Hostname, or the fallback when unresolved.
    pub fn hostname(&self) -> &str {
        self.hostname.as_deref().unwrap_or(FALLBACK_HOSTNAME)
    }
}

fn query<R: CommandRunner, L: Logger>(
    runner: &R,
    command: &str,
    timeout: Duration,
    logger: &L,
    allow_empty: bool,
) -> Option<String> {
    let output = runner.run(command, timeout);
    if !output.success() {
        logger.warn(&format!(
            "fail to execute command '{}': {}",
            command, output.stderr
        ));
        return None;
    }
    let value = output.stdout.trim();
    if value.is_empty() && !allow_empty {
        logger.warn(&format!("command '{}' returned no output", command));
        return None;
    }
    Some(value.to_string())
}
