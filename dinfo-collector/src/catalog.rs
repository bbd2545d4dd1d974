//! Command catalog.
//!
//! The shell commands a collection run executes, grouped by category and kept
//! as data so a platform can ship its own catalog as JSON without touching
//! the orchestration code.
//!
//! Templates use `{dir}` for the output directory and `{trunk}` for a
//! port-channel name.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use dinfo_fs::{Filesystem, FsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder substituted with the output directory.
pub const DIR_PLACEHOLDER: &str = "{dir}";

/// Placeholder substituted with the trunk (port-channel) name.
pub const TRUNK_PLACEHOLDER: &str = "{trunk}";

/// Errors from catalog loading.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Read(#[from] FsError),

    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog command in '{category}' has an empty template")]
    EmptyTemplate { category: String },
}

/// One command template with an optional timeout override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub template: String,

    /// Overrides the category timeout when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u64>,
}

impl CommandSpec {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            timeout_sec: None,
        }
    }

    pub fn with_timeout_sec(mut self, timeout_sec: u64) -> Self {
        self.timeout_sec = Some(timeout_sec);
        self
    }

    /// Substitute the output directory into the template.
    pub fn render(&self, dir: &Path) -> String {
        self.template.replace(DIR_PLACEHOLDER, &dir.to_string_lossy())
    }

    /// The timeout for this command, falling back to the category default.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_sec.map_or(default, Duration::from_secs)
    }
}

/// The full set of commands used by a collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandCatalog {
    /// Prints the board (platform) type on stdout.
    pub board_type: String,

    /// Prints the hostname on stdout.
    pub hostname: String,

    /// Lists link-aggregation keys, one `TABLE|PortChannelN` record per line.
    pub list_trunks: String,

    /// Dumps the state of one trunk; `{trunk}` is substituted.
    pub trunk_dump: String,

    /// Host artifacts collected at every level.
    pub common: Vec<CommandSpec>,

    /// Counter snapshot, run before and after the heavy collection steps.
    pub counters: Vec<CommandSpec>,

    /// Database dumps.
    pub databases: Vec<CommandSpec>,

    /// Counter commands for specific board types, replacing `counters`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub board_counters: BTreeMap<String, Vec<CommandSpec>>,
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self::sonic()
    }
}

impl CommandCatalog {
    /// The catalog for switches running SONiC.
    pub fn sonic() -> Self {
        let redis_dump = |db: u8, file: &str| {
            CommandSpec::new(format!(
                "docker exec -i database redis-dump -H 127.0.0.1 -p 6379 -d {} -y > {{dir}}/{}",
                db, file
            ))
        };

        Self {
            board_type: "show platform summary | grep Platform | awk '{print $2}'".to_string(),
            hostname: "hostname".to_string(),
            list_trunks: "docker exec -i database redis-cli -h localhost -n 4 --raw KEYS '*PORTCHANNEL\\|PortChannel*'"
                .to_string(),
            trunk_dump: "docker exec -i teamd teamdctl {trunk} state dump".to_string(),
            common: vec![
                CommandSpec::new("cp -r /var/log {dir}"),
                CommandSpec::new("[ -d /var/core ] && cp -r /var/core {dir}"),
                CommandSpec::new("show version > {dir}/version.txt"),
                CommandSpec::new("ip -6 route > {dir}/routing.txt"),
                CommandSpec::new("ip neigh >> {dir}/routing.txt"),
                CommandSpec::new("ip route >> {dir}/routing.txt"),
                CommandSpec::new("netstat -tplnaW | grep telemetry >> {dir}/routing.txt"),
                CommandSpec::new("ip link >> {dir}/routing.txt"),
            ],
            counters: vec![
                CommandSpec::new("top -b -n 1 -w 500 > {dir}/top.txt"),
                redis_dump(2, "counter_db.json"),
            ],
            databases: vec![
                redis_dump(0, "appl_db.json"),
                redis_dump(1, "asic_db.json"),
                redis_dump(4, "config_db.json"),
                CommandSpec::new(
                    "docker exec -i database redis-cli -n 1 hgetall VIDTORID > {dir}/vidtorid.txt",
                ),
            ],
            board_counters: BTreeMap::new(),
        }
    }

    /// Counter commands for a board, preferring a board-specific list.
    pub fn counter_commands(&self, board_type: &str) -> &[CommandSpec] {
        self.board_counters
            .get(board_type)
            .map(Vec::as_slice)
            .unwrap_or(&self.counters)
    }

    /// The dump command for one trunk.
    pub fn trunk_dump_command(&self, trunk: &str) -> String {
        self.trunk_dump.replace(TRUNK_PLACEHOLDER, trunk)
    }

    /// Reject catalogs containing blank templates.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let lists = [
            ("common", &self.common),
            ("counters", &self.counters),
            ("databases", &self.databases),
        ];
        for (category, specs) in lists {
            check_templates(category, specs)?;
        }
        for (board, specs) in &self.board_counters {
            check_templates(&format!("board_counters.{}", board), specs)?;
        }
        Ok(())
    }
}

fn check_templates(category: &str, specs: &[CommandSpec]) -> Result<(), CatalogError> {
    if specs.iter().any(|s| s.template.trim().is_empty()) {
        return Err(CatalogError::EmptyTemplate {
            category: category.to_string(),
        });
    }
    Ok(())
}

/// Load a catalog from a JSON file.
pub fn load_catalog<F: Filesystem>(fs: &F, path: &Path) -> Result<CommandCatalog, CatalogError> {
    let content = fs.read_file(path)?;
    parse_catalog(&content)
}

/// Parse and validate catalog JSON.
pub fn parse_catalog(content: &str) -> Result<CommandCatalog, CatalogError> {
    let catalog: CommandCatalog = serde_json::from_str(content)?;
    catalog.validate()?;
    Ok(catalog)
}
