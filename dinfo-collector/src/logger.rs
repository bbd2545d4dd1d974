//! Logging abstraction for testable output.
//!
//! Provides a trait-based logging system so each stage of a collection run
//! can be tested for what it reports without global logger state. The
//! process log itself is an append-only text file with one record per line.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Local;

/// Timestamp format for file log records.
const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warning,
    Info,
    Debug,
}

impl Level {
    /// Upper-case name used in log records.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }

    /// Create a threshold from a CLI verbosity count.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Level::Info,
            _ => Level::Debug,
        }
    }
}

/// Trait for logging output.
pub trait Logger: Send + Sync {
    /// Log a message at the given level.
    fn log(&self, level: Level, message: &str);

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warning, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

impl<L: Logger + ?Sized> Logger for Box<L> {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

/// Format one log record (no trailing newline).
pub fn format_record(timestamp: &str, level: Level, message: &str) -> String {
    format!("{} - {} - {}", timestamp, level.as_str(), message)
}

/// Logger appending records to a file.
#[derive(Debug)]
pub struct FileLogger {
    path: PathBuf,
    level: Level,
    file: Mutex<File>,
}

impl FileLogger {
    /// Open `path` for appending, creating it and its parent directory.
    pub fn open(path: impl Into<PathBuf>, level: Level) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            level,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Logger for FileLogger {
    fn log(&self, level: Level, message: &str) {
        if level > self.level {
            return;
        }
        let timestamp = Local::now().format(RECORD_TIME_FORMAT).to_string();
        let line = format_record(&timestamp, level, message);
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(file, "{}", line);
    }
}

/// Logger that writes to stderr.
#[derive(Debug)]
pub struct StderrLogger {
    level: Level,
}

impl StderrLogger {
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl Logger for StderrLogger {
    fn log(&self, level: Level, message: &str) {
        if level <= self.level {
            let _ = writeln!(std::io::stderr(), "{}: {}", level.as_str(), message);
        }
    }
}

/// Mock logger for testing that captures all messages.
#[derive(Debug, Clone, Default)]
pub struct MockLogger {
    messages: Arc<RwLock<Vec<LogEntry>>>,
}

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

impl MockLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured log entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.messages.read().unwrap().clone()
    }

    /// Get all captured messages (just the text).
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    /// Get messages at a specific level.
    pub fn messages_at_level(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    /// Check if any message contains the given substring.
    pub fn contains(&self, substring: &str) -> bool {
        self.messages().iter().any(|m| m.contains(substring))
    }

    /// Check if any warning contains the given substring.
    pub fn warned(&self, substring: &str) -> bool {
        self.messages_at_level(Level::Warning)
            .iter()
            .any(|m| m.contains(substring))
    }

    /// Get count of captured messages.
    pub fn count(&self) -> usize {
        self.messages.read().unwrap().len()
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Level, message: &str) {
        self.messages.write().unwrap().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

/// A no-op logger that discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Level, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // ===========================================
    // Level
    // ===========================================

    #[test]
    fn test_level_ordering() {
        assert!(Level::Error < Level::Warning);
        assert!(Level::Warning < Level::Info);
        assert!(Level::Info < Level::Debug);
    }

    #[test]
    fn test_level_names() {
        assert_eq!(Level::Warning.as_str(), "WARNING");
        assert_eq!(Level::Debug.as_str(), "DEBUG");
    }

    #[test]
    fn test_level_from_count() {
        assert_eq!(Level::from_count(0), Level::Info);
        assert_eq!(Level::from_count(1), Level::Debug);
        assert_eq!(Level::from_count(7), Level::Debug);
    }

    #[test]
    fn test_format_record() {
        assert_eq!(
            format_record("2024-01-01 00:00:00,000", Level::Warning, "disk full"),
            "2024-01-01 00:00:00,000 - WARNING - disk full"
        );
    }

    // ===========================================
    // FileLogger
    // ===========================================

    #[test]
    fn test_file_logger_appends_records() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("log").join("debug_info.log");

        let logger = FileLogger::open(&path, Level::Info).expect("open");
        logger.warn("first");
        logger.info("second");
        logger.debug("filtered out");
        drop(logger);

        let reopened = FileLogger::open(&path, Level::Info).expect("reopen");
        reopened.error("third");
        assert_eq!(reopened.path(), path.as_path());

        let content = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(" - WARNING - first"));
        assert!(lines[1].ends_with(" - INFO - second"));
        assert!(lines[2].ends_with(" - ERROR - third"));
    }

    #[test]
    fn test_file_logger_open_failure() {
        let dir = tempdir().expect("tempdir");
        // A directory cannot be opened for appending.
        assert!(FileLogger::open(dir.path(), Level::Info).is_err());
    }

    // ===========================================
    // MockLogger
    // ===========================================

    #[test]
    fn test_mock_logger_captures_all_levels() {
        let logger = MockLogger::new();
        logger.error("e");
        logger.warn("w");
        logger.info("i");
        logger.debug("d");

        let entries = logger.entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1].level, Level::Warning);
        assert_eq!(logger.messages_at_level(Level::Debug), vec!["d".to_string()]);
    }

    #[test]
    fn test_mock_logger_contains_and_warned() {
        let logger = MockLogger::new();
        logger.warn("fail to execute command 'ip route': boom");
        logger.info("collected");

        assert!(logger.contains("collected"));
        assert!(logger.warned("ip route"));
        assert!(!logger.warned("collected"));
    }

    #[test]
    fn test_mock_logger_clone_shares_entries() {
        let logger = MockLogger::new();
        let handle = logger.clone();
        handle.info("via clone");
        assert_eq!(logger.count(), 1);
    }

    #[test]
    fn test_arc_and_box_forward() {
        let logger = MockLogger::new();
        let arc: Arc<dyn Logger> = Arc::new(logger.clone());
        arc.info("arc");
        let boxed: Box<dyn Logger> = Box::new(logger.clone());
        boxed.info("box");
        assert_eq!(logger.messages(), vec!["arc".to_string(), "box".to_string()]);
    }

    #[test]
    fn test_null_and_stderr_loggers() {
        NullLogger.warn("discarded");
        StderrLogger::new(Level::Error).debug("filtered");
    }
}
