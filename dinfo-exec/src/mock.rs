//! Scripted command runner for tests.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::runner::{CommandOutput, CommandRunner};

/// One recorded call to [`MockRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub timeout: Duration,
}

/// Mock runner that answers from a list of rules.
///
/// A rule matches when its pattern is a substring of the command; the first
/// matching rule wins. Unmatched commands succeed with empty output.
/// Cloning creates a new handle to the same rules and call log.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    rules: Arc<RwLock<Vec<(String, CommandOutput)>>>,
    calls: Arc<RwLock<Vec<Invocation>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `pattern` with `output`.
    pub fn respond(&self, pattern: impl Into<String>, output: CommandOutput) -> &Self {
        self.rules.write().unwrap().push((pattern.into(), output));
        self
    }

    /// Answer commands containing `pattern` with a failure.
    pub fn fail(&self, pattern: impl Into<String>, exit_code: i32, stderr: &str) -> &Self {
        self.respond(pattern, CommandOutput::failed(exit_code, stderr))
    }

    /// All recorded invocations, in call order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.read().unwrap().clone()
    }

    /// Recorded command strings, in call order.
    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    /// Whether any recorded command contains `pattern`.
    pub fn called(&self, pattern: &str) -> bool {
        self.count_matching(pattern) > 0
    }

    /// Number of recorded commands containing `pattern`.
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.command.contains(pattern))
            .count()
    }

    /// Index in the call log of the first command containing `pattern`.
    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .position(|c| c.command.contains(pattern))
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, command: &str, timeout: Duration) -> CommandOutput {
        self.calls.write().unwrap().push(Invocation {
            command: command.to_string(),
            timeout,
        });
        self.rules
            .read()
            .unwrap()
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_secs(20);

    #[test]
    fn test_mock_default_success() {
        let runner = MockRunner::new();
        let out = runner.run("show version", T);
        assert!(out.success());
        assert!(out.stdout.is_empty());
    }

    #[test]
    fn test_mock_first_match_wins() {
        let runner = MockRunner::new();
        runner
            .respond("redis-cli", CommandOutput::ok("first"))
            .respond("redis", CommandOutput::ok("second"));

        assert_eq!(runner.run("docker exec -i database redis-cli KEYS", T).stdout, "first");
        assert_eq!(runner.run("redis-dump -d 0", T).stdout, "second");
    }

    #[test]
    fn test_mock_fail() {
        let runner = MockRunner::new();
        runner.fail("teamdctl", 1, "no such team");
        let out = runner.run("docker exec -i teamd teamdctl PortChannel01 state dump", T);
        assert_eq!(out.exit_code, 1);
        assert_eq!(out.stderr, "no such team");
    }

    #[test]
    fn test_mock_records_calls() {
        let runner = MockRunner::new();
        runner.run("a", T);
        runner.run("b", Duration::from_secs(60));

        assert_eq!(runner.commands(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(runner.calls()[1].timeout, Duration::from_secs(60));
        assert!(runner.called("b"));
        assert!(!runner.called("c"));
        assert_eq!(runner.position("b"), Some(1));
    }

    #[test]
    fn test_mock_clone_shares_log() {
        let runner = MockRunner::new();
        let handle = runner.clone();
        handle.run("ip route", T);
        assert_eq!(runner.count_matching("ip route"), 1);
    }
}
