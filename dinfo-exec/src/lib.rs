//! Command execution for debug-info.
//!
//! This crate provides:
//! - `CommandRunner` trait: run a shell command with a timeout, never failing
//! - `ShellRunner` executing through `sh -c`
//! - `MockRunner` with scripted responses for tests

pub mod mock;
pub mod runner;

pub use mock::{Invocation, MockRunner};
pub use runner::{CommandOutput, CommandRunner, ShellRunner, SPAWN_FAILURE_CODE, TIMEOUT_MARKER};
