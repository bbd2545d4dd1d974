//! Filesystem abstraction for debug-info.
//!
//! This crate provides:
//! - Filesystem trait covering every side effect of a collection run
//! - RealFilesystem backed by `std::fs` and `statvfs`
//! - MockFilesystem, an in-memory implementation with fault injection

pub mod filesystem;
pub mod mock;

pub use filesystem::{Filesystem, FsError, RealFilesystem};
pub use mock::MockFilesystem;
