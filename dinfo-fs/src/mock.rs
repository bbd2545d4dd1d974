//! In-memory filesystem for tests.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::filesystem::{Filesystem, FsError};

#[derive(Debug)]
struct MockState {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
    denied: Vec<PathBuf>,
    available: u64,
    space_query_fails: bool,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            files: HashMap::new(),
            dirs: HashSet::new(),
            denied: Vec::new(),
            available: u64::MAX,
            space_query_fails: false,
        }
    }
}

impl MockState {
    fn check_allowed(&self, path: &Path) -> Result<(), FsError> {
        if self.denied.iter().any(|prefix| path.starts_with(prefix)) {
            return Err(FsError::io(
                ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }
        Ok(())
    }

    fn check_parent(&self, path: &Path) -> Result<(), FsError> {
        match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() || parent == Path::new("/") => Ok(()),
            None => Ok(()),
            Some(parent) if self.dirs.contains(parent) => Ok(()),
            Some(parent) => Err(FsError::io(
                ErrorKind::NotFound,
                format!("no such directory: {}", parent.display()),
            )),
        }
    }

    fn insert_dir_with_ancestors(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }
}

/// Mock filesystem for testing.
/// Cloning creates a new handle to the same underlying data.
///
/// Directories are tracked explicitly: writing a file requires its parent
/// directory to exist, which lets tests reproduce a staging directory
/// vanishing mid-run. Paths under a prefix passed to [`MockFilesystem::deny`]
/// fail every mutating call with `PermissionDenied`.
#[derive(Debug, Clone, Default)]
pub struct MockFilesystem {
    state: Arc<RwLock<MockState>>,
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all files in the mock filesystem.
    pub fn files(&self) -> HashMap<PathBuf, Vec<u8>> {
        self.state.read().unwrap().files.clone()
    }

    /// Get content of a specific file.
    pub fn get_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.state.read().unwrap().files.get(path).cloned()
    }

    /// Add a file directly (for test setup). Parent directories are created.
    pub fn add_file(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        let path = path.into();
        let mut state = self.state.write().unwrap();
        if let Some(parent) = path.parent() {
            state.insert_dir_with_ancestors(parent);
        }
        state.files.insert(path, data.into());
    }

    /// Whether a directory has been created.
    pub fn has_dir(&self, path: &Path) -> bool {
        self.state.read().unwrap().dirs.contains(path)
    }

    /// All directories currently present.
    pub fn dirs(&self) -> HashSet<PathBuf> {
        self.state.read().unwrap().dirs.clone()
    }

    /// Files whose path lies under `dir`.
    pub fn files_under(&self, dir: &Path) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .state
            .read()
            .unwrap()
            .files
            .keys()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    /// Set the value reported by `available_space` for every path.
    pub fn set_available_space(&self, bytes: u64) {
        self.state.write().unwrap().available = bytes;
    }

    /// Make every `available_space` query fail.
    pub fn fail_space_query(&self) {
        self.state.write().unwrap().space_query_fails = true;
    }

    /// Deny every mutating operation on paths under `prefix`.
    pub fn deny(&self, prefix: impl Into<PathBuf>) {
        self.state.write().unwrap().denied.push(prefix.into());
    }
}

impl Filesystem for MockFilesystem {
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        state.check_allowed(path)?;
        state.insert_dir_with_ancestors(path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        state.check_allowed(path)?;
        state.files.retain(|p, _| !p.starts_with(path));
        state.dirs.retain(|p| !p.starts_with(path));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        state.check_allowed(path)?;
        if state.files.remove(path).is_none() {
            return Err(FsError::io(
                ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            ));
        }
        Ok(())
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        state.check_allowed(path)?;
        state.check_parent(path)?;
        state.files.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<String, FsError> {
        let state = self.state.read().unwrap();
        match state.files.get(path) {
            Some(data) => String::from_utf8(data.clone())
                .map_err(|e| FsError::Path(format!("invalid utf8: {}", e))),
            None => Err(FsError::io(
                ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )),
        }
    }

    fn create_marker(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        state.check_allowed(path)?;
        state.check_parent(path)?;
        if state.files.contains_key(path) || state.dirs.contains(path) {
            return Err(FsError::io(
                ErrorKind::AlreadyExists,
                format!("file exists: {}", path.display()),
            ));
        }
        state.files.insert(path.to_path_buf(), Vec::new());
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64, FsError> {
        match self.state.read().unwrap().files.get(path) {
            Some(data) => Ok(data.len() as u64),
            None => Err(FsError::io(
                ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )),
        }
    }

    fn available_space(&self, path: &Path) -> Result<u64, FsError> {
        let state = self.state.read().unwrap();
        if state.space_query_fails {
            return Err(FsError::io(
                ErrorKind::Other,
                format!("statvfs failed: {}", path.display()),
            ));
        }
        Ok(state.available)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<u64, FsError> {
        let mut state = self.state.write().unwrap();
        state.check_allowed(to)?;
        state.check_parent(to)?;
        let data = match state.files.get(from) {
            Some(data) => data.clone(),
            None => {
                return Err(FsError::io(
                    ErrorKind::NotFound,
                    format!("file not found: {}", from.display()),
                ))
            }
        };
        let len = data.len() as u64;
        state.files.insert(to.to_path_buf(), data);
        Ok(len)
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.state.read().unwrap();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.state.read().unwrap().files.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_create_dir_all_registers_ancestors() {
        let fs = MockFilesystem::new();
        fs.create_dir_all(Path::new("/tmp/dump/run/host")).expect("create");

        assert!(fs.has_dir(Path::new("/tmp")));
        assert!(fs.has_dir(Path::new("/tmp/dump/run")));
        assert!(fs.exists(Path::new("/tmp/dump/run/host")));
    }

    #[test]
    fn test_mock_write_requires_parent() {
        let fs = MockFilesystem::new();
        let err = fs
            .write_file(Path::new("/tmp/dump/out.txt"), b"x")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        fs.create_dir_all(Path::new("/tmp/dump")).expect("create");
        fs.write_file(Path::new("/tmp/dump/out.txt"), b"x").expect("write");
        assert_eq!(fs.get_file(Path::new("/tmp/dump/out.txt")), Some(b"x".to_vec()));
        assert_eq!(fs.read_file(Path::new("/tmp/dump/out.txt")).expect("read"), "x");
    }

    #[test]
    fn test_mock_write_at_root_allowed() {
        let fs = MockFilesystem::new();
        fs.write_file(Path::new("/flag"), b"").expect("write");
        assert!(fs.is_file(Path::new("/flag")));
    }

    #[test]
    fn test_mock_remove_dir_all_removes_subtree_only() {
        let fs = MockFilesystem::new();
        fs.add_file("/tmp/dump/run/host/version.txt", "v");
        fs.add_file("/tmp/dump/run.tar.gz", "gz");

        fs.remove_dir_all(Path::new("/tmp/dump/run")).expect("remove");

        assert!(!fs.exists(Path::new("/tmp/dump/run")));
        assert!(!fs.exists(Path::new("/tmp/dump/run/host/version.txt")));
        assert!(fs.is_file(Path::new("/tmp/dump/run.tar.gz")));
        assert!(fs.has_dir(Path::new("/tmp/dump")));
    }

    #[test]
    fn test_mock_remove_file_missing() {
        let fs = MockFilesystem::new();
        let err = fs.remove_file(Path::new("/tmp/dump/x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_mock_deny_blocks_mutations() {
        let fs = MockFilesystem::new();
        fs.add_file("/var/log/dump/old.tar.gz", "old");
        fs.deny("/var/log/dump");

        assert_eq!(
            fs.remove_file(Path::new("/var/log/dump/old.tar.gz"))
                .unwrap_err()
                .kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            fs.create_dir_all(Path::new("/var/log/dump/sub"))
                .unwrap_err()
                .kind(),
            ErrorKind::PermissionDenied
        );
        // Reads are unaffected.
        assert!(fs.is_file(Path::new("/var/log/dump/old.tar.gz")));
    }

    #[test]
    fn test_mock_create_marker_exclusive() {
        let fs = MockFilesystem::new();
        fs.create_dir_all(Path::new("/tmp")).expect("create");
        fs.create_marker(Path::new("/tmp/flag")).expect("marker");
        assert_eq!(fs.file_size(Path::new("/tmp/flag")).expect("size"), 0);
        assert_eq!(
            fs.create_marker(Path::new("/tmp/flag")).unwrap_err().kind(),
            ErrorKind::AlreadyExists
        );
    }

    #[test]
    fn test_mock_available_space() {
        let fs = MockFilesystem::new();
        assert_eq!(fs.available_space(Path::new("/var/log")).expect("space"), u64::MAX);

        fs.set_available_space(1000);
        assert_eq!(fs.available_space(Path::new("/var/log")).expect("space"), 1000);

        fs.fail_space_query();
        assert!(fs.available_space(Path::new("/var/log")).is_err());
    }

    #[test]
    fn test_mock_copy_file() {
        let fs = MockFilesystem::new();
        fs.add_file("/tmp/dump/a.tar.gz", "data");
        fs.create_dir_all(Path::new("/var/log/dump")).expect("create");

        let copied = fs
            .copy_file(
                Path::new("/tmp/dump/a.tar.gz"),
                Path::new("/var/log/dump/a.tar.gz"),
            )
            .expect("copy");
        assert_eq!(copied, 4);
        assert_eq!(
            fs.get_file(Path::new("/var/log/dump/a.tar.gz")),
            Some(b"data".to_vec())
        );
    }

    #[test]
    fn test_mock_copy_missing_source() {
        let fs = MockFilesystem::new();
        fs.create_dir_all(Path::new("/var/log/dump")).expect("create");
        let err = fs
            .copy_file(Path::new("/tmp/none"), Path::new("/var/log/dump/none"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_mock_clone_shares_state() {
        let fs = MockFilesystem::new();
        let handle = fs.clone();
        handle.add_file("/tmp/a", "1");
        assert!(fs.is_file(Path::new("/tmp/a")));
        assert_eq!(fs.files_under(Path::new("/tmp")), vec![PathBuf::from("/tmp/a")]);
    }
}
