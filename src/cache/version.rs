//! File fingerprints for cache invalidation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The observed state of a source file: path, modification time and
/// SHA-256 of its contents.
///
/// Equality requires all three to match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileVersion {
    pub path: PathBuf,
    /// Modification time in nanoseconds since the Unix epoch.
    pub modified: u64,
    /// Lowercase hex SHA-256 of the contents.
    pub hash: String,
}

impl FileVersion {
    /// Fingerprint a file on disk.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let contents = fs::read(path)?;
        Self::from_read(path, &contents)
    }

    /// Fingerprint contents that were already read from `path`; only the
    /// modification time is taken from the filesystem.
    pub fn from_read(path: &Path, contents: &[u8]) -> std::io::Result<Self> {
        let modified = fs::metadata(path)?.modified()?;
        Ok(Self::from_contents(
            path.to_path_buf(),
            nanos_since_epoch(modified),
            contents,
        ))
    }

    pub fn from_contents(path: PathBuf, modified: u64, contents: &[u8]) -> Self {
        Self {
            path,
            modified,
            hash: content_hash(contents),
        }
    }

    /// Whether the file described by `current` differs from this version.
    ///
    /// The content hash is always compared. Equal timestamps do not imply
    /// equal contents on filesystems with coarse timestamp resolution, or
    /// when a tool rewrites a file and restores its mtime. A timestamp-only
    /// difference with identical contents is not a change.
    pub fn has_changed(&self, current: &FileVersion) -> bool {
        self.path != current.path || self.hash != current.hash
    }

    /// Re-fingerprint the file on disk and compare. An unreadable file
    /// counts as changed.
    pub fn is_stale(&self) -> bool {
        match FileVersion::from_path(&self.path) {
            Ok(current) => self.has_changed(&current),
            Err(_) => true,
        }
    }
}

/// Lowercase hex SHA-256 of `contents`.
pub fn content_hash(contents: &[u8]) -> String {
    hex::encode(Sha256::digest(contents))
}

fn nanos_since_epoch(time: SystemTime) -> u64 {
    let nanos = time
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos();
    u64::try_from(nanos).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn test_content_hash_is_sha256() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_equality_requires_all_fields() {
        let a = FileVersion::from_contents(PathBuf::from("a.go"), 10, b"package a");
        let b = FileVersion::from_contents(PathBuf::from("a.go"), 10, b"package a");
        let later = FileVersion::from_contents(PathBuf::from("a.go"), 11, b"package a");
        assert_eq!(a, b);
        assert_ne!(a, later);
    }

    #[test]
    fn test_timestamp_only_change_is_not_a_change() {
        let a = FileVersion::from_contents(PathBuf::from("a.go"), 10, b"package a");
        let touched = FileVersion::from_contents(PathBuf::from("a.go"), 99, b"package a");
        assert!(!a.has_changed(&touched));
    }

    #[test]
    fn test_same_timestamp_different_content_is_a_change() {
        let a = FileVersion::from_contents(PathBuf::from("a.go"), 10, b"package a");
        let rewritten = FileVersion::from_contents(PathBuf::from("a.go"), 10, b"package b");
        assert!(a.has_changed(&rewritten));
    }

    #[test]
    fn test_rewrite_with_preserved_mtime_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.go");
        fs::write(&path, "package models\n").unwrap();
        let before = FileVersion::from_path(&path).unwrap();
        let mtime = fs::metadata(&path).unwrap().modified().unwrap();

        {
            let mut file = File::create(&path).unwrap();
            file.write_all(b"package models\n\ntype Status string\n").unwrap();
        }
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let after = FileVersion::from_path(&path).unwrap();
        assert_eq!(before.modified, after.modified);
        assert!(before.has_changed(&after));
        assert!(before.is_stale());
    }

    #[test]
    fn test_missing_file_is_stale() {
        let version = FileVersion::from_contents(PathBuf::from("/nonexistent/x.go"), 0, b"");
        assert!(version.is_stale());
    }
}
