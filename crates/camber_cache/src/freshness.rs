//! The mtime-fingerprint staleness test.

use std::path::Path;

use camber_common::Fingerprint;

use crate::error::CacheError;

/// Returns true if `path` exists and its mtime equals `fingerprint` exactly.
///
/// Exact equality, not newer-than: the write path always stamps an artifact's
/// mtime to the fingerprint it was built against, so any other value — older
/// or newer — means the artifact was built against different sources.
pub fn is_fresh(path: &Path, fingerprint: Fingerprint) -> bool {
    match Fingerprint::read(path) {
        Ok(actual) => actual == fingerprint,
        Err(_) => false,
    }
}

/// Removes a stale artifact, ignoring the case where it never existed.
pub fn remove_stale(path: &Path) -> Result<(), CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CacheError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamped_artifact_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("part.rs");
        let stl = dir.path().join("part.stl");
        std::fs::write(&src, "source").unwrap();
        std::fs::write(&stl, "solid").unwrap();

        let fp = Fingerprint::read(&src).unwrap();
        fp.stamp(&stl).unwrap();
        assert!(is_fresh(&stl, fp));
    }

    #[test]
    fn missing_artifact_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("part.rs");
        std::fs::write(&src, "source").unwrap();
        let fp = Fingerprint::read(&src).unwrap();
        assert!(!is_fresh(&dir.path().join("part.stl"), fp));
    }

    #[test]
    fn touched_source_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("part.rs");
        let stl = dir.path().join("part.stl");
        std::fs::write(&src, "source").unwrap();
        std::fs::write(&stl, "solid").unwrap();

        let fp = Fingerprint::read(&src).unwrap();
        fp.stamp(&stl).unwrap();

        // Bump the source mtime well past the stamped value.
        let future = std::time::SystemTime::now() + std::time::Duration::from_secs(10);
        std::fs::File::options()
            .append(true)
            .open(&src)
            .unwrap()
            .set_modified(future)
            .unwrap();

        let bumped = Fingerprint::read(&src).unwrap();
        assert_ne!(bumped, fp);
        assert!(!is_fresh(&stl, bumped));
    }

    #[test]
    fn remove_stale_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        remove_stale(&dir.path().join("never-built.stl")).unwrap();
    }

    #[test]
    fn remove_stale_deletes_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let stl = dir.path().join("old.stl");
        std::fs::write(&stl, "solid").unwrap();
        remove_stale(&stl).unwrap();
        assert!(!stl.exists());
    }
}
