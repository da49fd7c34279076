//! Derivation of on-disk artifact paths for a node.
//!
//! For a node defined in source file `S` with unique id `U`, artifacts are
//! named `{stem(S)}-{U}` (the suffix is omitted when the id is empty) inside
//! a build directory that mirrors `S`'s directory relative to the project
//! root. One node produces an intermediate `.scad` description, a compiled
//! `.stl` mesh, and a transient `.stl.lock` compile-in-progress marker.

use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// Resolved artifact locations for a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Directory containing the node's source file.
    source_dir: PathBuf,
    /// Build directory mirroring `source_dir` under the build root.
    build_dir: PathBuf,
    /// Artifact basename, `{stem}-{id}` or bare `{stem}`.
    basename: String,
    /// Intermediate geometry description file.
    scad: PathBuf,
    /// Compiled mesh file.
    stl: PathBuf,
    /// Compile-in-progress lock file.
    lock: PathBuf,
}

impl ArtifactPaths {
    /// Derives artifact paths for a node.
    ///
    /// `unique_id` distinguishes instances of the same source file built with
    /// different constructor arguments; an empty id yields the bare stem.
    pub fn derive(
        source: &Path,
        unique_id: &str,
        build_root: &Path,
        project_root: &Path,
    ) -> Result<Self, CacheError> {
        let source_dir = source
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| CacheError::BadSourcePath(source.to_path_buf()))?;

        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CacheError::BadSourcePath(source.to_path_buf()))?;

        let relative =
            source_dir
                .strip_prefix(project_root)
                .map_err(|_| CacheError::OutsideProjectRoot {
                    source_path: source.to_path_buf(),
                    root: project_root.to_path_buf(),
                })?;
        let build_dir = build_root.join(relative);

        let basename = if unique_id.is_empty() {
            stem.to_string()
        } else {
            format!("{stem}-{unique_id}")
        };

        let base = build_dir.join(&basename);
        Ok(Self {
            source_dir,
            build_dir,
            scad: base.with_extension("scad"),
            stl: base.with_extension("stl"),
            lock: base.with_extension("stl.lock"),
            basename,
        })
    }

    /// Creates the build directory (and parents) if missing.
    pub fn ensure_build_dir(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.build_dir).map_err(|source| CacheError::Io {
            path: self.build_dir.clone(),
            source,
        })
    }

    /// The intermediate geometry description file.
    pub fn scad(&self) -> &Path {
        &self.scad
    }

    /// The compiled mesh file.
    pub fn stl(&self) -> &Path {
        &self.stl
    }

    /// The compile-in-progress lock file.
    pub fn lock(&self) -> &Path {
        &self.lock
    }

    /// The artifact basename shared by all three files.
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// The mesh filename without any directory component.
    pub fn local_mesh(&self) -> String {
        format!("{}.stl", self.basename)
    }

    /// The mesh path relative to an enclosing root's directory.
    ///
    /// Because the build tree mirrors the source tree, a composing assembly
    /// can reference a cached sibling mesh by this relative path instead of
    /// re-deriving the solid it contains.
    pub fn mesh_relative_to(&self, root: &Path) -> Result<PathBuf, CacheError> {
        let relative =
            self.source_dir
                .strip_prefix(root)
                .map_err(|_| CacheError::OutsideProjectRoot {
                    source_path: self.stl.clone(),
                    root: root.to_path_buf(),
                })?;
        Ok(relative.join(self.local_mesh()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(source: &str, id: &str) -> ArtifactPaths {
        ArtifactPaths::derive(
            Path::new(source),
            id,
            Path::new("/project/_build"),
            Path::new("/project"),
        )
        .unwrap()
    }

    #[test]
    fn named_instance_gets_id_suffix() {
        let paths = derive("/project/parts/axle.rs", "10,5");
        assert_eq!(paths.basename(), "axle-10,5");
        assert_eq!(
            paths.scad(),
            Path::new("/project/_build/parts/axle-10,5.scad")
        );
        assert_eq!(paths.stl(), Path::new("/project/_build/parts/axle-10,5.stl"));
        assert_eq!(
            paths.lock(),
            Path::new("/project/_build/parts/axle-10,5.stl.lock")
        );
    }

    #[test]
    fn unnamed_instance_uses_bare_stem() {
        let paths = derive("/project/parts/axle.rs", "");
        assert_eq!(paths.basename(), "axle");
        assert_eq!(paths.local_mesh(), "axle.stl");
    }

    #[test]
    fn build_dir_mirrors_source_tree() {
        let paths = derive("/project/a/b/c/part.rs", "");
        assert_eq!(paths.stl(), Path::new("/project/_build/a/b/c/part.stl"));
    }

    #[test]
    fn mesh_relative_to_enclosing_root() {
        let paths = derive("/project/wheels/front/hub.rs", "x");
        let rel = paths.mesh_relative_to(Path::new("/project/wheels")).unwrap();
        assert_eq!(rel, Path::new("front/hub-x.stl"));
    }

    #[test]
    fn source_outside_root_is_rejected() {
        let err = ArtifactPaths::derive(
            Path::new("/elsewhere/part.rs"),
            "",
            Path::new("/project/_build"),
            Path::new("/project"),
        )
        .unwrap_err();
        assert!(matches!(err, CacheError::OutsideProjectRoot { .. }));
    }

    #[test]
    fn ensure_build_dir_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a/b/part.rs");
        let paths = ArtifactPaths::derive(
            &source,
            "",
            &dir.path().join("_build"),
            dir.path(),
        )
        .unwrap();
        paths.ensure_build_dir().unwrap();
        assert!(dir.path().join("_build/a/b").is_dir());
    }
}
