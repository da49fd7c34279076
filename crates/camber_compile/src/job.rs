//! Triggering and finishing external compiles.

use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use camber_cache::{is_fresh, remove_stale};
use camber_common::Fingerprint;
use camber_node::Node;
use tracing::{debug, info};

use crate::error::CompileError;
use crate::lock::{is_locked, remove_lock, write_pid_lock};

/// The external geometry compiler.
///
/// Invoked as `command <description> -o <mesh>`; exit 0 with the mesh file
/// present is success, anything else is a compile failure.
#[derive(Debug, Clone)]
pub struct Compiler {
    command: String,
}

impl Compiler {
    /// A compiler invoked by the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The command this compiler runs.
    pub fn command(&self) -> &str {
        &self.command
    }

    fn spawn(&self, description: &Path, mesh: &Path) -> Result<Child, CompileError> {
        Command::new(&self.command)
            .arg(description)
            .arg("-o")
            .arg(mesh)
            .spawn()
            .map_err(|source| CompileError::Spawn {
                command: self.command.clone(),
                source,
            })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new("openscad")
    }
}

/// The result of triggering compilation.
pub enum Outcome {
    /// Nothing to do: the artifact is fresh, the node is non-rigid, or
    /// another live process is already building it.
    Ready,
    /// A compiler process was spawned; the caller must wait for it and then
    /// restart the compile pass from the root.
    Pending(CompileJob),
}

/// A handle to an in-flight external compile.
///
/// Exists only for the duration of one compile; nothing about it is
/// persisted beyond the lock file, which names the spawning process.
pub struct CompileJob {
    child: Child,
    artifact: PathBuf,
    fingerprint: Fingerprint,
    lock: PathBuf,
}

impl CompileJob {
    /// The mesh being produced.
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// The pid of the spawned compiler process.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Blocks until the compiler exits, then stamps and unlocks the
    /// artifact.
    ///
    /// On success the mesh's mtime is set to exactly the fingerprint the
    /// compile was issued against, making it fresh for that source state.
    /// The lock file is removed on every exit path.
    pub fn wait(mut self) -> Result<(), CompileError> {
        let status = self.child.wait().map_err(|source| CompileError::Spawn {
            command: "wait".to_string(),
            source,
        })?;
        remove_lock(&self.lock)?;

        if !status.success() {
            return Err(CompileError::CompilerFailed {
                status: status.to_string(),
                artifact: self.artifact,
            });
        }
        if !self.artifact.exists() {
            return Err(CompileError::MissingArtifact(self.artifact));
        }

        self.fingerprint.stamp(&self.artifact)?;
        info!(artifact = %self.artifact.display(), fingerprint = %self.fingerprint, "mesh compiled");
        Ok(())
    }
}

/// Triggers compilation of a single node's artifact.
///
/// Mutually exclusive per artifact path via the pid lock file: if a live
/// process holds the lock, the artifact is treated as building elsewhere and
/// the caller should retry on a later pass.
pub fn compile_node(node: &mut Node, compiler: &Compiler) -> Result<Outcome, CompileError> {
    node.assemble(None)?;
    let fingerprint = node.fingerprint()?;

    if !node.rigid() || is_fresh(node.paths().stl(), fingerprint) {
        return Ok(Outcome::Ready);
    }
    if is_locked(node.paths().lock()) {
        debug!(artifact = %node.paths().stl().display(), "building elsewhere, skipping");
        return Ok(Outcome::Ready);
    }

    remove_stale(node.paths().stl())?;
    write_pid_lock(node.paths().lock())?;

    let child = compiler.spawn(node.paths().scad(), node.paths().stl())?;
    info!(
        artifact = %node.paths().stl().display(),
        pid = child.id(),
        "compile started"
    );

    Ok(Outcome::Pending(CompileJob {
        child,
        artifact: node.paths().stl().to_path_buf(),
        fingerprint,
        lock: node.paths().lock().to_path_buf(),
    }))
}

/// Triggers compilation across a whole tree, children before parents.
///
/// Aborts the walk the moment any node returns `Pending`: later siblings and
/// ancestors are not attempted until the pass restarts, since the pending
/// compile's source change may have invalidated them too.
pub fn trigger_compile(node: &mut Node, compiler: &Compiler) -> Result<Outcome, CompileError> {
    node.assemble(None)?;
    for child in node.children_mut() {
        if let Outcome::Pending(job) = trigger_compile(child, compiler)? {
            return Ok(Outcome::Pending(job));
        }
    }
    compile_node(node, compiler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camber_node::{
        Geometry, NodeError, NodeId, NodeKind, Render, RenderContext, Rendered, Workspace,
    };
    use std::any::Any;
    use std::os::unix::fs::PermissionsExt;

    struct Cylinder {
        source: PathBuf,
        r: u32,
        h: u32,
    }

    impl Cylinder {
        fn node(source: &Path, r: u32, h: u32, ws: &Workspace) -> Result<Node, NodeError> {
            Node::new(
                Box::new(Self {
                    source: source.to_path_buf(),
                    r,
                    h,
                }),
                NodeId::from_args(&[r, h]),
                ws,
            )
        }
    }

    impl Render for Cylinder {
        fn source(&self) -> &Path {
            &self.source
        }
        fn kind(&self) -> NodeKind {
            NodeKind::Leaf
        }
        fn namespace(&self) -> &str {
            "openscad"
        }
        fn render(&mut self, _cx: &RenderContext<'_>) -> Result<Rendered, NodeError> {
            Ok(Rendered::Geometry(Geometry::Primitive {
                namespace: "openscad".to_string(),
                source: format!("cylinder(r = {}, h = {});", self.r, self.h),
            }))
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// An assembly root: its leaves are cached individually but the root
    /// itself never compiles to a single mesh.
    struct Pair {
        source: PathBuf,
        leaf_source: PathBuf,
    }

    impl Render for Pair {
        fn source(&self) -> &Path {
            &self.source
        }
        fn kind(&self) -> NodeKind {
            NodeKind::Assembly
        }
        fn render(&mut self, cx: &RenderContext<'_>) -> Result<Rendered, NodeError> {
            Ok(Rendered::Children(vec![
                Cylinder::node(&self.leaf_source, 10, 5, cx.workspace())?,
                Cylinder::node(&self.leaf_source, 5, 10, cx.workspace())?,
            ]))
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Project {
        dir: tempfile::TempDir,
        ws: Workspace,
        leaf: PathBuf,
        pair: PathBuf,
    }

    impl Project {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let ws = Workspace::new(dir.path());
            let leaf = dir.path().join("cylinder.rs");
            let pair = dir.path().join("pair.rs");
            std::fs::write(&leaf, "// cylinder").unwrap();
            std::fs::write(&pair, "// pair").unwrap();
            Self {
                dir,
                ws,
                leaf,
                pair,
            }
        }

        /// A fake compiler script that copies the description to the mesh.
        fn fake_compiler(&self) -> Compiler {
            self.script("#!/bin/sh\ncp \"$1\" \"$3\"\n")
        }

        fn script(&self, body: &str) -> Compiler {
            let path = self.dir.path().join("fake-compiler.sh");
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            Compiler::new(path.to_str().unwrap())
        }

        /// A fresh root instance, as a pass restart would create.
        fn root(&self) -> Node {
            Node::new(
                Box::new(Pair {
                    source: self.pair.clone(),
                    leaf_source: self.leaf.clone(),
                }),
                NodeId::none(),
                &self.ws,
            )
            .unwrap()
        }
    }

    #[test]
    fn fresh_artifact_is_ready_without_spawning() {
        let project = Project::new();
        let mut node = Cylinder::node(&project.leaf, 10, 5, &project.ws).unwrap();
        node.assemble(None).unwrap();
        std::fs::write(node.paths().stl(), "solid").unwrap();
        node.fingerprint().unwrap().stamp(node.paths().stl()).unwrap();

        // A compiler command that would fail if invoked.
        let compiler = Compiler::new("/nonexistent/compiler");
        assert!(matches!(
            compile_node(&mut node, &compiler).unwrap(),
            Outcome::Ready
        ));
    }

    #[test]
    fn live_lock_means_building_elsewhere() {
        let project = Project::new();
        let mut node = Cylinder::node(&project.leaf, 10, 5, &project.ws).unwrap();
        node.assemble(None).unwrap();
        write_pid_lock(node.paths().lock()).unwrap();

        let compiler = Compiler::new("/nonexistent/compiler");
        assert!(matches!(
            compile_node(&mut node, &compiler).unwrap(),
            Outcome::Ready
        ));
    }

    #[test]
    fn pending_job_stamps_and_unlocks() {
        let project = Project::new();
        let compiler = project.fake_compiler();
        let mut node = Cylinder::node(&project.leaf, 10, 5, &project.ws).unwrap();

        let Outcome::Pending(job) = compile_node(&mut node, &compiler).unwrap() else {
            panic!("expected a pending job");
        };
        assert!(node.paths().lock().exists());
        job.wait().unwrap();

        assert!(!node.paths().lock().exists());
        assert!(is_fresh(node.paths().stl(), node.fingerprint().unwrap()));
    }

    #[test]
    fn failing_compiler_reports_and_unlocks() {
        let project = Project::new();
        let compiler = project.script("#!/bin/sh\nexit 1\n");
        let mut node = Cylinder::node(&project.leaf, 10, 5, &project.ws).unwrap();

        let Outcome::Pending(job) = compile_node(&mut node, &compiler).unwrap() else {
            panic!("expected a pending job");
        };
        let lock = node.paths().lock().to_path_buf();
        let err = job.wait().unwrap_err();
        assert!(matches!(err, CompileError::CompilerFailed { .. }));
        assert!(!lock.exists());
    }

    #[test]
    fn silent_compiler_is_a_missing_artifact() {
        let project = Project::new();
        let compiler = project.script("#!/bin/sh\nexit 0\n");
        let mut node = Cylinder::node(&project.leaf, 10, 5, &project.ws).unwrap();

        let Outcome::Pending(job) = compile_node(&mut node, &compiler).unwrap() else {
            panic!("expected a pending job");
        };
        assert!(matches!(
            job.wait().unwrap_err(),
            CompileError::MissingArtifact(_)
        ));
    }

    #[test]
    fn three_passes_compile_two_leaves_then_union_of_meshes() {
        let project = Project::new();
        let compiler = project.fake_compiler();

        // Pass 1: leaf A (r=10, h=5) is first in render order.
        let mut root = project.root();
        let Outcome::Pending(job) = trigger_compile(&mut root, &compiler).unwrap() else {
            panic!("expected pass 1 to start compiling A");
        };
        assert!(job.artifact().ends_with("cylinder-10,5.stl"));
        job.wait().unwrap();

        // Pass 2 (fresh process state): A is cached, B compiles.
        let mut root = project.root();
        let Outcome::Pending(job) = trigger_compile(&mut root, &compiler).unwrap() else {
            panic!("expected pass 2 to start compiling B");
        };
        assert!(job.artifact().ends_with("cylinder-5,10.stl"));
        job.wait().unwrap();

        // Pass 3: everything fresh, and the root assembles to a union of
        // cached meshes.
        let mut root = project.root();
        assert!(matches!(
            trigger_compile(&mut root, &compiler).unwrap(),
            Outcome::Ready
        ));
        let geometry = root.assemble(None).unwrap();
        match geometry {
            Geometry::Union(parts) => {
                assert!(parts
                    .iter()
                    .all(|p| matches!(p, Geometry::ImportMesh { .. })));
            }
            other => panic!("expected union of imports, got {other:?}"),
        }

        // Pass 4: still nothing to do until a source file is touched.
        let mut root = project.root();
        assert!(matches!(
            trigger_compile(&mut root, &compiler).unwrap(),
            Outcome::Ready
        ));
    }

    #[test]
    fn rigid_fusion_compiles_itself_as_one_mesh() {
        struct Fused {
            source: PathBuf,
            leaf_source: PathBuf,
        }
        impl Render for Fused {
            fn source(&self) -> &Path {
                &self.source
            }
            fn kind(&self) -> NodeKind {
                NodeKind::Fusion
            }
            fn render(&mut self, cx: &RenderContext<'_>) -> Result<Rendered, NodeError> {
                Ok(Rendered::Children(vec![
                    Cylinder::node(&self.leaf_source, 10, 5, cx.workspace())?,
                    Cylinder::node(&self.leaf_source, 5, 10, cx.workspace())?,
                ]))
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let project = Project::new();
        let compiler = project.fake_compiler();
        let make_root = || {
            Node::new(
                Box::new(Fused {
                    source: project.pair.clone(),
                    leaf_source: project.leaf.clone(),
                }),
                NodeId::none(),
                &project.ws,
            )
            .unwrap()
        };

        // Leaves first, then the fusion's own mesh, then nothing.
        let mut artifacts = Vec::new();
        let mut root = make_root();
        while let Outcome::Pending(job) = trigger_compile(&mut root, &compiler).unwrap() {
            artifacts.push(job.artifact().to_path_buf());
            job.wait().unwrap();
            root = make_root();
        }
        assert_eq!(artifacts.len(), 3);
        assert!(artifacts[2].ends_with("pair.stl"));

        let mut root = make_root();
        let geometry = root.assemble(None).unwrap();
        assert!(matches!(geometry, Geometry::ImportMesh { .. }));
    }

    #[test]
    fn touching_a_source_forces_recompilation() {
        let project = Project::new();
        let compiler = project.fake_compiler();

        let mut root = project.root();
        while let Outcome::Pending(job) = trigger_compile(&mut root, &compiler).unwrap() {
            job.wait().unwrap();
            root = project.root();
        }

        // Bump the leaf source mtime; both leaf artifacts go stale.
        let future = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
        std::fs::File::options()
            .append(true)
            .open(&project.leaf)
            .unwrap()
            .set_modified(future)
            .unwrap();

        let mut root = project.root();
        assert!(matches!(
            trigger_compile(&mut root, &compiler).unwrap(),
            Outcome::Pending(_)
        ));
    }
}
