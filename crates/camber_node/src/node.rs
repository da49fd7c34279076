//! The composition-tree node and its assembly protocol.

use std::any::Any;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use camber_cache::{is_fresh, ArtifactPaths};
use camber_common::Fingerprint;
use tracing::debug;

use crate::error::NodeError;
use crate::geometry::Geometry;
use crate::kind::NodeKind;
use crate::operation::Operation;

/// Where a build session keeps its generated artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Root of the build output tree (mirrors the source tree).
    pub build_root: PathBuf,
    /// Root of the project's source tree.
    pub project_root: PathBuf,
}

impl Workspace {
    /// Creates a workspace with the conventional `_build` directory.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            build_root: project_root.join("_build"),
            project_root,
        }
    }
}

/// The unique id distinguishing instances of the same source file.
///
/// Together with the source path it forms the artifact cache key. Derived
/// from constructor arguments, or set explicitly by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodeId(String);

impl NodeId {
    /// An anonymous instance (bare artifact basename).
    pub fn none() -> Self {
        Self(String::new())
    }

    /// An explicitly named instance.
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derives an id by joining constructor arguments with `,`.
    pub fn from_args<T: ToString>(args: &[T]) -> Self {
        Self(
            args.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// The id as a string, empty for anonymous instances.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The result of rendering a node.
pub enum Rendered {
    /// Leaf output: an intermediate geometry description.
    Geometry(Geometry),
    /// Container output: an ordered sequence of child nodes.
    Children(Vec<Node>),
}

/// Context handed to user render functions.
pub struct RenderContext<'a> {
    kind: NodeKind,
    testing_time: Option<f64>,
    workspace: &'a Workspace,
}

impl<'a> RenderContext<'a> {
    /// The animation time in `[0, 1)`.
    ///
    /// Only assembly nodes may depend on time; any other kind gets
    /// [`NodeError::TimeNotSupported`] so its subtree stays rigid.
    pub fn time(&self) -> Result<f64, NodeError> {
        if !self.kind.supports_time() {
            return Err(NodeError::TimeNotSupported(self.kind));
        }
        Ok(self.testing_time.unwrap_or(0.0))
    }

    /// The workspace children should be constructed against.
    pub fn workspace(&self) -> &Workspace {
        self.workspace
    }
}

/// A user-defined node specification.
///
/// Implementations describe one node type of a project: where it is defined,
/// what kind it is, and how it renders. The build system owns everything
/// else — identity, caching, file tracking, and assembly.
pub trait Render: Send {
    /// The source file that defines this node.
    fn source(&self) -> &Path;

    /// The node's kind.
    fn kind(&self) -> NodeKind;

    /// The leaf backend namespace rendered primitives must belong to.
    ///
    /// Only consulted for leaf nodes.
    fn namespace(&self) -> &str {
        ""
    }

    /// Produces geometry (leaves) or children (containers).
    fn render(&mut self, cx: &RenderContext<'_>) -> Result<Rendered, NodeError>;

    /// Exact-type identity, used to reject a node directly containing
    /// another node of its own type.
    fn as_any(&self) -> &dyn Any;
}

/// A composition-tree node.
///
/// Wraps a user [`Render`] spec with identity, cached-artifact paths,
/// contributing-file tracking, rigidity, pending operations, and the
/// memoized assembly result.
pub struct Node {
    spec: Box<dyn Render>,
    id: NodeId,
    source: PathBuf,
    paths: ArtifactPaths,
    workspace: Workspace,
    root: PathBuf,
    files: BTreeSet<PathBuf>,
    rigid: bool,
    operations: Vec<Operation>,
    children: Vec<Node>,
    model: Option<Geometry>,
    assembled: Option<Geometry>,
    testing_time: Option<f64>,
    dimensions: Option<[f64; 3]>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Creates a node from a spec and unique id.
    pub fn new(spec: Box<dyn Render>, id: NodeId, workspace: &Workspace) -> Result<Self, NodeError> {
        let source = spec.source().to_path_buf();
        let paths = ArtifactPaths::derive(
            &source,
            id.as_str(),
            &workspace.build_root,
            &workspace.project_root,
        )?;
        let root = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| workspace.project_root.clone());
        let rigid = !spec.kind().forces_non_rigid();
        let mut files = BTreeSet::new();
        files.insert(source.clone());

        Ok(Self {
            spec,
            id,
            source,
            paths,
            workspace: workspace.clone(),
            root,
            files,
            rigid,
            operations: Vec::new(),
            children: Vec::new(),
            model: None,
            assembled: None,
            testing_time: None,
            dimensions: None,
        })
    }

    /// Appends a deferred rotation, chaining.
    pub fn rotate(self, angle: f64, axis: [f64; 3]) -> Self {
        self.transform(Operation::Rotation { angle, axis })
    }

    /// Appends a deferred translation, chaining.
    pub fn translate(self, vector: [f64; 3]) -> Self {
        self.transform(Operation::Translation { vector })
    }

    /// Appends a deferred operation, chaining.
    pub fn transform(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Renders this node and returns its geometry with all operations
    /// applied, substituting a cached mesh when one is fresh.
    ///
    /// Idempotent: once completed the result is memoized and returned as-is
    /// for the rest of this process instance. Containers assemble children
    /// depth-first, left-to-right, and only afterwards is the node's
    /// contributing-file set and rigidity final.
    pub fn assemble(&mut self, root: Option<&Path>) -> Result<Geometry, NodeError> {
        if let Some(assembled) = &self.assembled {
            return Ok(assembled.clone());
        }

        if let Some(root) = root {
            self.root = root.to_path_buf();
        }

        let cx = RenderContext {
            kind: self.spec.kind(),
            testing_time: self.testing_time,
            workspace: &self.workspace,
        };
        let rendered = self.spec.render(&cx)?;
        self.validate(&rendered)?;

        let model = match rendered {
            Rendered::Geometry(geometry) => geometry,
            Rendered::Children(children) => {
                self.children = children;
                let root = self.root.clone();
                let mut children = std::mem::take(&mut self.children);
                let mut parts = Vec::with_capacity(children.len());
                for child in &mut children {
                    parts.push(child.assemble(Some(&root))?);
                    self.files.extend(child.files.iter().cloned());
                    self.rigid = self.rigid && child.rigid;
                }
                self.children = children;
                Geometry::union(parts)
            }
        };

        self.model = Some(model.clone());
        self.write_scad(&model)?;

        let mut assembled = self.resolve_cached(model)?;
        for operation in &self.operations {
            assembled = operation.apply(assembled);
        }

        self.assembled = Some(assembled.clone());
        Ok(assembled)
    }

    /// Checks a render result against the composition contract.
    fn validate(&self, rendered: &Rendered) -> Result<(), NodeError> {
        let kind = self.spec.kind();
        match rendered {
            Rendered::Children(children) => {
                if !kind.is_container() {
                    return Err(NodeError::Validation(format!(
                        "{} is a leaf and should render {} geometry, not children",
                        self.source.display(),
                        self.spec.namespace(),
                    )));
                }
                if children.is_empty() {
                    return Err(NodeError::Validation(format!(
                        "{} rendered no children",
                        self.source.display(),
                    )));
                }
                for child in children {
                    if child.spec.as_any().type_id() == self.spec.as_any().type_id() {
                        return Err(NodeError::Validation(format!(
                            "{} cannot directly contain a node of its own type",
                            self.source.display(),
                        )));
                    }
                }
                Ok(())
            }
            Rendered::Geometry(geometry) => {
                if kind.is_container() {
                    return Err(NodeError::Validation(format!(
                        "{} is a {kind} node and should render children, not geometry",
                        self.source.display(),
                    )));
                }
                match geometry.namespace() {
                    Some(ns) if ns == self.spec.namespace() => Ok(()),
                    Some(ns) => Err(NodeError::Validation(format!(
                        "{} should render as {} geometry, not {ns}",
                        self.source.display(),
                        self.spec.namespace(),
                    ))),
                    None => Err(NodeError::Validation(format!(
                        "{} should render a {} primitive, not a composite",
                        self.source.display(),
                        self.spec.namespace(),
                    ))),
                }
            }
        }
    }

    /// Writes the intermediate description, stamped with this node's
    /// fingerprint.
    fn write_scad(&self, model: &Geometry) -> Result<(), NodeError> {
        self.paths.ensure_build_dir()?;
        let scad = self.paths.scad();
        std::fs::write(scad, model.to_source()).map_err(|source| NodeError::Io {
            path: scad.to_path_buf(),
            source,
        })?;
        let fingerprint = self.fingerprint()?;
        fingerprint.stamp(scad)?;
        debug!(path = %scad.display(), %fingerprint, "intermediate description written");
        Ok(())
    }

    /// Substitutes the cached mesh for a rigid node whose artifact is fresh.
    fn resolve_cached(&self, model: Geometry) -> Result<Geometry, NodeError> {
        if self.rigid && is_fresh(self.paths.stl(), self.fingerprint()?) {
            let path = self.paths.mesh_relative_to(&self.root)?;
            return Ok(Geometry::ImportMesh { path });
        }
        Ok(model)
    }

    /// The maximum mtime across all contributing source files.
    pub fn fingerprint(&self) -> Result<Fingerprint, NodeError> {
        Ok(Fingerprint::of_files(&self.files)?)
    }

    /// Source files whose modification affects this node's output.
    ///
    /// Complete only after a successful [`assemble`](Self::assemble).
    pub fn files(&self) -> &BTreeSet<PathBuf> {
        &self.files
    }

    /// Whether this node and its whole subtree can be cached as one mesh.
    pub fn rigid(&self) -> bool {
        self.rigid
    }

    /// The node's unique id.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// The source file defining this node.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The node's artifact locations.
    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Children discovered by the last assemble, empty for leaves.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Mutable access to children, for the compile walk.
    pub fn children_mut(&mut self) -> &mut [Node] {
        &mut self.children
    }

    /// The geometry produced by `render`, before cache substitution.
    pub fn model(&self) -> Option<&Geometry> {
        self.model.as_ref()
    }

    /// Whether assemble has completed for this instance.
    pub fn is_assembled(&self) -> bool {
        self.assembled.is_some()
    }

    /// Pending operations in application order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Saves the current operation count for a later rollback.
    pub fn checkpoint(&self) -> usize {
        self.operations.len()
    }

    /// Rolls back to a prior checkpoint, discarding newer operations and
    /// the memoized assembly so the next assemble re-runs.
    pub fn rollback(&mut self, checkpoint: usize) {
        self.operations.truncate(checkpoint);
        self.reset_assembly();
    }

    /// Fixes the animation time for tests, propagated at the next render.
    pub fn set_testing_time(&mut self, time: f64) {
        self.testing_time = Some(time);
    }

    /// Clears all assembly state so the node renders again from scratch.
    pub fn reset_assembly(&mut self) {
        self.model = None;
        self.assembled = None;
        self.children.clear();
        self.dimensions = None;
        self.files.clear();
        self.files.insert(self.source.clone());
        self.rigid = !self.spec.kind().forces_non_rigid();
    }

    pub(crate) fn cached_dimensions(&self) -> Option<[f64; 3]> {
        self.dimensions
    }

    pub(crate) fn set_cached_dimensions(&mut self, dims: [f64; 3]) {
        self.dimensions = Some(dims);
    }
}
