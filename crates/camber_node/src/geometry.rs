//! The intermediate geometry description.
//!
//! `Geometry` is the in-memory form of what ends up in a node's `.scad`
//! file: a small AST rendered to deterministic OpenSCAD-style source. Cached
//! subtrees appear as mesh imports instead of their full derivation.

use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::PathBuf;

/// An intermediate geometry description produced by rendering a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// Raw geometry source emitted by a leaf backend, tagged with the
    /// backend namespace it belongs to.
    Primitive {
        /// The leaf backend namespace that produced this geometry.
        namespace: String,
        /// The geometry source text, e.g. `cylinder(r = 10, h = 5);`.
        source: String,
    },
    /// A union of two or more parts.
    Union(Vec<Geometry>),
    /// A rotation of a child geometry by an angle (degrees) around an axis.
    Rotate {
        /// Rotation angle in degrees.
        angle: f64,
        /// Rotation axis vector.
        axis: [f64; 3],
        /// The geometry being rotated.
        child: Box<Geometry>,
    },
    /// A translation of a child geometry along a vector.
    Translate {
        /// Translation vector.
        vector: [f64; 3],
        /// The geometry being translated.
        child: Box<Geometry>,
    },
    /// A reference to an already-compiled mesh, relative to the enclosing
    /// root's directory.
    ImportMesh {
        /// Relative path to the cached mesh.
        path: PathBuf,
    },
}

impl Geometry {
    /// Combines parts into a union, passing a single part through unchanged.
    ///
    /// The single-child case avoids a redundant no-op wrapper, so a container
    /// with exactly one child assembles to that child's geometry verbatim.
    pub fn union(mut parts: Vec<Geometry>) -> Geometry {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Geometry::Union(parts)
        }
    }

    /// Renders this description as OpenSCAD-style source text.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out, 0);
        out
    }

    fn write_source(&self, out: &mut String, indent: usize) {
        let pad = "    ".repeat(indent);
        match self {
            Geometry::Primitive { source, .. } => {
                for line in source.lines() {
                    let _ = writeln!(out, "{pad}{line}");
                }
            }
            Geometry::Union(parts) => {
                let _ = writeln!(out, "{pad}union() {{");
                for part in parts {
                    part.write_source(out, indent + 1);
                }
                let _ = writeln!(out, "{pad}}}");
            }
            Geometry::Rotate { angle, axis, child } => {
                let _ = writeln!(
                    out,
                    "{pad}rotate(a = {angle}, v = [{}, {}, {}]) {{",
                    axis[0], axis[1], axis[2]
                );
                child.write_source(out, indent + 1);
                let _ = writeln!(out, "{pad}}}");
            }
            Geometry::Translate { vector, child } => {
                let _ = writeln!(
                    out,
                    "{pad}translate(v = [{}, {}, {}]) {{",
                    vector[0], vector[1], vector[2]
                );
                child.write_source(out, indent + 1);
                let _ = writeln!(out, "{pad}}}");
            }
            Geometry::ImportMesh { path } => {
                let _ = writeln!(out, "{pad}import(\"{}\");", path.display());
            }
        }
    }

    /// Returns the namespace of a primitive, or `None` for composites.
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Geometry::Primitive { namespace, .. } => Some(namespace),
            _ => None,
        }
    }
}
