//! Spatial queries against compiled meshes.
//!
//! A minimal binary-STL reader and the mesh-dimension query used by test
//! harnesses and callers that need a node's bounding box. Dimensions are
//! cached next to the other artifacts in a `.dimensions.json` file stamped
//! with the node's fingerprint.

use std::path::{Path, PathBuf};

use camber_cache::is_fresh;
use camber_common::Fingerprint;

use crate::node::Node;

/// Errors raised by spatial queries.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// Dimensions are only defined for rigid nodes.
    #[error("cannot measure a non-rigid node")]
    NonRigidSolid,

    /// The node's mesh has not been compiled yet.
    #[error("mesh not rendered yet")]
    MeshNotRendered,

    /// A mesh or cache file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The mesh file is not valid binary STL.
    #[error("malformed STL file {0}")]
    MalformedStl(PathBuf),

    /// The dimension cache could not be encoded or decoded.
    #[error("dimension cache error: {0}")]
    Cache(#[from] serde_json::Error),

    /// The node's fingerprint could not be computed.
    #[error(transparent)]
    Fingerprint(#[from] camber_common::FingerprintError),
}

/// A triangle mesh loaded from a compiled artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    triangles: Vec<[[f64; 3]; 3]>,
}

impl Mesh {
    /// Builds a mesh from raw triangles.
    pub fn from_triangles(triangles: Vec<[[f64; 3]; 3]>) -> Self {
        Self { triangles }
    }

    /// Loads a binary STL file.
    ///
    /// Layout: 80-byte header, little-endian u32 triangle count, then one
    /// 50-byte record per triangle (normal, three vertices, attribute).
    pub fn load_stl(path: &Path) -> Result<Self, SpatialError> {
        let raw = std::fs::read(path).map_err(|source| SpatialError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let malformed = || SpatialError::MalformedStl(path.to_path_buf());

        if raw.len() < 84 {
            return Err(malformed());
        }
        let count = u32::from_le_bytes(raw[80..84].try_into().unwrap()) as usize;
        if raw.len() < 84 + count * 50 {
            return Err(malformed());
        }

        let mut triangles = Vec::with_capacity(count);
        for i in 0..count {
            // Skip the 12-byte normal; only vertices matter for queries.
            let base = 84 + i * 50 + 12;
            let mut triangle = [[0.0; 3]; 3];
            for (v, vertex) in triangle.iter_mut().enumerate() {
                for (c, coord) in vertex.iter_mut().enumerate() {
                    let at = base + (v * 3 + c) * 4;
                    *coord = f32::from_le_bytes(raw[at..at + 4].try_into().unwrap()) as f64;
                }
            }
            triangles.push(triangle);
        }
        Ok(Self { triangles })
    }

    /// The mesh's triangles.
    pub fn triangles(&self) -> &[[[f64; 3]; 3]] {
        &self.triangles
    }

    /// Rotates all vertices by `angle` degrees around `axis`.
    pub fn rotate(&mut self, angle: f64, axis: [f64; 3]) {
        let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
        if norm == 0.0 {
            return;
        }
        let k = [axis[0] / norm, axis[1] / norm, axis[2] / norm];
        let theta = angle.to_radians();
        let (sin, cos) = theta.sin_cos();

        for triangle in &mut self.triangles {
            for v in triangle.iter_mut() {
                let dot = k[0] * v[0] + k[1] * v[1] + k[2] * v[2];
                let cross = [
                    k[1] * v[2] - k[2] * v[1],
                    k[2] * v[0] - k[0] * v[2],
                    k[0] * v[1] - k[1] * v[0],
                ];
                for i in 0..3 {
                    v[i] = v[i] * cos + cross[i] * sin + k[i] * dot * (1.0 - cos);
                }
            }
        }
    }

    /// Translates all vertices by `vector`.
    pub fn translate(&mut self, vector: [f64; 3]) {
        for triangle in &mut self.triangles {
            for v in triangle.iter_mut() {
                for i in 0..3 {
                    v[i] += vector[i];
                }
            }
        }
    }

    /// The axis-aligned bounding box, or `None` for an empty mesh.
    pub fn bounding_box(&self) -> Option<([f64; 3], [f64; 3])> {
        let mut vertices = self.triangles.iter().flatten();
        let first = *vertices.next()?;
        let mut min = first;
        let mut max = first;
        for v in vertices {
            for i in 0..3 {
                min[i] = min[i].min(v[i]);
                max[i] = max[i].max(v[i]);
            }
        }
        Some((min, max))
    }

    /// The bounding-box extents along each axis.
    pub fn dimensions(&self) -> Option<[f64; 3]> {
        let (min, max) = self.bounding_box()?;
        Some([max[0] - min[0], max[1] - min[1], max[2] - min[2]])
    }
}

impl Node {
    /// Measures this node's compiled mesh, caching the result on disk.
    ///
    /// The cache file is stamped with the node's fingerprint like any other
    /// artifact. If neither the mesh nor the cache is fresh, a stale cached
    /// value is still returned in preference to failing.
    pub fn mesh_dimensions(&mut self) -> Result<[f64; 3], SpatialError> {
        if !self.rigid() {
            return Err(SpatialError::NonRigidSolid);
        }
        if let Some(dims) = self.cached_dimensions() {
            return Ok(dims);
        }

        let fingerprint = Fingerprint::of_files(self.files())?;
        let cache_path = self.dimensions_cache_path();
        let cached = read_dimension_cache(&cache_path);

        if is_fresh(&cache_path, fingerprint) {
            if let Some(dims) = cached {
                self.set_cached_dimensions(dims);
                return Ok(dims);
            }
        }

        if !is_fresh(self.paths().stl(), fingerprint) {
            return cached.ok_or(SpatialError::MeshNotRendered);
        }

        let mesh = Mesh::load_stl(self.paths().stl())?;
        let dims = mesh.dimensions().ok_or(SpatialError::MeshNotRendered)?;

        let encoded = serde_json::to_string(&dims)?;
        std::fs::write(&cache_path, encoded).map_err(|source| SpatialError::Io {
            path: cache_path.clone(),
            source,
        })?;
        fingerprint.stamp(&cache_path)?;

        self.set_cached_dimensions(dims);
        Ok(dims)
    }

    /// Path of the on-disk dimension cache for this node.
    pub fn dimensions_cache_path(&self) -> PathBuf {
        self.paths().scad().with_extension("dimensions.json")
    }
}

fn read_dimension_cache(path: &Path) -> Option<[f64; 3]> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}
