//! Deferred geometric transforms.
//!
//! Operations are applied to a node's geometry after cache resolution, so a
//! cached mesh can be repositioned without recompiling it. Each operation can
//! apply itself to the intermediate description, to a loaded mesh for spatial
//! queries, serialize itself for external consumers, and produce its
//! algebraic inverse.

use serde_json::{json, Value};

use crate::geometry::Geometry;
use crate::spatial::Mesh;

/// A deferred rotation or translation on an already-rendered geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Rotation by an angle (degrees) around an axis.
    Rotation {
        /// Rotation angle in degrees.
        angle: f64,
        /// Rotation axis vector.
        axis: [f64; 3],
    },
    /// Translation along a vector.
    Translation {
        /// Translation vector.
        vector: [f64; 3],
    },
}

impl Operation {
    /// Wraps a geometry in this operation.
    pub fn apply(&self, geometry: Geometry) -> Geometry {
        match *self {
            Operation::Rotation { angle, axis } => Geometry::Rotate {
                angle,
                axis,
                child: Box::new(geometry),
            },
            Operation::Translation { vector } => Geometry::Translate {
                vector,
                child: Box::new(geometry),
            },
        }
    }

    /// Applies this operation to a loaded mesh in place.
    pub fn apply_to_mesh(&self, mesh: &mut Mesh) {
        match *self {
            Operation::Rotation { angle, axis } => mesh.rotate(angle, axis),
            Operation::Translation { vector } => mesh.translate(vector),
        }
    }

    /// Returns the operation that undoes this one.
    pub fn inverse(&self) -> Operation {
        match *self {
            Operation::Rotation { angle, axis } => Operation::Rotation {
                angle: -angle,
                axis,
            },
            Operation::Translation { vector } => Operation::Translation {
                vector: [-vector[0], -vector[1], -vector[2]],
            },
        }
    }

    /// Serializes this operation for external consumers.
    ///
    /// Wire shape: `["r", angle, [x, y, z]]` or `["t", [x, y, z]]`.
    pub fn to_wire(&self) -> Value {
        match *self {
            Operation::Rotation { angle, axis } => json!(["r", angle, axis]),
            Operation::Translation { vector } => json!(["t", vector]),
        }
    }

    /// Parses an operation from its wire form.
    pub fn from_wire(value: &Value) -> Option<Operation> {
        let items = value.as_array()?;
        match items.first()?.as_str()? {
            "r" => Some(Operation::Rotation {
                angle: items.get(1)?.as_f64()?,
                axis: parse_vector(items.get(2)?)?,
            }),
            "t" => Some(Operation::Translation {
                vector: parse_vector(items.get(1)?)?,
            }),
            _ => None,
        }
    }
}

fn parse_vector(value: &Value) -> Option<[f64; 3]> {
    let items = value.as_array()?;
    if items.len() != 3 {
        return None;
    }
    Some([
        items[0].as_f64()?,
        items[1].as_f64()?,
        items[2].as_f64()?,
    ])
}
