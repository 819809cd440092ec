// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean operations over closed meshes

use super::csg::{boolean, BooleanOp};
use super::{mesh_utils, GeometryError, Mesh};

/// Fold `op` over `operands` left to right: `a op b op c ...`
pub fn perform_boolean_operation(operands: &[&Mesh], op: BooleanOp) -> Result<Mesh, GeometryError> {
    let Some((first, rest)) = operands.split_first() else {
        return Err(GeometryError::EmptyBoolean(op.name()));
    };

    let mut result = (*first).clone();
    for operand in rest {
        result = combine_pair(&result, operand, op);
    }
    mesh_utils::clean(&mut result);

    if result.is_empty() {
        return Err(GeometryError::EmptyBoolean(op.name()));
    }
    log::debug!(op = op.name(), triangles = result.triangle_count(); "Boolean operation finished");
    Ok(result)
}

fn combine_pair(a: &Mesh, b: &Mesh, op: BooleanOp) -> Mesh {
    let overlap = {
        let (ba, bb) = (a.bounding_box(), b.bounding_box());
        !(ba.is_empty() || bb.is_empty())
            && ba.min.x <= bb.max.x
            && bb.min.x <= ba.max.x
            && ba.min.y <= bb.max.y
            && bb.min.y <= ba.max.y
            && ba.min.z <= bb.max.z
            && bb.min.z <= ba.max.z
    };

    // Disjoint operands need no splitting
    match (op, overlap) {
        (BooleanOp::Union, false) => {
            let mut merged = a.clone();
            merged.merge(b);
            merged
        }
        (BooleanOp::Subtract, false) => a.clone(),
        (BooleanOp::Intersect, false) => Mesh::new(),
        _ => boolean(a, b, op),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{HalfEdgeMesh, Primitive};
    use approx::assert_relative_eq;
    use nalgebra::{Matrix4, Vector3};

    fn cube_at(size: f64, offset: Vector3<f64>) -> Mesh {
        let mut mesh = Primitive::Cuboid {
            size: Vector3::new(size, size, size),
        }
        .to_mesh();
        mesh.transform(&Matrix4::new_translation(&offset));
        mesh
    }

    #[test]
    fn test_subtract_leaves_closed_solid() {
        let a = cube_at(10.0, Vector3::zeros());
        let b = cube_at(4.0, Vector3::new(3.0, 3.0, 8.0));
        let result = perform_boolean_operation(&[&a, &b], BooleanOp::Subtract).unwrap();
        assert_relative_eq!(result.signed_volume(), 1000.0 - 32.0, epsilon = 1e-6);
        let topology = HalfEdgeMesh::from_mesh(&result);
        assert!(topology.is_closed());
        assert_eq!(topology.non_manifold_edge_count(), 0);
    }

    #[test]
    fn test_union_of_three() {
        let a = cube_at(1.0, Vector3::zeros());
        let b = cube_at(1.0, Vector3::new(3.0, 0.0, 0.0));
        let c = cube_at(1.0, Vector3::new(6.0, 0.0, 0.0));
        let result = perform_boolean_operation(&[&a, &b, &c], BooleanOp::Union).unwrap();
        assert_relative_eq!(result.signed_volume(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_intersection_is_an_error() {
        let a = cube_at(1.0, Vector3::zeros());
        let b = cube_at(1.0, Vector3::new(3.0, 0.0, 0.0));
        let err = perform_boolean_operation(&[&a, &b], BooleanOp::Intersect).unwrap_err();
        assert_eq!(err, GeometryError::EmptyBoolean("intersect"));
    }
}
