// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh validation and repair utilities

use super::{Mesh, Triangle};
use ahash::AHashSet;
use nalgebra::Point3;

const MAX_REPAIR_PASSES: usize = 8;

/// Weld tolerance for a mesh, relative to its extent
pub fn weld_tolerance(mesh: &Mesh) -> f64 {
    let bbox = mesh.bounding_box();
    if bbox.is_empty() {
        return 1e-9;
    }
    1e-7 * bbox.size().amax().max(1.0)
}

/// Weld, then split triangles whose edges pass through another vertex.
/// BSP output leaves such T-junctions wherever a face was split on one side
/// of an edge only; splitting them restores edge-to-edge connectivity.
pub fn clean(mesh: &mut Mesh) {
    let tolerance = weld_tolerance(mesh);
    mesh.weld_vertices(tolerance);
    repair_t_junctions(mesh, tolerance);
    mesh.remove_degenerate_triangles();
}

/// Split triangles at vertices lying on their unmatched edges.
/// Returns the number of triangles that were split.
pub fn repair_t_junctions(mesh: &mut Mesh, tolerance: f64) -> usize {
    let mut total = 0;
    for _ in 0..MAX_REPAIR_PASSES {
        let split = repair_pass(mesh, tolerance);
        if split == 0 {
            break;
        }
        total += split;
    }
    total
}

fn repair_pass(mesh: &mut Mesh, tolerance: f64) -> usize {
    let directed: AHashSet<(usize, usize)> = mesh
        .triangles
        .iter()
        .flat_map(|t| {
            let [a, b, c] = t.indices;
            [(a, b), (b, c), (c, a)]
        })
        .collect();

    let mut replaced = Vec::with_capacity(mesh.triangles.len());
    let mut split = 0;

    for triangle in &mesh.triangles {
        let mut done = false;
        for corner in 0..3 {
            let a = triangle.indices[corner];
            let b = triangle.indices[(corner + 1) % 3];
            let c = triangle.indices[(corner + 2) % 3];
            if directed.contains(&(b, a)) {
                continue;
            }
            let on_edge = vertices_on_segment(mesh, a, b, tolerance);
            if on_edge.is_empty() {
                continue;
            }

            let mut chain = vec![a];
            chain.extend(on_edge);
            chain.push(b);
            for pair in chain.windows(2) {
                replaced.push(Triangle::new([pair[0], pair[1], c]));
            }
            split += 1;
            done = true;
            break;
        }
        if !done {
            replaced.push(*triangle);
        }
    }

    mesh.triangles = replaced;
    split
}

/// Vertices strictly inside segment `a b`, ordered from `a` to `b`
fn vertices_on_segment(mesh: &Mesh, a: usize, b: usize, tolerance: f64) -> Vec<usize> {
    let start: Point3<f64> = mesh.vertices[a].position;
    let end: Point3<f64> = mesh.vertices[b].position;
    let direction = end - start;
    let length_squared = direction.norm_squared();
    if length_squared <= tolerance * tolerance {
        return Vec::new();
    }

    let min = start.inf(&end);
    let max = start.sup(&end);
    let mut found: Vec<(f64, usize)> = mesh
        .vertices
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != a && *index != b)
        .filter(|(_, vertex)| {
            let p = vertex.position;
            p.x >= min.x - tolerance
                && p.y >= min.y - tolerance
                && p.z >= min.z - tolerance
                && p.x <= max.x + tolerance
                && p.y <= max.y + tolerance
                && p.z <= max.z + tolerance
        })
        .filter_map(|(index, vertex)| {
            let t = (vertex.position - start).dot(&direction) / length_squared;
            let closest = start + direction * t;
            let inside = t > 0.0 && t < 1.0;
            (inside && (vertex.position - closest).norm() < tolerance).then_some((t, index))
        })
        .collect();

    found.sort_by(|x, y| x.0.total_cmp(&y.0));
    found.dedup_by_key(|entry| entry.1);
    found.into_iter().map(|(_, index)| index).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::HalfEdgeMesh;

    #[test]
    fn test_t_junction_is_split() {
        // A square split into one triangle on the left and two on the right,
        // leaving a vertex in the middle of the left triangle's edge
        let mut mesh = Mesh::new();
        let p = |x: f64, y: f64| Point3::new(x, y, 0.0);
        mesh.push_facet(p(0.0, 0.0), p(2.0, 0.0), p(0.0, 2.0));
        mesh.push_facet(p(2.0, 0.0), p(2.0, 2.0), p(1.0, 1.0));
        mesh.push_facet(p(1.0, 1.0), p(2.0, 2.0), p(0.0, 2.0));
        let tolerance = weld_tolerance(&mesh);
        mesh.weld_vertices(tolerance);

        let before = HalfEdgeMesh::from_mesh(&mesh).boundary_edge_count();
        assert_eq!(repair_t_junctions(&mut mesh, tolerance), 1);
        assert_eq!(mesh.triangle_count(), 4);
        let after = HalfEdgeMesh::from_mesh(&mesh).boundary_edge_count();
        assert!(after < before);
        assert_eq!(after, 4);
    }

    #[test]
    fn test_clean_keeps_closed_mesh() {
        let mut mesh = crate::geometry::Primitive::Cuboid {
            size: nalgebra::Vector3::new(1.0, 1.0, 1.0),
        }
        .to_mesh();
        clean(&mut mesh);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(HalfEdgeMesh::from_mesh(&mesh).is_closed());
    }
}
