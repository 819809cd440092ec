// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics and statistics

use super::{HalfEdgeMesh, Mesh};
use serde::{Deserialize, Serialize};

/// Geometry statistics and analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryStats {
    /// Enclosed volume in cubic program units
    pub volume: f64,
    /// Total surface area in square program units
    pub surface_area: f64,
    /// Bounding box [min_x, min_y, min_z, max_x, max_y, max_z]
    pub bbox: [f64; 6],
    /// Centroid of the enclosed volume, or of the vertices for open meshes
    pub centroid: [f64; 3],
    /// Number of distinct vertex positions
    pub vertex_count: usize,
    pub triangle_count: usize,
    /// Every edge has exactly two faces with opposite windings
    pub is_watertight: bool,
}

impl GeometryStats {
    pub fn empty() -> Self {
        Self {
            volume: 0.0,
            surface_area: 0.0,
            bbox: [0.0; 6],
            centroid: [0.0; 3],
            vertex_count: 0,
            triangle_count: 0,
            is_watertight: false,
        }
    }
}

/// Analyze mesh geometry and compute statistics
pub fn analyze(mesh: &Mesh) -> GeometryStats {
    if mesh.is_empty() {
        return GeometryStats::empty();
    }

    let topology = HalfEdgeMesh::from_mesh(mesh);
    let is_watertight = topology.is_closed() && topology.non_manifold_edge_count() == 0;
    let bbox = mesh.bounding_box();
    let volume = mesh.signed_volume();

    GeometryStats {
        volume: if is_watertight { volume.abs() } else { 0.0 },
        surface_area: mesh.surface_area(),
        bbox: [bbox.min.x, bbox.min.y, bbox.min.z, bbox.max.x, bbox.max.y, bbox.max.z],
        centroid: calculate_centroid(mesh, &topology, volume, is_watertight),
        vertex_count: topology.vertex_count(),
        triangle_count: mesh.triangle_count(),
        is_watertight,
    }
}

/// Volume centroid from signed tetrahedra against the origin
fn calculate_centroid(mesh: &Mesh, topology: &HalfEdgeMesh, volume: f64, closed: bool) -> [f64; 3] {
    if closed && volume.abs() > f64::EPSILON {
        let mut weighted = nalgebra::Vector3::zeros();
        for index in 0..mesh.triangle_count() {
            let [a, b, c] = mesh.triangle_points(index);
            let tetra = a.coords.dot(&b.coords.cross(&c.coords)) / 6.0;
            weighted += (a.coords + b.coords + c.coords) / 4.0 * tetra;
        }
        let centroid = weighted / volume;
        return [centroid.x, centroid.y, centroid.z];
    }

    let count = topology.vertex_count().max(1) as f64;
    let sum = topology
        .vertices
        .iter()
        .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
    [sum.x / count, sum.y / count, sum.z / count]
}
