// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation and utilities

use super::BoundingBox;
use ahash::AHashMap;
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }

    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        self.position = matrix.transform_point(&self.position);
        // Normals go through the inverse transpose of the linear part
        let linear = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear.try_inverse().map(|m| m.transpose()).unwrap_or(linear);
        let normal = normal_matrix * self.normal;
        self.normal = normal.try_normalize(f64::EPSILON).unwrap_or(normal);
    }
}

/// Triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self { indices }
    }
}

/// Triangular mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a triangle
    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Append a flat-shaded triangle with its own three vertices.
    /// Degenerate triangles are dropped.
    pub fn push_facet(&mut self, a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) {
        let normal = (b - a).cross(&(c - a));
        let Some(normal) = normal.try_normalize(1e-12) else {
            return;
        };
        let i0 = self.add_vertex(Vertex::new(a, normal));
        let i1 = self.add_vertex(Vertex::new(b, normal));
        let i2 = self.add_vertex(Vertex::new(c, normal));
        self.add_triangle(Triangle::new([i0, i1, i2]));
    }

    /// Append a planar quad `a b c d` as two facets
    pub fn push_quad(&mut self, a: Point3<f64>, b: Point3<f64>, c: Point3<f64>, d: Point3<f64>) {
        self.push_facet(a, b, c);
        self.push_facet(a, c, d);
    }

    /// Corner positions of triangle `index`
    pub fn triangle_points(&self, index: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangles[index].indices;
        [
            self.vertices[a].position,
            self.vertices[b].position,
            self.vertices[c].position,
        ]
    }

    /// Unit normal of triangle `index` from its winding, zero if degenerate
    pub fn face_normal(&self, index: usize) -> Vector3<f64> {
        let [a, b, c] = self.triangle_points(index);
        let normal = (b - a).cross(&(c - a));
        normal.try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
    }

    /// Transform all vertices by a matrix. Mirroring transforms flip the
    /// winding so faces keep pointing outwards.
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for vertex in &mut self.vertices {
            vertex.transform(matrix);
        }
        // The inverse transpose already orients normals, only the winding
        // needs reversing under a mirror
        if matrix.fixed_view::<3, 3>(0, 0).determinant() < 0.0 {
            for triangle in &mut self.triangles {
                triangle.indices.swap(1, 2);
            }
        }
    }

    /// Reverse the winding of every triangle
    pub fn flip(&mut self) {
        for triangle in &mut self.triangles {
            triangle.indices.swap(1, 2);
        }
        for vertex in &mut self.vertices {
            vertex.normal = -vertex.normal;
        }
    }

    /// Compute bounding box
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.vertices.iter().map(|v| &v.position))
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Merge with another mesh (simple union without CSG)
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);

        for triangle in &other.triangles {
            self.triangles.push(Triangle::new([
                triangle.indices[0] + offset,
                triangle.indices[1] + offset,
                triangle.indices[2] + offset,
            ]));
        }
    }

    /// Weld vertices that are within epsilon distance of each other.
    /// Positions are bucketed on an epsilon grid so neighbouring cells are
    /// the only candidates. Returns the number of vertices removed.
    pub fn weld_vertices(&mut self, epsilon: f64) -> usize {
        if self.vertices.is_empty() {
            return 0;
        }

        let original_count = self.vertices.len();
        let (positions, remap) = weld_positions(self.vertices.iter().map(|v| &v.position), epsilon);

        let mut new_vertices: Vec<Vertex> = positions
            .iter()
            .map(|p| Vertex::new(*p, Vector3::zeros()))
            .collect();
        for (old, vertex) in self.vertices.iter().enumerate() {
            new_vertices[remap[old]].normal += vertex.normal;
        }
        for vertex in &mut new_vertices {
            vertex.normal = vertex
                .normal
                .try_normalize(1e-12)
                .unwrap_or_else(Vector3::z);
        }

        for triangle in &mut self.triangles {
            for index in &mut triangle.indices {
                *index = remap[*index];
            }
        }
        self.vertices = new_vertices;
        self.remove_degenerate_triangles();

        original_count - self.vertices.len()
    }

    /// Remove triangles that reference the same vertex twice or have no area.
    /// Returns the number of triangles removed.
    pub fn remove_degenerate_triangles(&mut self) -> usize {
        let original_count = self.triangles.len();
        let vertices = &self.vertices;
        self.triangles.retain(|t| {
            let [a, b, c] = t.indices;
            if a == b || b == c || a == c {
                return false;
            }
            let (pa, pb, pc) = (vertices[a].position, vertices[b].position, vertices[c].position);
            (pb - pa).cross(&(pc - pa)).norm() > 1e-12
        });
        original_count - self.triangles.len()
    }

    /// Signed volume by the divergence theorem; positive when faces point outwards
    pub fn signed_volume(&self) -> f64 {
        (0..self.triangles.len())
            .map(|i| {
                let [a, b, c] = self.triangle_points(i);
                a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
            })
            .sum()
    }

    pub fn surface_area(&self) -> f64 {
        (0..self.triangles.len())
            .map(|i| {
                let [a, b, c] = self.triangle_points(i);
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }

    /// Flip the mesh if it encloses negative volume
    pub fn orient_outward(&mut self) {
        if self.signed_volume() < 0.0 {
            self.flip();
        }
    }
}

/// Merge positions closer than `epsilon`. Returns the unique positions and,
/// for every input position, its index in that list.
pub fn weld_positions<'a>(
    points: impl Iterator<Item = &'a Point3<f64>>,
    epsilon: f64,
) -> (Vec<Point3<f64>>, Vec<usize>) {
    let cell_size = epsilon.max(f64::MIN_POSITIVE) * 2.0;
    let mut grid: AHashMap<(i64, i64, i64), Vec<usize>> = AHashMap::new();
    let mut unique: Vec<Point3<f64>> = Vec::new();
    let mut remap = Vec::new();

    for point in points {
        let cell = (
            (point.x / cell_size).floor() as i64,
            (point.y / cell_size).floor() as i64,
            (point.z / cell_size).floor() as i64,
        );

        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = (cell.0 + dx, cell.1 + dy, cell.2 + dz);
                    if let Some(candidates) = grid.get(&key) {
                        for &candidate in candidates {
                            if (unique[candidate] - point).norm() < epsilon {
                                found = Some(candidate);
                                break 'search;
                            }
                        }
                    }
                }
            }
        }

        let index = match found {
            Some(index) => index,
            None => {
                unique.push(*point);
                grid.entry(cell).or_default().push(unique.len() - 1);
                unique.len() - 1
            }
        };
        remap.push(index);
    }

    (unique, remap)
}
