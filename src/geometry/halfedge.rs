// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Half-edge mesh representation
//!
//! An index-addressed arena: vertices, faces and half-edges live in flat
//! vectors and refer to each other by position. Used for manifold checks,
//! feature edges in the renderer and planar face recovery for B-rep export.

use super::{weld_positions, Mesh};
use ahash::{AHashMap, AHashSet};
use nalgebra::{Point3, Vector3};

/// Half-edge in a half-edge mesh
/// Each edge has two half-edges, one for each direction
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge {
    /// Next half-edge in the same face (counter-clockwise)
    pub next: usize,
    /// Previous half-edge in the same face
    pub prev: usize,
    /// Twin half-edge (opposite direction, belongs to adjacent face)
    pub twin: Option<usize>,
    /// Vertex this half-edge points to
    pub vertex: usize,
    /// Face this half-edge belongs to
    pub face: usize,
}

/// Edge connecting two vertices
#[derive(Debug, Clone)]
pub struct Edge {
    pub vertices: (usize, usize),
    /// Every half-edge running along this edge, in either direction
    pub half_edges: Vec<usize>,
}

impl Edge {
    /// Manifold edges have at most one half-edge per direction
    pub fn is_manifold(&self, mesh: &HalfEdgeMesh) -> bool {
        match self.half_edges.as_slice() {
            [_] => true,
            [a, b] => mesh.source(*a) != mesh.source(*b),
            _ => false,
        }
    }
}

/// Set of edge-connected coplanar faces
#[derive(Debug, Clone)]
pub struct PlanarRegion {
    pub faces: Vec<usize>,
    pub normal: Vector3<f64>,
}

/// Half-edge mesh with full topological connectivity
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeMesh {
    /// Vertex positions
    pub vertices: Vec<Point3<f64>>,
    /// Face indices (triangles)
    pub faces: Vec<[usize; 3]>,
    /// Half-edges, three per face
    pub half_edges: Vec<HalfEdge>,
    /// Edges
    pub edges: Vec<Edge>,
}

impl HalfEdgeMesh {
    /// Build from a triangle mesh, welding coincident vertices first.
    /// The weld tolerance scales with the size of the mesh.
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let bbox = mesh.bounding_box();
        let scale = if bbox.is_empty() {
            1.0
        } else {
            bbox.size().amax().max(1.0)
        };
        let (vertices, remap) =
            weld_positions(mesh.vertices.iter().map(|v| &v.position), 1e-7 * scale);

        let faces = mesh
            .triangles
            .iter()
            .map(|t| t.indices.map(|i| remap[i]))
            .filter(|[a, b, c]| a != b && b != c && a != c)
            .collect();

        let mut he_mesh = Self {
            vertices,
            faces,
            half_edges: Vec::new(),
            edges: Vec::new(),
        };
        he_mesh.build_topology();
        he_mesh
    }

    /// Build half-edge topology from faces
    fn build_topology(&mut self) {
        self.half_edges.clear();
        self.edges.clear();

        for (face_idx, face) in self.faces.iter().enumerate() {
            let base = self.half_edges.len();
            for corner in 0..3 {
                self.half_edges.push(HalfEdge {
                    next: base + (corner + 1) % 3,
                    prev: base + (corner + 2) % 3,
                    twin: None,
                    vertex: face[(corner + 1) % 3],
                    face: face_idx,
                });
            }
        }

        self.build_edge_map();
    }

    /// Group half-edges by undirected edge and connect twins
    fn build_edge_map(&mut self) {
        let mut edge_map: AHashMap<(usize, usize), usize> = AHashMap::new();

        for he_idx in 0..self.half_edges.len() {
            let (from, to) = (self.source(he_idx), self.target(he_idx));
            let key = (from.min(to), from.max(to));
            let edge_idx = *edge_map.entry(key).or_insert_with(|| {
                self.edges.push(Edge {
                    vertices: key,
                    half_edges: Vec::new(),
                });
                self.edges.len() - 1
            });
            self.edges[edge_idx].half_edges.push(he_idx);
        }

        for edge in &self.edges {
            if let [a, b] = edge.half_edges.as_slice() {
                let (a, b) = (*a, *b);
                if self.source(a) != self.source(b) {
                    self.half_edges[a].twin = Some(b);
                    self.half_edges[b].twin = Some(a);
                }
            }
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Vertex a half-edge starts from
    pub fn source(&self, he: usize) -> usize {
        self.half_edges[self.half_edges[he].prev].vertex
    }

    /// Vertex a half-edge points to
    pub fn target(&self, he: usize) -> usize {
        self.half_edges[he].vertex
    }

    pub fn face_normal(&self, face: usize) -> Vector3<f64> {
        let [a, b, c] = self.faces[face].map(|i| self.vertices[i]);
        (b - a)
            .cross(&(c - a))
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Every edge has exactly one twin pair
    pub fn is_closed(&self) -> bool {
        !self.half_edges.is_empty() && self.half_edges.iter().all(|he| he.twin.is_some())
    }

    /// Edges shared by more than two faces or by two faces with clashing winding
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| !e.is_manifold(self)).count()
    }

    pub fn boundary_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.half_edges.len() == 1).count()
    }

    /// Segments where the surface creases by more than `angle_degrees`,
    /// plus open boundaries
    pub fn feature_edges(&self, angle_degrees: f64) -> Vec<(Point3<f64>, Point3<f64>)> {
        let threshold = angle_degrees.to_radians().cos();
        self.edges
            .iter()
            .filter(|edge| match edge.half_edges.as_slice() {
                [a, b] => {
                    let na = self.face_normal(self.half_edges[*a].face);
                    let nb = self.face_normal(self.half_edges[*b].face);
                    na.dot(&nb) < threshold
                }
                _ => true,
            })
            .map(|edge| (self.vertices[edge.vertices.0], self.vertices[edge.vertices.1]))
            .collect()
    }

    /// Flood-fill edge-connected faces that share one plane
    pub fn planar_regions(&self) -> Vec<PlanarRegion> {
        const NORMAL_TOLERANCE: f64 = 1e-9;
        let mut region_of = vec![usize::MAX; self.faces.len()];
        let mut regions = Vec::new();

        for seed in 0..self.faces.len() {
            if region_of[seed] != usize::MAX {
                continue;
            }
            let normal = self.face_normal(seed);
            let offset = normal.dot(&self.vertices[self.faces[seed][0]].coords);
            let index = regions.len();
            let mut faces = vec![seed];
            region_of[seed] = index;
            let mut stack = vec![seed];

            while let Some(face) = stack.pop() {
                for corner in 0..3 {
                    let Some(twin) = self.half_edges[face * 3 + corner].twin else {
                        continue;
                    };
                    let neighbour = self.half_edges[twin].face;
                    if region_of[neighbour] != usize::MAX {
                        continue;
                    }
                    let other = self.face_normal(neighbour);
                    let distance = normal.dot(&self.vertices[self.faces[neighbour][0]].coords) - offset;
                    if other.dot(&normal) > 1.0 - NORMAL_TOLERANCE && distance.abs() < 1e-7 {
                        region_of[neighbour] = index;
                        faces.push(neighbour);
                        stack.push(neighbour);
                    }
                }
            }

            faces.sort_unstable();
            regions.push(PlanarRegion { faces, normal });
        }

        regions
    }

    /// Boundary loops of a region as vertex index cycles. The loop with the
    /// largest enclosed area comes first; it is the outer bound.
    pub fn region_loops(&self, region: &PlanarRegion) -> Vec<Vec<usize>> {
        let members: AHashSet<usize> = region.faces.iter().copied().collect();
        let mut outgoing: AHashMap<usize, Vec<usize>> = AHashMap::new();
        let mut boundary = Vec::new();

        for &face in &region.faces {
            for he in face * 3..face * 3 + 3 {
                let inside = self.half_edges[he]
                    .twin
                    .is_some_and(|twin| members.contains(&self.half_edges[twin].face));
                if !inside {
                    outgoing.entry(self.source(he)).or_default().push(he);
                    boundary.push(he);
                }
            }
        }

        let mut used: AHashSet<usize> = AHashSet::new();
        let mut loops = Vec::new();
        for &start in &boundary {
            if used.contains(&start) {
                continue;
            }
            let mut cycle = Vec::new();
            let mut current = start;
            loop {
                used.insert(current);
                cycle.push(self.source(current));
                let next = outgoing
                    .get(&self.target(current))
                    .and_then(|candidates| candidates.iter().find(|he| !used.contains(*he)));
                match next {
                    Some(&he) => current = he,
                    None => break,
                }
            }
            if cycle.len() >= 3 {
                loops.push(cycle);
            }
        }

        let area = |cycle: &Vec<usize>| -> f64 {
            let mut sum = Vector3::zeros();
            for (i, &v) in cycle.iter().enumerate() {
                let next = cycle[(i + 1) % cycle.len()];
                sum += self.vertices[v].coords.cross(&self.vertices[next].coords);
            }
            sum.dot(&region.normal) * 0.5
        };
        loops.sort_by(|a, b| area(b).abs().total_cmp(&area(a).abs()));
        loops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;

    fn cube() -> Mesh {
        Primitive::Cuboid {
            size: Vector3::new(2.0, 2.0, 2.0),
        }
        .to_mesh()
    }

    #[test]
    fn test_cube_topology() {
        let mesh = HalfEdgeMesh::from_mesh(&cube());
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 12);
        assert_eq!(mesh.edge_count(), 18);
        assert!(mesh.is_closed());
        assert_eq!(mesh.non_manifold_edge_count(), 0);
    }

    #[test]
    fn test_open_mesh_has_boundary() {
        let mut open = cube();
        open.triangles.truncate(10);
        let mesh = HalfEdgeMesh::from_mesh(&open);
        assert!(!mesh.is_closed());
        assert_eq!(mesh.boundary_edge_count(), 4);
    }

    #[test]
    fn test_shared_edge_is_non_manifold() {
        let mut mesh = Mesh::new();
        let a = Point3::origin();
        let b = Point3::new(1.0, 0.0, 0.0);
        mesh.push_facet(a, b, Point3::new(0.0, 1.0, 0.0));
        mesh.push_facet(b, a, Point3::new(0.0, -1.0, 0.0));
        mesh.push_facet(a, b, Point3::new(0.0, 0.0, 1.0));
        let topology = HalfEdgeMesh::from_mesh(&mesh);
        assert_eq!(topology.non_manifold_edge_count(), 1);
    }

    #[test]
    fn test_planar_regions_of_cube() {
        let mesh = HalfEdgeMesh::from_mesh(&cube());
        let regions = mesh.planar_regions();
        assert_eq!(regions.len(), 6);
        for region in &regions {
            let loops = mesh.region_loops(region);
            assert_eq!(loops.len(), 1);
            assert_eq!(loops[0].len(), 4);
        }
    }

    #[test]
    fn test_feature_edges_of_cube() {
        let mesh = HalfEdgeMesh::from_mesh(&cube());
        // Face diagonals are flat, the twelve cube edges are creases
        assert_eq!(mesh.feature_edges(30.0).len(), 12);
    }
}
