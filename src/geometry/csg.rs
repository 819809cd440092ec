// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CSG (Constructive Solid Geometry) operations using BSP tree

use super::{Mesh, Vertex};
use nalgebra::{Point3, Vector3};

const EPSILON: f64 = 1e-5;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: Vector3<f64>,
    w: f64,
}

impl Plane {
    fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Self> {
        let normal = (b - a).cross(&(c - a)).try_normalize(1e-12)?;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    fn classify(&self, point: &Point3<f64>) -> u8 {
        let t = self.normal.dot(&point.coords) - self.w;
        if t < -EPSILON {
            BACK
        } else if t > EPSILON {
            FRONT
        } else {
            COPLANAR
        }
    }

    /// Split `polygon` by this plane into the four output lists
    fn split_polygon(
        &self,
        polygon: &Polygon,
        coplanar_front: &mut Vec<Polygon>,
        coplanar_back: &mut Vec<Polygon>,
        front: &mut Vec<Polygon>,
        back: &mut Vec<Polygon>,
    ) {
        let types: Vec<u8> = polygon.vertices.iter().map(|p| self.classify(p)).collect();
        let polygon_type = types.iter().fold(COPLANAR, |acc, t| acc | t);

        match polygon_type {
            COPLANAR => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    coplanar_front.push(polygon.clone());
                } else {
                    coplanar_back.push(polygon.clone());
                }
            }
            FRONT => front.push(polygon.clone()),
            BACK => back.push(polygon.clone()),
            _ => {
                let mut f = Vec::new();
                let mut b = Vec::new();
                let count = polygon.vertices.len();
                for i in 0..count {
                    let j = (i + 1) % count;
                    let (ti, tj) = (types[i], types[j]);
                    let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                    if ti != BACK {
                        f.push(vi);
                    }
                    if ti != FRONT {
                        b.push(vi);
                    }
                    if (ti | tj) == SPANNING {
                        let t = (self.w - self.normal.dot(&vi.coords))
                            / self.normal.dot(&(vj - vi));
                        let v = vi + (vj - vi) * t;
                        f.push(v);
                        b.push(v);
                    }
                }
                if f.len() >= 3 {
                    front.push(Polygon::with_plane(f, polygon.plane));
                }
                if b.len() >= 3 {
                    back.push(Polygon::with_plane(b, polygon.plane));
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Polygon {
    vertices: Vec<Point3<f64>>,
    plane: Plane,
}

impl Polygon {
    fn new(vertices: Vec<Point3<f64>>) -> Option<Self> {
        let plane = Plane::from_points(&vertices[0], &vertices[1], &vertices[2])?;
        Some(Self { vertices, plane })
    }

    fn with_plane(vertices: Vec<Point3<f64>>, plane: Plane) -> Self {
        Self { vertices, plane }
    }

    fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }
}

/// BSP tree node for CSG operations
#[derive(Debug, Default)]
struct BspNode {
    plane: Option<Plane>,
    front: Option<Box<BspNode>>,
    back: Option<Box<BspNode>>,
    polygons: Vec<Polygon>,
}

impl BspNode {
    fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = Self::default();
        node.build(polygons);
        node
    }

    /// Convert solid space to empty space and back
    fn invert(&mut self) {
        for polygon in &mut self.polygons {
            polygon.flip();
        }
        if let Some(plane) = &mut self.plane {
            plane.flip();
        }
        if let Some(front) = &mut self.front {
            front.invert();
        }
        if let Some(back) = &mut self.back {
            back.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Remove the parts of `polygons` that lie inside this tree
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let Some(plane) = self.plane else {
            return polygons;
        };
        let mut front = Vec::new();
        let mut back = Vec::new();
        for polygon in &polygons {
            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            plane.split_polygon(polygon, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
            front.append(&mut coplanar_front);
            back.append(&mut coplanar_back);
        }
        let front = match &self.front {
            Some(node) => node.clip_polygons(front),
            None => front,
        };
        let back = match &self.back {
            Some(node) => node.clip_polygons(back),
            None => Vec::new(),
        };
        front.into_iter().chain(back).collect()
    }

    /// Remove the parts of this tree's polygons that lie inside `other`
    fn clip_to(&mut self, other: &BspNode) {
        self.polygons = other.clip_polygons(std::mem::take(&mut self.polygons));
        if let Some(front) = &mut self.front {
            front.clip_to(other);
        }
        if let Some(back) = &mut self.back {
            back.clip_to(other);
        }
    }

    fn all_polygons(&self) -> Vec<Polygon> {
        let mut polygons = self.polygons.clone();
        if let Some(front) = &self.front {
            polygons.extend(front.all_polygons());
        }
        if let Some(back) = &self.back {
            polygons.extend(back.all_polygons());
        }
        polygons
    }

    fn build(&mut self, polygons: Vec<Polygon>) {
        if polygons.is_empty() {
            return;
        }
        let plane = *self.plane.get_or_insert(polygons[0].plane);
        let mut front = Vec::new();
        let mut back = Vec::new();
        for polygon in &polygons {
            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            plane.split_polygon(polygon, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
            self.polygons.append(&mut coplanar_front);
            self.polygons.append(&mut coplanar_back);
        }
        if !front.is_empty() {
            self.front.get_or_insert_with(Box::default).build(front);
        }
        if !back.is_empty() {
            self.back.get_or_insert_with(Box::default).build(back);
        }
    }
}

/// Boolean operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BooleanOp {
    Union,
    Subtract,
    Intersect,
}

impl BooleanOp {
    pub fn name(self) -> &'static str {
        match self {
            BooleanOp::Union => "union",
            BooleanOp::Subtract => "subtract",
            BooleanOp::Intersect => "intersect",
        }
    }
}

/// Combine two closed meshes
pub fn boolean(a: &Mesh, b: &Mesh, op: BooleanOp) -> Mesh {
    let mut a = BspNode::new(to_polygons(a));
    let mut b = BspNode::new(to_polygons(b));

    match op {
        BooleanOp::Union => {
            a.clip_to(&b);
            b.clip_to(&a);
            b.invert();
            b.clip_to(&a);
            b.invert();
            a.build(b.all_polygons());
        }
        BooleanOp::Subtract => {
            a.invert();
            a.clip_to(&b);
            b.clip_to(&a);
            b.invert();
            b.clip_to(&a);
            b.invert();
            a.build(b.all_polygons());
            a.invert();
        }
        BooleanOp::Intersect => {
            a.invert();
            b.clip_to(&a);
            b.invert();
            a.clip_to(&b);
            b.clip_to(&a);
            a.build(b.all_polygons());
            a.invert();
        }
    }

    to_mesh(&a.all_polygons())
}

fn to_polygons(mesh: &Mesh) -> Vec<Polygon> {
    (0..mesh.triangles.len())
        .filter_map(|i| Polygon::new(mesh.triangle_points(i).to_vec()))
        .collect()
}

fn to_mesh(polygons: &[Polygon]) -> Mesh {
    let mut mesh = Mesh::new();
    for polygon in polygons {
        let first = mesh.add_vertex(Vertex::new(polygon.vertices[0], polygon.plane.normal));
        let rest: Vec<usize> = polygon.vertices[1..]
            .iter()
            .map(|p| mesh.add_vertex(Vertex::new(*p, polygon.plane.normal)))
            .collect();
        for pair in rest.windows(2) {
            mesh.add_triangle(super::Triangle::new([first, pair[0], pair[1]]));
        }
    }
    mesh.remove_degenerate_triangles();
    mesh
}
