// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Evaluated geometry of one scene node

use super::{BoundingBox, Mesh};
use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};

/// What a body represents, which decides where it can be exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GeometryKind {
    /// Closed volume
    Solid,
    /// Bounded region without thickness
    Surface,
    /// Open path
    Curve,
}

impl GeometryKind {
    pub fn name(self) -> &'static str {
        match self {
            GeometryKind::Solid => "solid",
            GeometryKind::Surface => "surface",
            GeometryKind::Curve => "curve",
        }
    }
}

/// Open or closed polyline in world space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point3<f64>>,
    pub closed: bool,
}

impl Polyline {
    /// Consecutive point pairs, including the closing segment
    pub fn segments(&self) -> impl Iterator<Item = (Point3<f64>, Point3<f64>)> + '_ {
        let n = self.points.len();
        let count = match (self.closed, n) {
            (_, 0 | 1) => 0,
            (true, _) => n,
            (false, _) => n - 1,
        };
        (0..count).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub kind: GeometryKind,
    pub mesh: Mesh,
    pub curves: Vec<Polyline>,
}

impl Body {
    pub fn solid(mesh: Mesh) -> Self {
        Self {
            kind: GeometryKind::Solid,
            mesh,
            curves: Vec::new(),
        }
    }

    pub fn surface(mesh: Mesh, boundary: Polyline) -> Self {
        Self {
            kind: GeometryKind::Surface,
            mesh,
            curves: vec![boundary],
        }
    }

    pub fn curve(path: Polyline) -> Self {
        Self {
            kind: GeometryKind::Curve,
            mesh: Mesh::new(),
            curves: vec![path],
        }
    }

    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        self.mesh.transform(matrix);
        for curve in &mut self.curves {
            for point in &mut curve.points {
                *point = matrix.transform_point(point);
            }
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let curve_points = self.curves.iter().flat_map(|c| c.points.iter());
        let mesh_points = self.mesh.vertices.iter().map(|v| &v.position);
        BoundingBox::from_points(mesh_points.chain(curve_points))
    }

    pub fn is_empty(&self) -> bool {
        self.mesh.is_empty() && self.curves.iter().all(|c| c.points.len() < 2)
    }
}
