// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator

use super::{GeometryError, Mesh};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Geometric primitives. Cuboids sit with one corner on the origin,
/// cylinders stand on the XY plane around the Z axis, spheres are centred.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum Primitive {
    Cuboid { size: Vector3<f64> },
    Cylinder { radius: f64, height: f64, segments: u32 },
    Sphere { radius: f64, segments: u32 },
}

impl Primitive {
    /// Reject zero, negative and non-finite dimensions
    pub fn validate(&self) -> Result<(), GeometryError> {
        let dimensions: Vec<(&'static str, f64)> = match self {
            Self::Cuboid { size } => vec![("cube size", size.x), ("cube size", size.y), ("cube size", size.z)],
            Self::Cylinder { radius, height, .. } => {
                vec![("cylinder radius", *radius), ("cylinder height", *height)]
            }
            Self::Sphere { radius, .. } => vec![("sphere radius", *radius)],
        };
        for (what, value) in dimensions {
            if !(value.is_finite() && value > 0.0) {
                return Err(GeometryError::NonPositive(what));
            }
        }
        Ok(())
    }

    pub fn to_mesh(&self) -> Mesh {
        match self {
            Self::Cuboid { size } => generate_cuboid_mesh(*size),
            Self::Cylinder {
                radius,
                height,
                segments,
            } => generate_cylinder_mesh(*radius, *height, (*segments).max(3)),
            Self::Sphere { radius, segments } => generate_sphere_mesh(*radius, (*segments).max(3)),
        }
    }
}

fn generate_cuboid_mesh(size: Vector3<f64>) -> Mesh {
    let mut mesh = Mesh::with_capacity(24, 12);
    let p = |x: f64, y: f64, z: f64| Point3::new(x * size.x, y * size.y, z * size.z);

    // Six faces, counter-clockwise seen from outside
    mesh.push_quad(p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.), p(1., 0., 0.));
    mesh.push_quad(p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.));
    mesh.push_quad(p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.));
    mesh.push_quad(p(0., 1., 0.), p(0., 1., 1.), p(1., 1., 1.), p(1., 1., 0.));
    mesh.push_quad(p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.));
    mesh.push_quad(p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.), p(1., 0., 1.));
    mesh
}

fn generate_cylinder_mesh(radius: f64, height: f64, segments: u32) -> Mesh {
    let mut mesh = Mesh::with_capacity(segments as usize * 12, segments as usize * 4);
    let bottom_center = Point3::origin();
    let top_center = Point3::new(0.0, 0.0, height);
    let ring = |i: u32, z: f64| {
        let angle = 2.0 * PI * (i % segments) as f64 / segments as f64;
        Point3::new(radius * angle.cos(), radius * angle.sin(), z)
    };

    for i in 0..segments {
        let (b0, b1) = (ring(i, 0.0), ring(i + 1, 0.0));
        let (t0, t1) = (ring(i, height), ring(i + 1, height));
        mesh.push_facet(bottom_center, b1, b0);
        mesh.push_facet(top_center, t0, t1);
        mesh.push_quad(b0, b1, t1, t0);
    }
    mesh
}

fn generate_sphere_mesh(radius: f64, segments: u32) -> Mesh {
    let rings = (segments / 2).max(2);
    let mut mesh = Mesh::with_capacity((segments * rings * 6) as usize, (segments * rings * 2) as usize);
    let point = |ring: u32, segment: u32| {
        let theta = PI * ring as f64 / rings as f64;
        let phi = 2.0 * PI * (segment % segments) as f64 / segments as f64;
        Point3::new(
            radius * theta.sin() * phi.cos(),
            radius * theta.sin() * phi.sin(),
            radius * theta.cos(),
        )
    };

    for ring in 0..rings {
        for segment in 0..segments {
            let a = point(ring, segment);
            let b = point(ring + 1, segment);
            let c = point(ring + 1, segment + 1);
            let d = point(ring, segment + 1);
            if ring == 0 {
                mesh.push_facet(a, b, c);
            } else if ring == rings - 1 {
                mesh.push_facet(a, b, d);
            } else {
                mesh.push_quad(a, b, c, d);
            }
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::HalfEdgeMesh;
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_generation() {
        let mesh = Primitive::Cuboid {
            size: Vector3::new(10.0, 10.0, 10.0),
        }
        .to_mesh();
        assert_eq!(mesh.triangle_count(), 12);
        assert_relative_eq!(mesh.signed_volume(), 1000.0, epsilon = 1e-9);
        let bbox = mesh.bounding_box();
        assert_eq!(bbox.min, Point3::origin());
        assert_eq!(bbox.max, Point3::new(10.0, 10.0, 10.0));
    }

    #[test]
    fn test_cylinder_is_closed_and_outward() {
        let mesh = Primitive::Cylinder {
            radius: 2.0,
            height: 5.0,
            segments: 32,
        }
        .to_mesh();
        assert!(mesh.signed_volume() > 0.0);
        let topology = HalfEdgeMesh::from_mesh(&mesh);
        assert!(topology.is_closed());
    }

    #[test]
    fn test_sphere_is_closed_and_outward() {
        let mesh = Primitive::Sphere {
            radius: 3.0,
            segments: 24,
        }
        .to_mesh();
        assert!(mesh.signed_volume() > 0.0);
        let topology = HalfEdgeMesh::from_mesh(&mesh);
        assert!(topology.is_closed());
        assert_eq!(topology.non_manifold_edge_count(), 0);
    }

    #[test]
    fn test_rejects_non_positive_dimensions() {
        let cube = Primitive::Cuboid {
            size: Vector3::new(1.0, 0.0, 1.0),
        };
        assert!(cube.validate().is_err());
        let sphere = Primitive::Sphere {
            radius: -1.0,
            segments: 8,
        };
        assert!(sphere.validate().is_err());
    }
}
