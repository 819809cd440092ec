// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Extrusion and revolution of planar profiles into solids

use super::{mesh_utils, GeometryError, Mesh, Plane, Profile};
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// In-plane axis a profile revolves around
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevolveAxis {
    X,
    Y,
}

impl std::str::FromStr for RevolveAxis {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "X" => Ok(RevolveAxis::X),
            "Y" => Ok(RevolveAxis::Y),
            _ => Err(GeometryError::UnknownAxis(s.to_string())),
        }
    }
}

/// Sweep `profile` along the plane normal by `distance`, which may be negative
pub fn extrude(profile: &Profile, plane: &Plane, distance: f64) -> Result<Mesh, GeometryError> {
    if !distance.is_finite() || distance.abs() < 1e-12 {
        return Err(GeometryError::ZeroDistance);
    }

    let triangles = profile.triangulate()?;
    let points = profile.points();
    let bottom = |p: &Point2<f64>| plane.to_world_at(p, 0.0);
    let top = |p: &Point2<f64>| plane.to_world_at(p, distance);

    let mut mesh = Mesh::new();
    for [a, b, c] in &triangles {
        mesh.push_facet(top(&points[*a]), top(&points[*b]), top(&points[*c]));
        mesh.push_facet(bottom(&points[*a]), bottom(&points[*c]), bottom(&points[*b]));
    }
    for loop_points in profile.loops() {
        let n = loop_points.len();
        for i in 0..n {
            let (p, q) = (&loop_points[i], &loop_points[(i + 1) % n]);
            mesh.push_quad(bottom(p), bottom(q), top(q), top(p));
        }
    }

    mesh.orient_outward();
    mesh_utils::clean(&mut mesh);
    Ok(mesh)
}

/// Revolve `profile` about an in-plane axis through the plane origin.
/// Partial revolutions are capped at both ends.
pub fn revolve(
    profile: &Profile,
    plane: &Plane,
    axis: RevolveAxis,
    angle_degrees: f64,
    segments: u32,
) -> Result<Mesh, GeometryError> {
    if !angle_degrees.is_finite() || angle_degrees.abs() < 1e-9 || angle_degrees.abs() > 360.0 {
        return Err(GeometryError::RevolveAngle);
    }

    let (axis_direction, radial_base) = match axis {
        RevolveAxis::X => (plane.x_axis, plane.y_axis),
        RevolveAxis::Y => (plane.y_axis, plane.x_axis),
    };
    let split = |p: &Point2<f64>| match axis {
        RevolveAxis::X => (p.x, p.y),
        RevolveAxis::Y => (p.y, p.x),
    };

    let points = profile.points();
    let tolerance = 1e-9 * points.iter().map(|p| p.coords.amax()).fold(1.0, f64::max);
    let radii = points.iter().map(|p| split(p).1);
    let (min_r, max_r) = radii.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        (lo.min(r), hi.max(r))
    });
    if min_r < -tolerance && max_r > tolerance {
        return Err(GeometryError::CrossesAxis);
    }

    let full = (angle_degrees.abs() - 360.0).abs() < 1e-9;
    let steps = ((segments.max(3) as f64) * angle_degrees.abs() / 360.0).ceil().max(3.0) as usize;
    let normal = plane.normal();
    let sweep = |p: &Point2<f64>, step: usize| -> Point3<f64> {
        let step = if full { step % steps } else { step };
        let theta = angle_degrees.to_radians() * step as f64 / steps as f64;
        let (height, radius) = split(p);
        let radial: Vector3<f64> = radial_base * theta.cos() + normal * theta.sin();
        plane.origin + axis_direction * height + radial * radius
    };

    let mut mesh = Mesh::new();
    for loop_points in profile.loops() {
        let n = loop_points.len();
        for i in 0..n {
            let (p, q) = (&loop_points[i], &loop_points[(i + 1) % n]);
            for step in 0..steps {
                mesh.push_quad(sweep(p, step), sweep(q, step), sweep(q, step + 1), sweep(p, step + 1));
            }
        }
    }

    if !full {
        let triangles = profile.triangulate()?;
        for [a, b, c] in &triangles {
            let (a, b, c) = (&points[*a], &points[*b], &points[*c]);
            mesh.push_facet(sweep(a, 0), sweep(c, 0), sweep(b, 0));
            mesh.push_facet(sweep(a, steps), sweep(b, steps), sweep(c, steps));
        }
    }

    mesh.orient_outward();
    mesh_utils::clean(&mut mesh);
    if mesh.is_empty() {
        return Err(GeometryError::ZeroArea);
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::HalfEdgeMesh;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> Profile {
        let points = vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ];
        Profile::new(&points, &[]).unwrap()
    }

    #[test]
    fn test_extrude_box() {
        let plane = Plane::named("XY").unwrap();
        let mesh = extrude(&rectangle(0.0, 0.0, 2.0, 3.0), &plane, 4.0).unwrap();
        assert_relative_eq!(mesh.signed_volume(), 24.0, epsilon = 1e-9);
        assert!(HalfEdgeMesh::from_mesh(&mesh).is_closed());
        let bbox = mesh.bounding_box();
        assert_relative_eq!(bbox.max.z, 4.0);
    }

    #[test]
    fn test_negative_extrusion_is_outward() {
        let plane = Plane::named("XZ").unwrap();
        let mesh = extrude(&rectangle(0.0, 0.0, 1.0, 1.0), &plane, -2.0).unwrap();
        assert_relative_eq!(mesh.signed_volume(), 2.0, epsilon = 1e-9);
        // XZ normal is -Y, so a negative distance grows towards +Y
        assert_relative_eq!(mesh.bounding_box().max.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_extrude_with_hole() {
        let plane = Plane::named("XY").unwrap();
        let outer = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        let hole = vec![
            Point2::new(1.0, 1.0),
            Point2::new(3.0, 1.0),
            Point2::new(3.0, 3.0),
            Point2::new(1.0, 3.0),
        ];
        let profile = Profile::new(&outer, &[hole]).unwrap();
        let mesh = extrude(&profile, &plane, 1.0).unwrap();
        assert_relative_eq!(mesh.signed_volume(), 12.0, epsilon = 1e-9);
        assert!(HalfEdgeMesh::from_mesh(&mesh).is_closed());
    }

    #[test]
    fn test_zero_distance() {
        let plane = Plane::named("XY").unwrap();
        let err = extrude(&rectangle(0.0, 0.0, 1.0, 1.0), &plane, 0.0).unwrap_err();
        assert_eq!(err, GeometryError::ZeroDistance);
    }

    #[test]
    fn test_full_revolve_makes_tube() {
        let plane = Plane::named("XY").unwrap();
        let mesh = revolve(&rectangle(1.0, 0.0, 2.0, 1.0), &plane, RevolveAxis::Y, 360.0, 128).unwrap();
        let exact = PI * (4.0 - 1.0) * 1.0;
        assert_relative_eq!(mesh.signed_volume(), exact, max_relative = 0.01);
        assert!(HalfEdgeMesh::from_mesh(&mesh).is_closed());
    }

    #[test]
    fn test_partial_revolve_is_capped() {
        let plane = Plane::named("XY").unwrap();
        let mesh = revolve(&rectangle(1.0, 0.0, 2.0, 1.0), &plane, RevolveAxis::Y, 90.0, 64).unwrap();
        let exact = PI * 3.0 / 4.0;
        assert_relative_eq!(mesh.signed_volume(), exact, max_relative = 0.01);
        assert!(HalfEdgeMesh::from_mesh(&mesh).is_closed());
    }

    #[test]
    fn test_profile_crossing_axis() {
        let plane = Plane::named("XY").unwrap();
        let err = revolve(&rectangle(-1.0, 0.0, 1.0, 1.0), &plane, RevolveAxis::Y, 360.0, 16).unwrap_err();
        assert_eq!(err, GeometryError::CrossesAxis);
    }
}
