// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Fixed perspective camera fitted to the scene bounds

use crate::geometry::BoundingBox;
use nalgebra::{Matrix4, Perspective3, Point3, Vector3};

/// Looks at the bounding-box centre from `(1, -1, 1)` with Z up
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Point3<f64>,
    pub target: Point3<f64>,
    view_projection: Matrix4<f64>,
}

impl Camera {
    /// Direction from the target towards the eye
    pub fn direction() -> Vector3<f64> {
        Vector3::new(1.0, -1.0, 1.0).normalize()
    }

    /// Place the camera so the bounding sphere of `bbox` fills the view
    pub fn fit(bbox: &BoundingBox, fov_degrees: f64, aspect: f64) -> Self {
        let target = bbox.center();
        let radius = bbox.bounding_radius().max(1e-6);
        let fov_y = fov_degrees.to_radians();
        let half_v = fov_y * 0.5;
        let half_h = (half_v.tan() * aspect).atan();
        let distance = radius / half_v.min(half_h).sin();
        let eye = target + Self::direction() * distance;

        let near = (distance - radius) * 0.5;
        let far = distance + radius * 2.0;
        let view = Matrix4::look_at_rh(&eye, &target, &Vector3::z());
        let projection = Perspective3::new(aspect, fov_y, near.max(1e-9), far).to_homogeneous();

        Self {
            eye,
            target,
            view_projection: projection * view,
        }
    }

    /// Unit vector the camera looks along
    pub fn view_direction(&self) -> Vector3<f64> {
        (self.target - self.eye).normalize()
    }

    /// Screen position in pixels (y down) and normalised depth, smaller is
    /// nearer. `None` for points behind the eye.
    pub fn project(&self, point: &Point3<f64>, width: u32, height: u32) -> Option<Point3<f64>> {
        let clip = self.view_projection * point.to_homogeneous();
        if clip.w <= 1e-12 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(Point3::new(
            (ndc.x + 1.0) * 0.5 * width as f64,
            (1.0 - ndc.y) * 0.5 * height as f64,
            ndc.z,
        ))
    }
}
