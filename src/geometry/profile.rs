// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Sketch planes and validated planar profiles

use super::triangulate::{orient, signed_area, triangulate};
use super::GeometryError;
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A sketch plane: origin plus two orthonormal in-plane axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plane {
    pub origin: Point3<f64>,
    pub x_axis: Vector3<f64>,
    pub y_axis: Vector3<f64>,
}

impl Plane {
    pub fn new(origin: Point3<f64>, x_axis: Vector3<f64>, y_axis: Vector3<f64>) -> Self {
        Self {
            origin,
            x_axis,
            y_axis,
        }
    }

    /// Standard planes by name. A leading `-` flips the plane's y axis and
    /// with it the normal.
    pub fn named(name: &str) -> Option<Plane> {
        let (negated, base) = match name.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, name),
        };
        let (x_axis, y_axis) = match base.to_ascii_uppercase().as_str() {
            "XY" => (Vector3::x(), Vector3::y()),
            "XZ" => (Vector3::x(), Vector3::z()),
            "YZ" => (Vector3::y(), Vector3::z()),
            _ => return None,
        };
        let y_axis = if negated { -y_axis } else { y_axis };
        Some(Plane::new(Point3::origin(), x_axis, y_axis))
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.x_axis.cross(&self.y_axis)
    }

    /// Same orientation, moved along the normal
    pub fn offset(&self, distance: f64) -> Plane {
        Plane {
            origin: self.origin + self.normal() * distance,
            ..*self
        }
    }

    pub fn to_world(&self, point: &Point2<f64>) -> Point3<f64> {
        self.to_world_at(point, 0.0)
    }

    /// Point `height` above the plane along its normal
    pub fn to_world_at(&self, point: &Point2<f64>, height: f64) -> Point3<f64> {
        self.origin + self.x_axis * point.x + self.y_axis * point.y + self.normal() * height
    }
}

/// A closed planar region: one outer loop and any number of holes.
/// Outer loops run counter-clockwise and holes clockwise once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    outer: Vec<Point2<f64>>,
    holes: Vec<Vec<Point2<f64>>>,
}

impl Profile {
    pub fn new(outer: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Result<Self, GeometryError> {
        let mut outer = clean_loop(outer)?;
        if signed_area(&outer) < 0.0 {
            outer.reverse();
        }

        let mut cleaned_holes = Vec::with_capacity(holes.len());
        for hole in holes {
            let mut hole = clean_loop(hole)?;
            if signed_area(&hole) > 0.0 {
                hole.reverse();
            }
            let inside = hole.iter().all(|p| contains_point(&outer, p))
                && !loops_intersect(&outer, &hole);
            if !inside {
                return Err(GeometryError::HoleOutside);
            }
            if cleaned_holes.iter().any(|other: &Vec<Point2<f64>>| {
                loops_intersect(other, &hole) || contains_point(other, &hole[0])
            }) {
                return Err(GeometryError::HoleOutside);
            }
            cleaned_holes.push(hole);
        }

        Ok(Self {
            outer,
            holes: cleaned_holes,
        })
    }

    pub fn outer(&self) -> &[Point2<f64>] {
        &self.outer
    }

    pub fn holes(&self) -> &[Vec<Point2<f64>>] {
        &self.holes
    }

    /// Outer loop first, then every hole
    pub fn loops(&self) -> impl Iterator<Item = &[Point2<f64>]> {
        std::iter::once(self.outer.as_slice()).chain(self.holes.iter().map(|h| h.as_slice()))
    }

    /// Every loop point in the order triangle indices refer to
    pub fn points(&self) -> Vec<Point2<f64>> {
        self.loops().flatten().copied().collect()
    }

    pub fn area(&self) -> f64 {
        signed_area(&self.outer) + self.holes.iter().map(|h| signed_area(h)).sum::<f64>()
    }

    pub fn triangulate(&self) -> Result<Vec<[usize; 3]>, GeometryError> {
        triangulate(&self.outer, &self.holes)
    }
}

/// Drop repeated points, including a closing copy of the first point, and
/// reject loops that cannot bound an area
fn clean_loop(points: &[Point2<f64>]) -> Result<Vec<Point2<f64>>, GeometryError> {
    let scale = points
        .iter()
        .map(|p| p.x.abs().max(p.y.abs()))
        .fold(1.0_f64, f64::max);
    let tolerance = 1e-9 * scale;

    let mut cleaned: Vec<Point2<f64>> = Vec::with_capacity(points.len());
    for point in points {
        if cleaned.last().map_or(true, |last| (last - point).norm() > tolerance) {
            cleaned.push(*point);
        }
    }
    while cleaned.len() > 1 && (cleaned[0] - cleaned[cleaned.len() - 1]).norm() <= tolerance {
        cleaned.pop();
    }

    if cleaned.len() < 3 {
        return Err(GeometryError::TooFewPoints);
    }
    if signed_area(&cleaned).abs() <= 1e-12 * scale * scale {
        return Err(GeometryError::ZeroArea);
    }
    if self_intersects(&cleaned) {
        return Err(GeometryError::SelfIntersecting);
    }
    Ok(cleaned)
}

fn segments_intersect(
    p1: &Point2<f64>,
    p2: &Point2<f64>,
    q1: &Point2<f64>,
    q2: &Point2<f64>,
) -> bool {
    let d1 = orient(p1, p2, q1);
    let d2 = orient(p1, p2, q2);
    let d3 = orient(q1, q2, p1);
    let d4 = orient(q1, q2, p2);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    let on_segment = |a: &Point2<f64>, b: &Point2<f64>, p: &Point2<f64>| {
        p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
    };
    (d1 == 0.0 && on_segment(p1, p2, q1))
        || (d2 == 0.0 && on_segment(p1, p2, q2))
        || (d3 == 0.0 && on_segment(q1, q2, p1))
        || (d4 == 0.0 && on_segment(q1, q2, p2))
}

fn self_intersects(points: &[Point2<f64>]) -> bool {
    let n = points.len();
    for i in 0..n {
        for j in i + 1..n {
            // Edges sharing a vertex always touch
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            if segments_intersect(&points[i], &points[(i + 1) % n], &points[j], &points[(j + 1) % n]) {
                return true;
            }
        }
    }
    false
}

fn loops_intersect(a: &[Point2<f64>], b: &[Point2<f64>]) -> bool {
    let (n, m) = (a.len(), b.len());
    (0..n).any(|i| {
        (0..m).any(|j| segments_intersect(&a[i], &a[(i + 1) % n], &b[j], &b[(j + 1) % m]))
    })
}

/// Even-odd point in polygon test
pub fn contains_point(polygon: &[Point2<f64>], point: &Point2<f64>) -> bool {
    let n = polygon.len();
    let mut inside = false;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[(i + n - 1) % n]);
        if (a.y > point.y) != (b.y > point.y) {
            let x = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if point.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(min: f64, max: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(min, min),
            Point2::new(max, min),
            Point2::new(max, max),
            Point2::new(min, max),
        ]
    }

    #[test]
    fn test_named_planes() {
        let xz = Plane::named("XZ").unwrap();
        assert_eq!(xz.normal(), Vector3::new(0.0, -1.0, 0.0));
        let neg = Plane::named("-XY").unwrap();
        assert_eq!(neg.normal(), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(Plane::named("yz").unwrap().normal(), Vector3::x());
        assert!(Plane::named("AB").is_none());
    }

    #[test]
    fn test_offset_plane() {
        let plane = Plane::named("XY").unwrap().offset(5.0);
        assert_eq!(plane.to_world(&Point2::new(1.0, 2.0)), Point3::new(1.0, 2.0, 5.0));
    }

    #[test]
    fn test_clockwise_outer_is_normalised() {
        let mut outer = square(0.0, 2.0);
        outer.reverse();
        outer.push(outer[0]);
        let profile = Profile::new(&outer, &[]).unwrap();
        assert_eq!(profile.outer().len(), 4);
        assert_relative_eq!(profile.area(), 4.0);
    }

    #[test]
    fn test_degenerate_profiles() {
        let line = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert_eq!(Profile::new(&line, &[]), Err(GeometryError::TooFewPoints));

        let flat = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)];
        assert_eq!(Profile::new(&flat, &[]), Err(GeometryError::ZeroArea));

        let bowtie = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        assert_eq!(Profile::new(&bowtie, &[]), Err(GeometryError::SelfIntersecting));
    }

    #[test]
    fn test_holes() {
        let profile = Profile::new(&square(0.0, 4.0), &[square(1.0, 2.0)]).unwrap();
        assert_relative_eq!(profile.area(), 15.0);
        assert!(signed_area(&profile.holes()[0]) < 0.0);

        let outside = Profile::new(&square(0.0, 4.0), &[square(3.0, 5.0)]);
        assert_eq!(outside, Err(GeometryError::HoleOutside));
    }
}
