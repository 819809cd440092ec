// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Ear-clipping triangulation of planar polygons with holes

use super::GeometryError;
use nalgebra::Point2;

/// Twice the signed area of triangle `a b c`; positive when counter-clockwise
pub fn orient(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Signed area of a closed loop; positive when counter-clockwise
pub fn signed_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        * 0.5
}

/// Triangulate a counter-clockwise `outer` loop with clockwise `holes`.
/// Indices address the concatenation of `outer` and every hole in order.
pub fn triangulate(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<[usize; 3]>, GeometryError> {
    let mut points: Vec<Point2<f64>> = outer.to_vec();
    let mut ranges = Vec::with_capacity(holes.len());
    for hole in holes {
        ranges.push(points.len()..points.len() + hole.len());
        points.extend_from_slice(hole);
    }

    let scale = points
        .iter()
        .map(|p| p.x.abs().max(p.y.abs()))
        .fold(1.0_f64, f64::max);
    let epsilon = 1e-12 * scale * scale;

    let mut ring: Vec<usize> = (0..outer.len()).collect();

    // Bridge holes in from the rightmost one so earlier bridges stay visible
    let mut order: Vec<usize> = (0..ranges.len()).collect();
    order.sort_by(|&a, &b| {
        let max_x = |r: &std::ops::Range<usize>| {
            points[r.clone()].iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max)
        };
        max_x(&ranges[b]).total_cmp(&max_x(&ranges[a]))
    });
    for hole in order {
        ring = bridge_hole(&points, ring, ranges[hole].clone())?;
    }

    clip_ears(&points, ring, epsilon)
}

fn bridge_hole(
    points: &[Point2<f64>],
    ring: Vec<usize>,
    hole: std::ops::Range<usize>,
) -> Result<Vec<usize>, GeometryError> {
    let rightmost = hole
        .clone()
        .max_by(|&a, &b| points[a].x.total_cmp(&points[b].x))
        .ok_or(GeometryError::Triangulation)?;
    let m = points[rightmost];

    // Closest edge hit by a ray from the hole towards +x
    let mut best: Option<(f64, usize)> = None;
    for position in 0..ring.len() {
        let a = points[ring[position]];
        let b = points[ring[(position + 1) % ring.len()]];
        if (a.y - m.y) * (b.y - m.y) > 0.0 || a.y == b.y {
            continue;
        }
        let x = a.x + (m.y - a.y) * (b.x - a.x) / (b.y - a.y);
        if x < m.x || best.is_some_and(|(bx, _)| x >= bx) {
            continue;
        }
        let candidate = if a.x > b.x {
            position
        } else {
            (position + 1) % ring.len()
        };
        best = Some((x, candidate));
    }
    let (hit_x, mut bridge) = best.ok_or(GeometryError::HoleOutside)?;

    // A vertex inside the triangle (m, hit, candidate) would block the
    // bridge; the one closest in angle to the ray is always visible
    let hit = Point2::new(hit_x, m.y);
    let candidate = points[ring[bridge]];
    let mut best_tan = f64::INFINITY;
    for (position, &index) in ring.iter().enumerate() {
        let p = points[index];
        if position == bridge || p.x < m.x || p == candidate {
            continue;
        }
        if point_in_triangle(&p, &m, &hit, &candidate, 0.0) {
            let tan = (p.y - m.y).abs() / (p.x - m.x).max(f64::MIN_POSITIVE);
            if tan < best_tan {
                best_tan = tan;
                bridge = position;
            }
        }
    }

    let hole_len = hole.len();
    let start = rightmost - hole.start;
    let mut merged = Vec::with_capacity(ring.len() + hole_len + 2);
    merged.extend_from_slice(&ring[..=bridge]);
    for offset in 0..=hole_len {
        merged.push(hole.start + (start + offset) % hole_len);
    }
    merged.push(ring[bridge]);
    merged.extend_from_slice(&ring[bridge + 1..]);
    Ok(merged)
}

fn point_in_triangle(
    p: &Point2<f64>,
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
    epsilon: f64,
) -> bool {
    let (d1, d2, d3) = (orient(a, b, p), orient(b, c, p), orient(c, a, p));
    let has_neg = d1 < -epsilon || d2 < -epsilon || d3 < -epsilon;
    let has_pos = d1 > epsilon || d2 > epsilon || d3 > epsilon;
    !(has_neg && has_pos)
}

fn clip_ears(
    points: &[Point2<f64>],
    mut ring: Vec<usize>,
    epsilon: f64,
) -> Result<Vec<[usize; 3]>, GeometryError> {
    let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2));

    while ring.len() > 3 {
        let n = ring.len();
        let mut clipped = None;

        for i in 0..n {
            let (ia, ib, ic) = (ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n]);
            let (a, b, c) = (points[ia], points[ib], points[ic]);
            let turn = orient(&a, &b, &c);

            if turn.abs() <= epsilon {
                // Collinear or spike vertex, contributes no area
                clipped = Some((i, None));
                break;
            }
            if turn < 0.0 {
                continue;
            }
            let blocked = ring.iter().any(|&j| {
                let p = points[j];
                p != a && p != b && p != c && point_in_triangle(&p, &a, &b, &c, epsilon)
            });
            if !blocked {
                clipped = Some((i, Some([ia, ib, ic])));
                break;
            }
        }

        let (i, triangle) = clipped.ok_or(GeometryError::Triangulation)?;
        triangles.extend(triangle);
        ring.remove(i);
    }

    if let [ia, ib, ic] = ring[..] {
        if orient(&points[ia], &points[ib], &points[ic]) > epsilon {
            triangles.push([ia, ib, ic]);
        }
    }
    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn area_of(points: &[Point2<f64>], triangles: &[[usize; 3]]) -> f64 {
        triangles
            .iter()
            .map(|[a, b, c]| orient(&points[*a], &points[*b], &points[*c]) * 0.5)
            .sum()
    }

    fn square(min: f64, max: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(min, min),
            Point2::new(max, min),
            Point2::new(max, max),
            Point2::new(min, max),
        ]
    }

    #[test]
    fn test_square() {
        let outer = square(0.0, 1.0);
        let triangles = triangulate(&outer, &[]).unwrap();
        assert_eq!(triangles.len(), 2);
        assert_relative_eq!(area_of(&outer, &triangles), 1.0);
    }

    #[test]
    fn test_concave_l_shape() {
        let outer = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        let triangles = triangulate(&outer, &[]).unwrap();
        assert_eq!(triangles.len(), 4);
        assert_relative_eq!(area_of(&outer, &triangles), 3.0);
        assert!(triangles
            .iter()
            .all(|[a, b, c]| orient(&outer[*a], &outer[*b], &outer[*c]) > 0.0));
    }

    #[test]
    fn test_square_with_hole() {
        let outer = square(0.0, 4.0);
        let mut hole = square(1.0, 3.0);
        hole.reverse();
        let triangles = triangulate(&outer, &[hole.clone()]).unwrap();
        let mut all = outer.clone();
        all.extend(hole);
        assert_relative_eq!(area_of(&all, &triangles), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_points_are_skipped() {
        let outer = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        let triangles = triangulate(&outer, &[]).unwrap();
        assert_relative_eq!(area_of(&outer, &triangles), 4.0);
    }
}
