// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Depth-buffered triangle and line rasterisation
//!
//! Triangles are filled in horizontal bands, one rayon task per band. Every
//! band walks the triangles in input order with a strict depth test, so the
//! image never depends on how bands are scheduled.

use nalgebra::{Point3, Vector2};
use rayon::prelude::*;

/// Rows per parallel band
const BAND_ROWS: usize = 16;

/// Lines may sit this far behind the surface and still show
const LINE_DEPTH_BIAS: f64 = 2e-3;

/// Triangle already projected to pixel space, with per-vertex depth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTriangle {
    pub points: [Point3<f64>; 3],
    pub color: [u8; 3],
}

pub struct Framebuffer {
    width: usize,
    height: usize,
    color: Vec<u8>,
    depth: Vec<f64>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32, background: [u8; 3]) -> Self {
        let (width, height) = (width as usize, height as usize);
        let color = background
            .iter()
            .copied()
            .cycle()
            .take(width * height * 3)
            .collect();
        Self {
            width,
            height,
            color,
            depth: vec![f64::INFINITY; width * height],
        }
    }

    pub fn fill_triangles(&mut self, triangles: &[ScreenTriangle]) {
        let width = self.width;
        let height = self.height;
        if width == 0 || height == 0 {
            return;
        }
        self.color
            .par_chunks_mut(BAND_ROWS * width * 3)
            .zip(self.depth.par_chunks_mut(BAND_ROWS * width))
            .enumerate()
            .for_each(|(band, (colors, depths))| {
                let first_row = band * BAND_ROWS;
                let last_row = (first_row + BAND_ROWS).min(height) - 1;
                for triangle in triangles {
                    fill_band(triangle, width, first_row, last_row, colors, depths);
                }
            });
    }

    /// Draw a segment between two projected points
    pub fn draw_line(&mut self, a: Point3<f64>, b: Point3<f64>, color: [u8; 3]) {
        let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = (a.x + (b.x - a.x) * t).floor();
            let y = (a.y + (b.y - a.y) * t).floor();
            if x < 0.0 || y < 0.0 || x >= self.width as f64 || y >= self.height as f64 {
                continue;
            }
            let depth = a.z + (b.z - a.z) * t;
            let idx = y as usize * self.width + x as usize;
            if depth <= self.depth[idx] + LINE_DEPTH_BIAS {
                self.depth[idx] = self.depth[idx].min(depth);
                self.color[idx * 3..idx * 3 + 3].copy_from_slice(&color);
            }
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width + x as usize) * 3;
        [self.color[idx], self.color[idx + 1], self.color[idx + 2]]
    }

    pub fn into_rgb(self) -> Vec<u8> {
        self.color
    }
}

fn fill_band(
    triangle: &ScreenTriangle,
    width: usize,
    first_row: usize,
    last_row: usize,
    colors: &mut [u8],
    depths: &mut [f64],
) {
    let [p0, p1, p2] = triangle.points;
    let points = [p0.xy().coords, p1.xy().coords, p2.xy().coords];

    let min_x = points.iter().fold(f64::INFINITY, |acc, p| acc.min(p.x)).floor().max(0.0);
    let max_x = points
        .iter()
        .fold(f64::NEG_INFINITY, |acc, p| acc.max(p.x))
        .ceil()
        .min((width - 1) as f64);
    let min_y = points
        .iter()
        .fold(f64::INFINITY, |acc, p| acc.min(p.y))
        .floor()
        .max(first_row as f64);
    let max_y = points
        .iter()
        .fold(f64::NEG_INFINITY, |acc, p| acc.max(p.y))
        .ceil()
        .min(last_row as f64);

    if min_x > max_x || min_y > max_y {
        return;
    }

    let area = edge(points[0], points[1], points[2]);
    if area.abs() < 1e-9 {
        return;
    }
    let inv_area = 1.0 / area;

    for y in min_y as usize..=max_y as usize {
        for x in min_x as usize..=max_x as usize {
            let p = Vector2::new(x as f64 + 0.5, y as f64 + 0.5);
            let w0 = edge(points[1], points[2], p);
            let w1 = edge(points[2], points[0], p);
            let w2 = edge(points[0], points[1], p);

            let same_sign =
                (w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0) || (w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0);
            if !same_sign {
                continue;
            }

            let depth = (w0 * p0.z + w1 * p1.z + w2 * p2.z) * inv_area;
            let idx = (y - first_row) * width + x;
            if depth < depths[idx] {
                depths[idx] = depth;
                colors[idx * 3..idx * 3 + 3].copy_from_slice(&triangle.color);
            }
        }
    }
}

fn edge(a: Vector2<f64>, b: Vector2<f64>, p: Vector2<f64>) -> f64 {
    (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
}
