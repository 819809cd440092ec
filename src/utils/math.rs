// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Math utilities

/// Check if two floats are approximately equal
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Number of straight segments approximating an arc of `sweep_degrees`
/// when a full turn uses `segments`
pub fn arc_steps(segments: u32, sweep_degrees: f64) -> usize {
    let fraction = (sweep_degrees.abs() / 360.0).min(1.0);
    ((segments.max(3) as f64 * fraction).ceil() as usize).max(1)
}
