// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics of evaluated programs

use anyhow::{Context, Result};
use approx::assert_relative_eq;
use kcl_engine::geometry::{analyze, GeometryKind, GeometryStats};
use kcl_engine::{Engine, UnitLength};

fn root_stats(source: &str) -> Result<GeometryStats> {
    let outcome = Engine::default().run(source)?;
    let root = outcome.scene.roots().last().context("no root geometry")?;
    Ok(analyze(&root.body.mesh))
}

#[test]
fn test_cube_volume_and_surface_area() -> Result<()> {
    let stats = root_stats("cube(10)")?;
    assert_relative_eq!(stats.volume, 1000.0, epsilon = 1e-9);
    assert_relative_eq!(stats.surface_area, 600.0, epsilon = 1e-9);
    assert_eq!(stats.vertex_count, 8);
    assert_eq!(stats.triangle_count, 12);
    assert!(stats.is_watertight);
    assert_eq!(stats.bbox, [0.0, 0.0, 0.0, 10.0, 10.0, 10.0]);
    Ok(())
}

#[test]
fn test_extruded_l_profile() -> Result<()> {
    let source = "\
part = startSketchOn('XY')
  |> startProfileAt([0, 0], %)
  |> xLine(30, %)
  |> yLine(4, %)
  |> xLine(-26, %)
  |> yLine(26, %)
  |> xLine(-4, %)
  |> close(%)
  |> extrude(20, %)
";
    let stats = root_stats(source)?;
    assert!(stats.is_watertight);
    assert_relative_eq!(stats.volume, (30.0 * 4.0 + 26.0 * 4.0) * 20.0, epsilon = 1e-6);
    assert_relative_eq!(stats.bbox[5] - stats.bbox[2], 20.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_revolved_ring_volume() -> Result<()> {
    let source = "\
ring = startSketchOn('XY')
  |> startProfileAt([1, 0], %)
  |> line([1, 0], %)
  |> line([0, 1], %)
  |> line([-1, 0], %)
  |> close(%)
  |> revolve({ axis: 'Y' }, %)
";
    let stats = root_stats(source)?;
    assert!(stats.is_watertight);
    assert_relative_eq!(stats.volume, 3.0 * std::f64::consts::PI, max_relative = 0.01);
    Ok(())
}

#[test]
fn test_sphere_and_cylinder_converge() -> Result<()> {
    let sphere = root_stats("sphere(5)")?;
    assert_relative_eq!(sphere.volume, 4.0 / 3.0 * std::f64::consts::PI * 125.0, max_relative = 0.02);
    for i in 0..3 {
        assert_relative_eq!(sphere.centroid[i], 0.0, epsilon = 1e-6);
    }

    let cylinder = root_stats("cylinder(2, 10)")?;
    assert_relative_eq!(cylinder.volume, std::f64::consts::PI * 40.0, max_relative = 0.01);
    Ok(())
}

#[test]
fn test_boolean_volumes() -> Result<()> {
    let difference = root_stats("a = cube(4)\nb = translate([2, 0, 0], cube(4))\nc = subtract(a, b)")?;
    assert_relative_eq!(difference.volume, 32.0, epsilon = 1e-6);

    let overlap = root_stats("c = intersect(cube(4), translate([2, 2, 0], cube(4)))")?;
    assert_relative_eq!(overlap.volume, 16.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_profiles_are_surfaces_or_curves() -> Result<()> {
    let source = "\
square = startSketchOn('XY')
  |> startProfileAt([0, 0], %)
  |> line([2, 0], %)
  |> line([0, 2], %)
  |> line([-2, 0], %)
  |> close(%)
open = startSketchOn('XZ')
  |> startProfileAt([0, 0], %)
  |> line([2, 0], %)
";
    let outcome = Engine::with_units(UnitLength::Cm).run(source)?;
    let kinds: Vec<GeometryKind> = outcome.scene.roots().map(|node| node.kind()).collect();
    assert_eq!(kinds, vec![GeometryKind::Surface, GeometryKind::Curve]);

    let square = outcome.scene.roots().next().context("square")?;
    let stats = analyze(&square.body.mesh);
    assert!(!stats.is_watertight);
    assert_relative_eq!(stats.surface_area, 4.0, epsilon = 1e-9);
    Ok(())
}
