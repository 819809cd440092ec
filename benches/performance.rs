// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kcl_engine::geometry::{perform_boolean_operation, BooleanOp, Primitive};
use kcl_engine::{Engine, FileExportFormat, ImageFormat, ProgramCache, UnitLength};
use nalgebra::{Matrix4, Vector3};
use std::sync::Arc;

const BRACKET: &str = "\
thickness = 4
width = 30

fn lProfile(w, t) {
  return startSketchOn('XZ')
    |> startProfileAt([0, 0], %)
    |> xLine(w, %)
    |> yLine(t, %)
    |> xLine(t - w, %)
    |> yLine(w - t, %)
    |> xLine(-t, %)
    |> close(%)
}

bracket = lProfile(width, thickness)
  |> extrude(20, %)
holes = patternLinear([1, 0, 0], 3, 8, cylinder(1.5, 10))
  |> translate([7, -10, -2], %)
part = subtract(bracket, holes)
";

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    let simple = "cube(10)";
    group.bench_with_input(BenchmarkId::new("simple_cube", ""), &simple, |b, source| {
        b.iter(|| kcl_engine::parse(black_box(source)).unwrap());
    });

    group.bench_with_input(BenchmarkId::new("bracket", ""), &BRACKET, |b, source| {
        b.iter(|| kcl_engine::parse(black_box(source)).unwrap());
    });

    group.bench_function("format", |b| {
        b.iter(|| kcl_engine::format(black_box(BRACKET)).unwrap());
    });

    group.bench_function("lint", |b| {
        b.iter(|| kcl_engine::lint(black_box(BRACKET)));
    });

    group.finish();
}

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");

    group.bench_function("cube", |b| {
        b.iter(|| {
            Primitive::Cuboid {
                size: black_box(Vector3::new(10.0, 10.0, 10.0)),
            }
            .to_mesh()
        });
    });

    for segments in [32, 64] {
        group.bench_with_input(BenchmarkId::new("sphere", segments), &segments, |b, &segments| {
            b.iter(|| {
                Primitive::Sphere {
                    radius: black_box(10.0),
                    segments,
                }
                .to_mesh()
            });
        });
    }

    group.bench_function("cylinder", |b| {
        b.iter(|| {
            Primitive::Cylinder {
                radius: black_box(5.0),
                height: black_box(20.0),
                segments: 32,
            }
            .to_mesh()
        });
    });

    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");
    let engine = Engine::with_units(UnitLength::Mm);

    group.bench_function("cube", |b| {
        b.iter(|| engine.run(black_box("cube(10)")).unwrap());
    });

    group.bench_function("bracket", |b| {
        b.iter(|| engine.run(black_box(BRACKET)).unwrap());
    });

    let cached = Engine::default().with_cache(Arc::new(ProgramCache::new()));
    group.bench_function("bracket_cached", |b| {
        b.iter(|| cached.run(black_box(BRACKET)).unwrap());
    });

    group.finish();
}

fn bench_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("output");
    group.sample_size(20);
    let engine = Engine::default().with_cache(Arc::new(ProgramCache::new()));

    group.bench_function("snapshot_png", |b| {
        b.iter(|| engine.execute_and_snapshot(black_box(BRACKET), ImageFormat::Png).unwrap());
    });

    for format in [FileExportFormat::Step, FileExportFormat::Stl, FileExportFormat::Glb] {
        group.bench_with_input(BenchmarkId::new("export", format), &format, |b, &format| {
            b.iter(|| engine.execute_and_export(black_box(BRACKET), format).unwrap());
        });
    }

    group.finish();
}

fn bench_boolean_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("boolean_ops");

    let cube1 = Primitive::Cuboid {
        size: Vector3::new(10.0, 10.0, 10.0),
    }
    .to_mesh();
    let mut cube2 = Primitive::Cuboid {
        size: Vector3::new(8.0, 8.0, 8.0),
    }
    .to_mesh();
    cube2.transform(&Matrix4::new_translation(&Vector3::new(5.0, 5.0, 5.0)));

    for op in [BooleanOp::Union, BooleanOp::Subtract, BooleanOp::Intersect] {
        group.bench_with_input(BenchmarkId::new("cubes", op.name()), &op, |b, &op| {
            b.iter(|| perform_boolean_operation(black_box(&[&cube1, &cube2]), op).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_primitives,
    bench_execute,
    bench_output,
    bench_boolean_ops
);
criterion_main!(benches);
