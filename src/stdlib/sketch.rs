// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Sketch planes and 2D path drawing

use super::{Args, Builtin};
use crate::ast::{Evaluator, Sketch, Value};
use crate::errors::EvalError;
use crate::utils::math::{approx_eq, arc_steps};
use nalgebra::{Point2, Vector2};
use std::rc::Rc;

pub(super) fn call<'a>(
    ev: &mut Evaluator<'a>,
    builtin: Builtin,
    args: Args<'a>,
) -> Result<Value<'a>, EvalError> {
    match builtin {
        Builtin::StartSketchOn => {
            args.expect(1)?;
            Ok(Value::Plane(args.plane(0)?))
        }
        Builtin::OffsetPlane => {
            args.expect(2)?;
            let plane = args.plane(0)?;
            Ok(Value::Plane(plane.offset(args.length(1)?)))
        }
        Builtin::StartProfileAt => {
            args.expect(2)?;
            let start = args.point2(0)?;
            let plane = args.plane(1)?;
            Ok(Value::Sketch(Rc::new(Sketch {
                id: ev.new_sketch_id(),
                plane,
                path: vec![start],
                closed: false,
                holes: Vec::new(),
            })))
        }
        Builtin::Line => {
            args.expect(2)?;
            let delta = args.point2(0)?.coords;
            extend(&args, 1, |current| vec![current + delta])
        }
        Builtin::LineTo => {
            args.expect(2)?;
            let target = args.point2(0)?;
            extend(&args, 1, |_| vec![target])
        }
        Builtin::XLine => {
            args.expect(2)?;
            let dx = args.length(0)?;
            extend(&args, 1, |current| vec![current + Vector2::new(dx, 0.0)])
        }
        Builtin::YLine => {
            args.expect(2)?;
            let dy = args.length(0)?;
            extend(&args, 1, |current| vec![current + Vector2::new(0.0, dy)])
        }
        Builtin::AngledLine => {
            args.expect(2)?;
            let spec = args.array(0)?;
            if spec.len() != 2 {
                return Err(args.semantic("expected [angle, length]"));
            }
            let angle = super::args::to_angle(&spec[0], "angledLine angle", args.range)?.to_radians();
            let length = super::args::to_length(&spec[1], "angledLine length", args.range)?;
            let step = Vector2::new(angle.cos(), angle.sin()) * length;
            extend(&args, 1, |current| vec![current + step])
        }
        Builtin::Arc => {
            args.expect(2)?;
            let spec = args.object(0)?;
            let start = args.field_angle(spec, "angleStart")?;
            let end = args.field_angle(spec, "angleEnd")?;
            let radius = args.field_length(spec, "radius")?;
            if !(radius > 0.0) {
                return Err(args.geometry_error("arc radius must be positive"));
            }
            if approx_eq(start, end, 1e-9) {
                return Err(args.geometry_error("arc sweeps no angle"));
            }
            let steps = arc_steps(ev.segments(), end - start);
            extend(&args, 1, |current| {
                let (s, e) = (start.to_radians(), end.to_radians());
                let center = current - Vector2::new(s.cos(), s.sin()) * radius;
                (1..=steps)
                    .map(|i| {
                        let t = s + (e - s) * i as f64 / steps as f64;
                        center + Vector2::new(t.cos(), t.sin()) * radius
                    })
                    .collect()
            })
        }
        Builtin::Close => {
            args.expect(1)?;
            let sketch = open_sketch(&args, 0)?;
            if sketch.path.len() < 3 {
                return Err(args.geometry_error("a profile needs at least three points to close"));
            }
            let mut closed = (*sketch).clone();
            let repeated = match (closed.path.first(), closed.path.last()) {
                (Some(first), Some(last)) => (first - last).norm() < 1e-9,
                _ => false,
            };
            if repeated {
                closed.path.pop();
            }
            closed.closed = true;
            Ok(Value::Sketch(Rc::new(closed)))
        }
        Builtin::Circle => {
            args.expect(3)?;
            let center = args.point2(0)?;
            let radius = args.length(1)?;
            if !(radius > 0.0) {
                return Err(args.geometry_error("circle radius must be positive"));
            }
            let plane = args.plane(2)?;
            let segments = ev.segments().max(3);
            let path = (0..segments)
                .map(|i| {
                    let t = std::f64::consts::TAU * i as f64 / segments as f64;
                    center + Vector2::new(t.cos(), t.sin()) * radius
                })
                .collect();
            Ok(Value::Sketch(Rc::new(Sketch {
                id: ev.new_sketch_id(),
                plane,
                path,
                closed: true,
                holes: Vec::new(),
            })))
        }
        Builtin::Hole => {
            args.expect(2)?;
            let hole = args.sketch(0)?;
            let target = args.sketch(1)?;
            if !hole.closed {
                return Err(args.geometry_error("a hole must be a closed profile"));
            }
            if hole.plane != target.plane {
                return Err(args.geometry_error("a hole must lie on the same plane as its profile"));
            }
            ev.consume_sketch(hole.id);
            let mut sketch = (*target).clone();
            sketch.holes.push(hole.path.clone());
            Ok(Value::Sketch(Rc::new(sketch)))
        }
        other => Err(args.semantic(format!("'{}' is not a sketch function", other.name()))),
    }
}

fn open_sketch(args: &Args<'_>, index: usize) -> Result<Rc<Sketch>, EvalError> {
    let sketch = args.sketch(index)?;
    if sketch.closed {
        return Err(args.semantic("the sketch is already closed"));
    }
    Ok(sketch)
}

/// Append the points produced from the current pen position
fn extend<'a>(
    args: &Args<'a>,
    index: usize,
    next: impl FnOnce(Point2<f64>) -> Vec<Point2<f64>>,
) -> Result<Value<'a>, EvalError> {
    let sketch = open_sketch(args, index)?;
    let current = sketch
        .current()
        .ok_or_else(|| args.semantic("the sketch has no starting point"))?;
    let points = next(current);
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(args.geometry_error("segment end is not a finite point"));
    }
    let mut extended = (*sketch).clone();
    extended.path.extend(points);
    Ok(Value::Sketch(Rc::new(extended)))
}
