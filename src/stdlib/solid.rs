// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Solid construction, booleans, transforms and patterns

use super::{Args, Builtin};
use crate::ast::{Evaluator, GeometryRef, Sketch, Value};
use crate::errors::EvalError;
use crate::geometry::{
    self, perform_boolean_operation, Body, BooleanOp, GeometryError, GeometryKind, Mesh, Primitive,
    Profile, RevolveAxis,
};
use crate::scene::Construction;
use nalgebra::{Matrix4, Rotation3, Translation3, Vector3};

pub(super) fn call<'a>(
    ev: &mut Evaluator<'a>,
    builtin: Builtin,
    args: Args<'a>,
) -> Result<Value<'a>, EvalError> {
    match builtin {
        Builtin::Extrude => {
            args.expect(2)?;
            let distance = args.length(0)?;
            let sketch = args.sketch(1)?;
            let profile = closed_profile(&args, &sketch)?;
            let mesh = geometry::extrude(&profile, &sketch.plane, distance).map_err(|e| invalid(&args, e))?;
            ev.consume_sketch(sketch.id);
            let construction = Construction::Extrusion {
                sketch: sketch.id,
                distance,
            };
            Ok(solid(ev, construction, mesh, &args))
        }
        Builtin::Revolve => {
            args.expect(2)?;
            let options = args.object(0)?;
            let axis = match args.field(options, "axis")? {
                Value::String(name) => name.parse::<RevolveAxis>().map_err(|e| invalid(&args, e))?,
                other => return Err(args.semantic(format!("axis must be 'X' or 'Y', found a {}", other.type_name()))),
            };
            let angle = match options.get("angle") {
                Some(_) => args.field_angle(options, "angle")?,
                None => 360.0,
            };
            let sketch = args.sketch(1)?;
            let profile = closed_profile(&args, &sketch)?;
            let mesh = geometry::revolve(&profile, &sketch.plane, axis, angle, ev.segments())
                .map_err(|e| invalid(&args, e))?;
            ev.consume_sketch(sketch.id);
            let construction = Construction::Revolution {
                sketch: sketch.id,
                axis,
                angle,
            };
            Ok(solid(ev, construction, mesh, &args))
        }
        Builtin::Cube => {
            args.expect(1)?;
            let size = match args.get(0)? {
                Value::Array(_) => args.vec3(0)?,
                _ => {
                    let edge = args.length(0)?;
                    Vector3::new(edge, edge, edge)
                }
            };
            primitive(ev, Primitive::Cuboid { size }, &args)
        }
        Builtin::Cylinder => {
            args.expect(2)?;
            let primitive_shape = Primitive::Cylinder {
                radius: args.length(0)?,
                height: args.length(1)?,
                segments: ev.segments(),
            };
            primitive(ev, primitive_shape, &args)
        }
        Builtin::Sphere => {
            args.expect(1)?;
            let primitive_shape = Primitive::Sphere {
                radius: args.length(0)?,
                segments: ev.segments(),
            };
            primitive(ev, primitive_shape, &args)
        }
        Builtin::Union => boolean(ev, BooleanOp::Union, &args),
        Builtin::Subtract => boolean(ev, BooleanOp::Subtract, &args),
        Builtin::Intersect => boolean(ev, BooleanOp::Intersect, &args),
        Builtin::Translate => {
            args.expect(2)?;
            let offset = args.vec3(0)?;
            let matrix = Translation3::from(offset).to_homogeneous();
            transform(ev, matrix, &args)
        }
        Builtin::Rotate => {
            args.expect(2)?;
            let angles = match args.get(0)? {
                Value::Array(items) if items.len() == 3 => {
                    let mut degrees = [0.0; 3];
                    for (slot, item) in degrees.iter_mut().zip(items) {
                        *slot = super::args::to_angle(item, "rotate angle", args.range)?;
                    }
                    degrees
                }
                other => {
                    return Err(args.semantic(format!("expected [rx, ry, rz], found a {}", other.type_name())))
                }
            };
            let [rx, ry, rz] = angles.map(f64::to_radians);
            let matrix = Rotation3::from_euler_angles(rx, ry, rz).to_homogeneous();
            transform(ev, matrix, &args)
        }
        Builtin::Scale => {
            args.expect(2)?;
            let factors = match args.get(0)? {
                Value::Array(items) if items.len() == 3 => {
                    let mut factors = Vector3::zeros();
                    for (slot, item) in factors.iter_mut().zip(items) {
                        *slot = super::args::to_number(item, "scale factor", args.range)?.value;
                    }
                    factors
                }
                _ => {
                    let factor = args.scalar(0)?;
                    Vector3::new(factor, factor, factor)
                }
            };
            if factors.iter().any(|f| f.abs() < 1e-12 || !f.is_finite()) {
                return Err(invalid(&args, GeometryError::ZeroScale));
            }
            transform(ev, Matrix4::new_nonuniform_scaling(&factors), &args)
        }
        Builtin::PatternLinear => pattern_linear(ev, &args),
        other => Err(args.semantic(format!("'{}' is not a solid function", other.name()))),
    }
}

fn invalid(args: &Args<'_>, err: GeometryError) -> EvalError {
    args.geometry_error(err)
}

fn closed_profile(args: &Args<'_>, sketch: &Sketch) -> Result<Profile, EvalError> {
    if !sketch.closed {
        return Err(invalid(args, GeometryError::OpenProfile));
    }
    Profile::new(&sketch.path, &sketch.holes).map_err(|e| invalid(args, e))
}

fn solid<'a>(ev: &mut Evaluator<'a>, construction: Construction, mesh: Mesh, args: &Args<'a>) -> Value<'a> {
    Value::Geometry(ev.add_node(construction, Body::solid(mesh), args.range))
}

fn primitive<'a>(ev: &mut Evaluator<'a>, shape: Primitive, args: &Args<'a>) -> Result<Value<'a>, EvalError> {
    shape.validate().map_err(|e| invalid(args, e))?;
    let mesh = shape.to_mesh();
    Ok(solid(ev, Construction::Primitive { primitive: shape }, mesh, args))
}

/// Operands of a variadic boolean: the arguments, or one array of solids
fn solid_operands(args: &Args<'_>) -> Result<Vec<GeometryRef>, EvalError> {
    let values = match args.values() {
        [Value::Array(items)] => items.as_slice(),
        values => values,
    };
    let mut operands = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Geometry(g) if g.kind == GeometryKind::Solid => operands.push(*g),
            other => {
                return Err(args.semantic(format!("expected solids, found a {}", other.type_name())));
            }
        }
    }
    if operands.len() < 2 {
        return Err(args.semantic(format!("needs at least two solids, got {}", operands.len())));
    }
    Ok(operands)
}

fn boolean<'a>(ev: &mut Evaluator<'a>, op: BooleanOp, args: &Args<'a>) -> Result<Value<'a>, EvalError> {
    let operands = solid_operands(args)?;
    let mesh = {
        let scene = ev.scene();
        let meshes: Vec<&Mesh> = operands
            .iter()
            .filter_map(|g| scene.node(g.node))
            .map(|node| &node.body.mesh)
            .collect();
        perform_boolean_operation(&meshes, op).map_err(|e| invalid(args, e))?
    };
    let construction = Construction::Boolean {
        op,
        operands: operands.iter().map(|g| g.node).collect(),
    };
    Ok(solid(ev, construction, mesh, args))
}

fn operand_body(ev: &Evaluator<'_>, args: &Args<'_>, geometry: GeometryRef) -> Result<Body, EvalError> {
    ev.scene()
        .node(geometry.node)
        .map(|node| node.body.clone())
        .ok_or_else(|| args.semantic(format!("unknown geometry {}", geometry.node)))
}

fn transform<'a>(ev: &mut Evaluator<'a>, matrix: Matrix4<f64>, args: &Args<'a>) -> Result<Value<'a>, EvalError> {
    let geometry = args.geometry(1)?;
    let mut body = operand_body(ev, args, geometry)?;
    body.transform(&matrix);
    let construction = Construction::Transform {
        operand: geometry.node,
        matrix,
    };
    Ok(Value::Geometry(ev.add_node(construction, body, args.range)))
}

/// `count` copies of a solid, each `distance` further along `axis`, unioned
fn pattern_linear<'a>(ev: &mut Evaluator<'a>, args: &Args<'a>) -> Result<Value<'a>, EvalError> {
    args.expect(4)?;
    let axis = args
        .vec3(0)?
        .try_normalize(1e-12)
        .ok_or_else(|| args.geometry_error("pattern axis must be non-zero"))?;
    let count = args.scalar(1)?;
    if count.fract() != 0.0 || count < 1.0 {
        return Err(args.semantic(format!("count must be a positive integer, found {}", count)));
    }
    let count = count as u32;
    let distance = args.length(2)?;
    let geometry = args.geometry(3)?;
    if geometry.kind != GeometryKind::Solid {
        return Err(args.semantic(format!("expected a solid, found a {}", geometry.kind.name())));
    }

    let base = operand_body(ev, args, geometry)?.mesh;
    let step = axis * distance;
    let copies: Vec<Mesh> = (0..count)
        .map(|i| {
            let mut copy = base.clone();
            copy.transform(&Translation3::from(step * i as f64).to_homogeneous());
            copy
        })
        .collect();
    let refs: Vec<&Mesh> = copies.iter().collect();
    let mesh = perform_boolean_operation(&refs, BooleanOp::Union).map_err(|e| invalid(args, e))?;

    let construction = Construction::Pattern {
        operand: geometry.node,
        count,
        step,
    };
    Ok(solid(ev, construction, mesh, args))
}

#[cfg(test)]
mod tests {
    use crate::ast::{evaluate, EvalOptions, ExecutionOutcome};
    use crate::errors::EvalError;
    use crate::geometry::GeometryKind;
    use crate::io::parse;
    use crate::scene::Construction;
    use approx::assert_relative_eq;

    fn run(source: &str) -> Result<ExecutionOutcome, EvalError> {
        evaluate(&parse(source).unwrap(), &EvalOptions::default())
    }

    fn root_volume(outcome: &ExecutionOutcome) -> f64 {
        let roots: Vec<_> = outcome.scene.roots().collect();
        assert_eq!(roots.len(), 1, "expected a single root");
        roots[0].body.mesh.signed_volume()
    }

    #[test]
    fn test_primitives() {
        assert_relative_eq!(root_volume(&run("c = cube([1, 2, 3])").unwrap()), 6.0, epsilon = 1e-9);
        let cyl = root_volume(&run("c = cylinder(1, 2)").unwrap());
        assert_relative_eq!(cyl, 2.0 * std::f64::consts::PI, max_relative = 0.01);
        assert!(matches!(run("c = cube(0)"), Err(EvalError::InvalidGeometry { .. })));
        assert!(matches!(run("c = sphere(-1)"), Err(EvalError::InvalidGeometry { .. })));
        assert!(matches!(run("c = cube(5deg)"), Err(EvalError::UnitMismatch { .. })));
    }

    #[test]
    fn test_extrude_square() {
        let source = "\
part = startSketchOn('XY')
  |> startProfileAt([0, 0], %)
  |> line([4, 0], %)
  |> line([0, 4], %)
  |> line([-4, 0], %)
  |> close(%)
  |> extrude(5, %)";
        let outcome = run(source).unwrap();
        assert_relative_eq!(root_volume(&outcome), 80.0, epsilon = 1e-9);
        assert!(matches!(
            outcome.scene.nodes()[0].construction,
            Construction::Extrusion { distance, .. } if distance == 5.0
        ));
    }

    #[test]
    fn test_extrude_rejects_open_and_degenerate_profiles() {
        let open = "s = startSketchOn('XY') |> startProfileAt([0, 0], %) |> line([4, 0], %) |> line([0, 4], %) |> extrude(5, %)";
        assert!(matches!(run(open), Err(EvalError::InvalidGeometry { .. })));
        let flat = "s = startSketchOn('XY') |> startProfileAt([0, 0], %) |> line([4, 0], %) |> line([4, 0], %) |> close(%) |> extrude(5, %)";
        assert!(matches!(run(flat), Err(EvalError::InvalidGeometry { .. })));
        let zero = "s = startSketchOn('XY') |> startProfileAt([0, 0], %) |> line([4, 0], %) |> line([0, 4], %) |> close(%) |> extrude(0, %)";
        assert!(matches!(run(zero), Err(EvalError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_revolve_rectangle() {
        let source = "\
ring = startSketchOn('XY')
  |> startProfileAt([1, 0], %)
  |> line([1, 0], %)
  |> line([0, 1], %)
  |> line([-1, 0], %)
  |> close(%)
  |> revolve({ axis: 'Y' }, %)";
        let volume = root_volume(&run(source).unwrap());
        assert_relative_eq!(volume, 3.0 * std::f64::consts::PI, max_relative = 0.01);

        let crossing = source.replace("[1, 0], %)\n  |> line([1, 0]", "[-1, 0], %)\n  |> line([3, 0]");
        assert!(matches!(run(&crossing), Err(EvalError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_booleans() {
        let outcome = run("a = cube(2)\nb = translate([1, 0, 0], cube(2))\nc = subtract(a, b)").unwrap();
        assert_relative_eq!(root_volume(&outcome), 4.0, epsilon = 1e-6);

        let outcome = run("c = union([cube(2), translate([1, 0, 0], cube(2))])").unwrap();
        assert_relative_eq!(root_volume(&outcome), 12.0, epsilon = 1e-6);

        let err = run("c = intersect(cube(1), translate([5, 0, 0], cube(1)))").unwrap_err();
        assert!(matches!(err, EvalError::InvalidGeometry { .. }));
        assert!(matches!(run("c = union(cube(1))"), Err(EvalError::Semantic { .. })));
    }

    #[test]
    fn test_transforms_apply_to_any_geometry() {
        let outcome = run("c = cube(2) |> rotate([0, 0, 90], %) |> scale([1, 2, 1], %)").unwrap();
        let root = outcome.scene.roots().next().unwrap();
        let bbox = root.body.bounding_box();
        assert_relative_eq!(bbox.min.x, -2.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.max.y, 4.0, epsilon = 1e-9);
        assert_relative_eq!(root.body.mesh.signed_volume(), 16.0, epsilon = 1e-9);
        assert!(matches!(run("c = scale(0, cube(1))"), Err(EvalError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_pattern_linear() {
        let outcome = run("row = patternLinear([1, 0, 0], 3, 5, cube(1))").unwrap();
        let root = outcome.scene.roots().next().unwrap();
        assert_eq!(root.kind(), GeometryKind::Solid);
        assert_relative_eq!(root.body.mesh.signed_volume(), 3.0, epsilon = 1e-9);
        assert_relative_eq!(root.body.bounding_box().max.x, 11.0, epsilon = 1e-9);
    }
}
