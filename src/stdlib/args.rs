// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Argument checking shared by all builtins

use crate::ast::{GeometryRef, Number, SourceRange, Sketch, Value};
use crate::errors::EvalError;
use crate::geometry::Plane;
use crate::units::NumericType;
use nalgebra::{Point2, Point3, Vector3};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Evaluated arguments of one builtin call
pub(crate) struct Args<'a> {
    name: &'static str,
    values: Vec<Value<'a>>,
    pub range: SourceRange,
}

impl<'a> Args<'a> {
    pub fn new(name: &'static str, values: Vec<Value<'a>>, range: SourceRange) -> Self {
        Self { name, values, range }
    }

    pub fn values(&self) -> &[Value<'a>] {
        &self.values
    }

    pub fn semantic(&self, message: impl std::fmt::Display) -> EvalError {
        EvalError::semantic(format!("{}: {}", self.name, message), self.range)
    }

    pub fn geometry_error(&self, message: impl std::fmt::Display) -> EvalError {
        EvalError::geometry(format!("{}: {}", self.name, message), self.range)
    }

    /// Fail unless between `min` and `max` arguments were passed
    pub fn expect_between(&self, min: usize, max: usize) -> Result<(), EvalError> {
        let n = self.values.len();
        if n >= min && n <= max {
            return Ok(());
        }
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        Err(EvalError::semantic(
            format!(
                "'{}' expects {} argument{} but got {}",
                self.name,
                expected,
                if max == 1 { "" } else { "s" },
                n
            ),
            self.range,
        ))
    }

    pub fn expect(&self, count: usize) -> Result<(), EvalError> {
        self.expect_between(count, count)
    }

    pub fn get(&self, index: usize) -> Result<&Value<'a>, EvalError> {
        self.values
            .get(index)
            .ok_or_else(|| self.semantic(format!("missing argument {}", index + 1)))
    }

    fn what(&self, index: usize) -> String {
        format!("{} argument {}", self.name, index + 1)
    }

    pub fn number(&self, index: usize) -> Result<Number, EvalError> {
        to_number(self.get(index)?, &self.what(index), self.range)
    }

    pub fn length(&self, index: usize) -> Result<f64, EvalError> {
        to_length(self.get(index)?, &self.what(index), self.range)
    }

    pub fn angle(&self, index: usize) -> Result<f64, EvalError> {
        to_angle(self.get(index)?, &self.what(index), self.range)
    }

    /// Unitless number, also accepting typed numbers where only the magnitude matters
    pub fn scalar(&self, index: usize) -> Result<f64, EvalError> {
        Ok(self.number(index)?.value)
    }

    pub fn point2(&self, index: usize) -> Result<Point2<f64>, EvalError> {
        to_point2(self.get(index)?, &self.what(index), self.range)
    }

    pub fn vec3(&self, index: usize) -> Result<Vector3<f64>, EvalError> {
        to_vec3(self.get(index)?, &self.what(index), self.range)
    }

    pub fn string(&self, index: usize) -> Result<&str, EvalError> {
        match self.get(index)? {
            Value::String(s) => Ok(s),
            other => Err(type_error(&self.what(index), "a string", other, self.range)),
        }
    }

    pub fn bool(&self, index: usize) -> Result<bool, EvalError> {
        match self.get(index)? {
            Value::Bool(b) => Ok(*b),
            other => Err(type_error(&self.what(index), "a boolean", other, self.range)),
        }
    }

    pub fn array(&self, index: usize) -> Result<&[Value<'a>], EvalError> {
        match self.get(index)? {
            Value::Array(items) => Ok(items),
            other => Err(type_error(&self.what(index), "an array", other, self.range)),
        }
    }

    pub fn object(&self, index: usize) -> Result<&BTreeMap<String, Value<'a>>, EvalError> {
        match self.get(index)? {
            Value::Object(map) => Ok(map),
            other => Err(type_error(&self.what(index), "an object", other, self.range)),
        }
    }

    pub fn sketch(&self, index: usize) -> Result<Rc<Sketch>, EvalError> {
        match self.get(index)? {
            Value::Sketch(sketch) => Ok(sketch.clone()),
            other => Err(type_error(&self.what(index), "a sketch", other, self.range)),
        }
    }

    pub fn geometry(&self, index: usize) -> Result<GeometryRef, EvalError> {
        match self.get(index)? {
            Value::Geometry(geometry) => Ok(*geometry),
            other => Err(type_error(&self.what(index), "a solid, surface or curve", other, self.range)),
        }
    }

    /// A plane value, a standard plane name or `{origin, xAxis, yAxis}`
    pub fn plane(&self, index: usize) -> Result<Plane, EvalError> {
        to_plane(self.get(index)?, &self.what(index), self.range)
    }

    pub fn function(&self, index: usize) -> Result<Value<'a>, EvalError> {
        match self.get(index)? {
            value @ (Value::Function(_) | Value::Builtin(_)) => Ok(value.clone()),
            other => Err(type_error(&self.what(index), "a function", other, self.range)),
        }
    }

    /// Required object field
    pub fn field<'v>(
        &self,
        map: &'v BTreeMap<String, Value<'a>>,
        key: &str,
    ) -> Result<&'v Value<'a>, EvalError> {
        map.get(key)
            .ok_or_else(|| self.semantic(format!("missing property '{}'", key)))
    }

    pub fn field_length(&self, map: &BTreeMap<String, Value<'a>>, key: &str) -> Result<f64, EvalError> {
        to_length(self.field(map, key)?, &format!("{} '{}'", self.name, key), self.range)
    }

    pub fn field_angle(&self, map: &BTreeMap<String, Value<'a>>, key: &str) -> Result<f64, EvalError> {
        to_angle(self.field(map, key)?, &format!("{} '{}'", self.name, key), self.range)
    }
}

fn type_error(what: &str, expected: &str, found: &Value<'_>, range: SourceRange) -> EvalError {
    EvalError::semantic(
        format!("{} must be {}, found a {}", what, expected, found.type_name()),
        range,
    )
}

pub(crate) fn to_number(value: &Value<'_>, what: &str, range: SourceRange) -> Result<Number, EvalError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(type_error(what, "a number", other, range)),
    }
}

/// A length in the program unit. Unitless numbers are read as lengths.
pub(crate) fn to_length(value: &Value<'_>, what: &str, range: SourceRange) -> Result<f64, EvalError> {
    let n = to_number(value, what, range)?;
    match n.ty {
        NumericType::Length | NumericType::Unitless => Ok(n.value),
        NumericType::Angle => Err(EvalError::unit_mismatch(
            format!("{} must be a length, found an angle", what),
            range,
        )),
    }
}

/// An angle in degrees. Unitless numbers are read as degrees.
pub(crate) fn to_angle(value: &Value<'_>, what: &str, range: SourceRange) -> Result<f64, EvalError> {
    let n = to_number(value, what, range)?;
    match n.ty {
        NumericType::Angle | NumericType::Unitless => Ok(n.value),
        NumericType::Length => Err(EvalError::unit_mismatch(
            format!("{} must be an angle, found a length", what),
            range,
        )),
    }
}

fn components(value: &Value<'_>, count: usize, what: &str, range: SourceRange) -> Result<Vec<f64>, EvalError> {
    match value {
        Value::Array(items) if items.len() == count => items
            .iter()
            .map(|item| to_length(item, what, range))
            .collect(),
        other => Err(type_error(what, &format!("an array of {} numbers", count), other, range)),
    }
}

pub(crate) fn to_point2(value: &Value<'_>, what: &str, range: SourceRange) -> Result<Point2<f64>, EvalError> {
    let c = components(value, 2, what, range)?;
    Ok(Point2::new(c[0], c[1]))
}

pub(crate) fn to_vec3(value: &Value<'_>, what: &str, range: SourceRange) -> Result<Vector3<f64>, EvalError> {
    let c = components(value, 3, what, range)?;
    Ok(Vector3::new(c[0], c[1], c[2]))
}

pub(crate) fn to_plane(value: &Value<'_>, what: &str, range: SourceRange) -> Result<Plane, EvalError> {
    match value {
        Value::Plane(plane) => Ok(*plane),
        Value::Sketch(sketch) => Ok(sketch.plane),
        Value::String(name) => Plane::named(name).ok_or_else(|| {
            EvalError::semantic(
                format!("{}: unknown plane '{}', expected XY, XZ or YZ", what, name),
                range,
            )
        }),
        Value::Object(map) => {
            let field = |key: &str| {
                map.get(key).ok_or_else(|| {
                    EvalError::semantic(format!("{}: missing property '{}'", what, key), range)
                })
            };
            let origin = to_vec3(field("origin")?, what, range)?;
            let x_axis = to_vec3(field("xAxis")?, what, range)?;
            let y_axis = to_vec3(field("yAxis")?, what, range)?;
            custom_plane(Point3::from(origin), x_axis, y_axis)
                .ok_or_else(|| EvalError::geometry(format!("{}: plane axes must be non-zero and not parallel", what), range))
        }
        other => Err(type_error(what, "a plane", other, range)),
    }
}

/// Orthonormalise user supplied axes, keeping the x axis direction
fn custom_plane(origin: Point3<f64>, x_axis: Vector3<f64>, y_axis: Vector3<f64>) -> Option<Plane> {
    let x = x_axis.try_normalize(1e-12)?;
    let y = (y_axis - x * x.dot(&y_axis)).try_normalize(1e-9)?;
    Some(Plane::new(origin, x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: Vec<Value<'static>>) -> Args<'static> {
        Args::new("test", values, SourceRange::new(0, 4))
    }

    #[test]
    fn test_arity_message() {
        let a = args(vec![Value::None]);
        let err = a.expect(2).unwrap_err();
        assert_eq!(err.to_string(), "'test' expects 2 arguments but got 1 at 0..4");
        assert!(a.expect_between(1, 2).is_ok());
    }

    #[test]
    fn test_lengths_reject_angles() {
        let a = args(vec![
            Value::Number(Number::angle(30.0)),
            Value::Number(Number::unitless(3.0)),
        ]);
        assert!(matches!(a.length(0), Err(EvalError::UnitMismatch { .. })));
        assert_eq!(a.length(1).unwrap(), 3.0);
        assert_eq!(a.angle(0).unwrap(), 30.0);
    }

    #[test]
    fn test_points_and_planes() {
        let a = args(vec![
            Value::Array(vec![
                Value::Number(Number::length(1.0)),
                Value::Number(Number::unitless(2.0)),
            ]),
            Value::String("-XZ".into()),
            Value::String("UV".into()),
        ]);
        assert_eq!(a.point2(0).unwrap(), Point2::new(1.0, 2.0));
        assert!(a.vec3(0).is_err());
        assert_eq!(a.plane(1).unwrap().normal(), Vector3::new(0.0, 1.0, 0.0));
        assert!(a.plane(2).is_err());
    }

    #[test]
    fn test_custom_plane_is_orthonormal() {
        let plane = custom_plane(Point3::origin(), Vector3::new(2.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 0.0)).unwrap();
        assert_eq!(plane.y_axis, Vector3::y());
        assert!(custom_plane(Point3::origin(), Vector3::x(), Vector3::x() * 3.0).is_none());
    }
}
