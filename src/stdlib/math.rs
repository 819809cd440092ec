// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Numeric builtins

use super::{Args, Builtin};
use crate::ast::{Number, Value};
use crate::errors::EvalError;
use crate::units::NumericType;

pub(super) fn call<'a>(builtin: Builtin, args: Args<'a>) -> Result<Value<'a>, EvalError> {
    let number = match builtin {
        Builtin::Pi => {
            args.expect(0)?;
            Number::unitless(std::f64::consts::PI)
        }
        Builtin::Sqrt => {
            args.expect(1)?;
            let n = args.number(0)?;
            if n.value < 0.0 {
                return Err(args.semantic(format!("cannot take the square root of {}", n.value)));
            }
            Number::unitless(n.value.sqrt())
        }
        Builtin::Abs | Builtin::Floor | Builtin::Ceil | Builtin::Round => {
            args.expect(1)?;
            let n = args.number(0)?;
            let value = match builtin {
                Builtin::Abs => n.value.abs(),
                Builtin::Floor => n.value.floor(),
                Builtin::Ceil => n.value.ceil(),
                _ => n.value.round(),
            };
            Number::new(value, n.ty)
        }
        Builtin::Min | Builtin::Max => extremum(builtin, &args)?,
        Builtin::Pow => {
            args.expect(2)?;
            let base = args.number(0)?;
            let exponent = args.number(1)?;
            if exponent.ty != NumericType::Unitless {
                return Err(EvalError::unit_mismatch(
                    format!("pow: exponent must be unitless, found a {}", exponent.ty.name()),
                    args.range,
                ));
            }
            let ty = if exponent.value == 1.0 {
                base.ty
            } else {
                NumericType::Unitless
            };
            Number::new(base.value.powf(exponent.value), ty)
        }
        Builtin::Sin | Builtin::Cos | Builtin::Tan => {
            args.expect(1)?;
            let radians = radians(&args)?;
            let value = match builtin {
                Builtin::Sin => radians.sin(),
                Builtin::Cos => radians.cos(),
                _ => radians.tan(),
            };
            Number::unitless(value)
        }
        Builtin::Asin | Builtin::Acos | Builtin::Atan => {
            args.expect(1)?;
            let n = args.number(0)?;
            if n.ty != NumericType::Unitless {
                return Err(EvalError::unit_mismatch(
                    format!("{}: expected a unitless ratio, found a {}", builtin.name(), n.ty.name()),
                    args.range,
                ));
            }
            if builtin != Builtin::Atan && !(-1.0..=1.0).contains(&n.value) {
                return Err(args.semantic(format!("{} is outside [-1, 1]", n.value)));
            }
            let radians = match builtin {
                Builtin::Asin => n.value.asin(),
                Builtin::Acos => n.value.acos(),
                _ => n.value.atan(),
            };
            Number::angle(radians.to_degrees())
        }
        Builtin::ToRadians => {
            args.expect(1)?;
            Number::unitless(args.angle(0)?.to_radians())
        }
        Builtin::ToDegrees => {
            args.expect(1)?;
            let n = args.number(0)?;
            if n.ty != NumericType::Unitless {
                return Err(EvalError::unit_mismatch(
                    format!("toDegrees: expected radians as a unitless number, found a {}", n.ty.name()),
                    args.range,
                ));
            }
            Number::angle(n.value.to_degrees())
        }
        other => return Err(args.semantic(format!("'{}' is not a math function", other.name()))),
    };

    if !number.value.is_finite() {
        return Err(args.semantic("result is not a finite number"));
    }
    Ok(Value::Number(number))
}

/// Trig input: angles are degrees, unitless numbers are radians
fn radians(args: &Args<'_>) -> Result<f64, EvalError> {
    let n = args.number(0)?;
    match n.ty {
        NumericType::Angle => Ok(n.value.to_radians()),
        NumericType::Unitless => Ok(n.value),
        NumericType::Length => Err(EvalError::unit_mismatch(
            "trigonometric functions take angles, found a length",
            args.range,
        )),
    }
}

/// `min`/`max` over the arguments, or over a single array argument
fn extremum(builtin: Builtin, args: &Args<'_>) -> Result<Number, EvalError> {
    let values = match args.values() {
        [Value::Array(items)] => items.as_slice(),
        values => values,
    };
    let mut best: Option<Number> = None;
    for value in values {
        let Value::Number(n) = value else {
            return Err(args.semantic(format!("expected numbers, found a {}", value.type_name())));
        };
        best = Some(match best {
            None => *n,
            Some(current) => {
                let ty = current.ty.additive(n.ty).ok_or_else(|| {
                    EvalError::unit_mismatch(
                        format!("{}: cannot compare a {} and a {}", builtin.name(), current.ty.name(), n.ty.name()),
                        args.range,
                    )
                })?;
                let pick_new = match builtin {
                    Builtin::Min => n.value < current.value,
                    _ => n.value > current.value,
                };
                Number::new(if pick_new { n.value } else { current.value }, ty)
            }
        });
    }
    best.ok_or_else(|| args.semantic("needs at least one number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceRange;
    use approx::assert_relative_eq;

    fn eval(builtin: Builtin, values: Vec<Value<'static>>) -> Result<Number, EvalError> {
        match call(builtin, Args::new(builtin.name(), values, SourceRange::new(0, 1)))? {
            Value::Number(n) => Ok(n),
            other => panic!("expected a number, got {:?}", other),
        }
    }

    fn num(value: f64) -> Value<'static> {
        Value::Number(Number::unitless(value))
    }

    #[test]
    fn test_trig_units() {
        let deg = eval(Builtin::Sin, vec![Value::Number(Number::angle(30.0))]).unwrap();
        assert_relative_eq!(deg.value, 0.5, epsilon = 1e-12);
        let rad = eval(Builtin::Cos, vec![num(std::f64::consts::PI)]).unwrap();
        assert_relative_eq!(rad.value, -1.0, epsilon = 1e-12);
        assert!(matches!(
            eval(Builtin::Sin, vec![Value::Number(Number::length(1.0))]),
            Err(EvalError::UnitMismatch { .. })
        ));
    }

    #[test]
    fn test_inverse_trig_returns_degrees() {
        let angle = eval(Builtin::Asin, vec![num(1.0)]).unwrap();
        assert_eq!(angle.ty, NumericType::Angle);
        assert_relative_eq!(angle.value, 90.0, epsilon = 1e-12);
        assert!(eval(Builtin::Acos, vec![num(2.0)]).is_err());
    }

    #[test]
    fn test_min_max_over_arguments_and_arrays() {
        let min = eval(Builtin::Min, vec![num(3.0), num(-1.0), num(2.0)]).unwrap();
        assert_eq!(min.value, -1.0);
        let max = eval(Builtin::Max, vec![Value::Array(vec![num(3.0), num(7.0)])]).unwrap();
        assert_eq!(max.value, 7.0);
        assert!(eval(Builtin::Max, vec![]).is_err());
    }

    #[test]
    fn test_sqrt_and_rounding() {
        assert_eq!(eval(Builtin::Sqrt, vec![num(16.0)]).unwrap().value, 4.0);
        assert!(eval(Builtin::Sqrt, vec![num(-1.0)]).is_err());
        let rounded = eval(Builtin::Round, vec![Value::Number(Number::length(2.5))]).unwrap();
        assert_eq!(rounded, Number::length(3.0));
    }
}
