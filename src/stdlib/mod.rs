// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Built-in functions and constants

mod args;
mod collections;
mod math;
mod sketch;
mod solid;

pub(crate) use args::Args;

use crate::ast::{Evaluator, SourceRange, Value};
use crate::errors::EvalError;

/// Every name the language provides without a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    // Math
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Round,
    Min,
    Max,
    Pow,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    ToRadians,
    ToDegrees,
    Pi,
    // Collections and checks
    Len,
    Map,
    Reduce,
    Push,
    Assert,
    // Sketching
    StartSketchOn,
    OffsetPlane,
    StartProfileAt,
    Line,
    LineTo,
    XLine,
    YLine,
    AngledLine,
    Arc,
    Close,
    Circle,
    Hole,
    // Solids
    Extrude,
    Revolve,
    Cube,
    Cylinder,
    Sphere,
    Union,
    Subtract,
    Intersect,
    Translate,
    Rotate,
    Scale,
    PatternLinear,
}

impl Builtin {
    pub const ALL: &'static [Builtin] = &[
        Builtin::Sqrt,
        Builtin::Abs,
        Builtin::Floor,
        Builtin::Ceil,
        Builtin::Round,
        Builtin::Min,
        Builtin::Max,
        Builtin::Pow,
        Builtin::Sin,
        Builtin::Cos,
        Builtin::Tan,
        Builtin::Asin,
        Builtin::Acos,
        Builtin::Atan,
        Builtin::ToRadians,
        Builtin::ToDegrees,
        Builtin::Pi,
        Builtin::Len,
        Builtin::Map,
        Builtin::Reduce,
        Builtin::Push,
        Builtin::Assert,
        Builtin::StartSketchOn,
        Builtin::OffsetPlane,
        Builtin::StartProfileAt,
        Builtin::Line,
        Builtin::LineTo,
        Builtin::XLine,
        Builtin::YLine,
        Builtin::AngledLine,
        Builtin::Arc,
        Builtin::Close,
        Builtin::Circle,
        Builtin::Hole,
        Builtin::Extrude,
        Builtin::Revolve,
        Builtin::Cube,
        Builtin::Cylinder,
        Builtin::Sphere,
        Builtin::Union,
        Builtin::Subtract,
        Builtin::Intersect,
        Builtin::Translate,
        Builtin::Rotate,
        Builtin::Scale,
        Builtin::PatternLinear,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Sqrt => "sqrt",
            Builtin::Abs => "abs",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
            Builtin::Round => "round",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Pow => "pow",
            Builtin::Sin => "sin",
            Builtin::Cos => "cos",
            Builtin::Tan => "tan",
            Builtin::Asin => "asin",
            Builtin::Acos => "acos",
            Builtin::Atan => "atan",
            Builtin::ToRadians => "toRadians",
            Builtin::ToDegrees => "toDegrees",
            Builtin::Pi => "PI",
            Builtin::Len => "len",
            Builtin::Map => "map",
            Builtin::Reduce => "reduce",
            Builtin::Push => "push",
            Builtin::Assert => "assert",
            Builtin::StartSketchOn => "startSketchOn",
            Builtin::OffsetPlane => "offsetPlane",
            Builtin::StartProfileAt => "startProfileAt",
            Builtin::Line => "line",
            Builtin::LineTo => "lineTo",
            Builtin::XLine => "xLine",
            Builtin::YLine => "yLine",
            Builtin::AngledLine => "angledLine",
            Builtin::Arc => "arc",
            Builtin::Close => "close",
            Builtin::Circle => "circle",
            Builtin::Hole => "hole",
            Builtin::Extrude => "extrude",
            Builtin::Revolve => "revolve",
            Builtin::Cube => "cube",
            Builtin::Cylinder => "cylinder",
            Builtin::Sphere => "sphere",
            Builtin::Union => "union",
            Builtin::Subtract => "subtract",
            Builtin::Intersect => "intersect",
            Builtin::Translate => "translate",
            Builtin::Rotate => "rotate",
            Builtin::Scale => "scale",
            Builtin::PatternLinear => "patternLinear",
        }
    }

    pub fn lookup(name: &str) -> Option<Builtin> {
        Self::ALL.iter().copied().find(|b| b.name() == name)
    }

    /// Constants evaluate to a value instead of a callable
    pub fn is_constant(self) -> bool {
        matches!(self, Builtin::Pi)
    }
}

/// Invoke `builtin` with already evaluated arguments
pub(crate) fn call<'a>(
    ev: &mut Evaluator<'a>,
    builtin: Builtin,
    values: Vec<Value<'a>>,
    range: SourceRange,
) -> Result<Value<'a>, EvalError> {
    let args = Args::new(builtin.name(), values, range);
    match builtin {
        Builtin::Sqrt
        | Builtin::Abs
        | Builtin::Floor
        | Builtin::Ceil
        | Builtin::Round
        | Builtin::Min
        | Builtin::Max
        | Builtin::Pow
        | Builtin::Sin
        | Builtin::Cos
        | Builtin::Tan
        | Builtin::Asin
        | Builtin::Acos
        | Builtin::Atan
        | Builtin::ToRadians
        | Builtin::ToDegrees
        | Builtin::Pi => math::call(builtin, args),
        Builtin::Len | Builtin::Map | Builtin::Reduce | Builtin::Push | Builtin::Assert => {
            collections::call(ev, builtin, args)
        }
        Builtin::StartSketchOn
        | Builtin::OffsetPlane
        | Builtin::StartProfileAt
        | Builtin::Line
        | Builtin::LineTo
        | Builtin::XLine
        | Builtin::YLine
        | Builtin::AngledLine
        | Builtin::Arc
        | Builtin::Close
        | Builtin::Circle
        | Builtin::Hole => sketch::call(ev, builtin, args),
        Builtin::Extrude
        | Builtin::Revolve
        | Builtin::Cube
        | Builtin::Cylinder
        | Builtin::Sphere
        | Builtin::Union
        | Builtin::Subtract
        | Builtin::Intersect
        | Builtin::Translate
        | Builtin::Rotate
        | Builtin::Scale
        | Builtin::PatternLinear => solid::call(ev, builtin, args),
    }
}
