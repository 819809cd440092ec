// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Length and angle units
//!
//! Every length unit is an exact integer number of micrometres, so converting
//! between two units is a ratio of integers and never accumulates drift.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Linear unit a program's numeric literals are interpreted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitLength {
    #[default]
    Mm,
    Cm,
    M,
    In,
    Ft,
    Yd,
}

impl UnitLength {
    pub const ALL: [UnitLength; 6] = [
        UnitLength::Mm,
        UnitLength::Cm,
        UnitLength::M,
        UnitLength::In,
        UnitLength::Ft,
        UnitLength::Yd,
    ];

    /// Size of one unit in micrometres
    pub const fn micrometres(self) -> u64 {
        match self {
            UnitLength::Mm => 1_000,
            UnitLength::Cm => 10_000,
            UnitLength::M => 1_000_000,
            UnitLength::In => 25_400,
            UnitLength::Ft => 304_800,
            UnitLength::Yd => 914_400,
        }
    }

    /// Convert a value expressed in `self` into `target`
    pub fn convert_to(self, value: f64, target: UnitLength) -> f64 {
        if self == target {
            return value;
        }
        value * self.micrometres() as f64 / target.micrometres() as f64
    }

    /// Factor that turns a value in this unit into metres
    pub fn to_metres(self) -> f64 {
        self.micrometres() as f64 / 1_000_000.0
    }

    /// Literal suffix used in source text
    pub fn suffix(self) -> &'static str {
        match self {
            UnitLength::Mm => "mm",
            UnitLength::Cm => "cm",
            UnitLength::M => "m",
            UnitLength::In => "in",
            UnitLength::Ft => "ft",
            UnitLength::Yd => "yd",
        }
    }
}

impl fmt::Display for UnitLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for UnitLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => Ok(UnitLength::Mm),
            "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => Ok(UnitLength::Cm),
            "m" | "meter" | "meters" | "metre" | "metres" => Ok(UnitLength::M),
            "in" | "inch" | "inches" => Ok(UnitLength::In),
            "ft" | "foot" | "feet" => Ok(UnitLength::Ft),
            "yd" | "yard" | "yards" => Ok(UnitLength::Yd),
            other => Err(format!("unknown length unit '{}'", other)),
        }
    }
}

/// Angular unit of a numeric literal. Angles are stored in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitAngle {
    Deg,
    Rad,
}

impl UnitAngle {
    pub fn to_degrees(self, value: f64) -> f64 {
        match self {
            UnitAngle::Deg => value,
            UnitAngle::Rad => value.to_degrees(),
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            UnitAngle::Deg => "deg",
            UnitAngle::Rad => "rad",
        }
    }
}

/// Unit suffix attached to a numeric literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "unit", rename_all = "camelCase")]
pub enum NumericSuffix {
    Length(UnitLength),
    Angle(UnitAngle),
}

impl NumericSuffix {
    pub fn parse(suffix: &str) -> Option<Self> {
        let parsed = match suffix {
            "mm" => NumericSuffix::Length(UnitLength::Mm),
            "cm" => NumericSuffix::Length(UnitLength::Cm),
            "m" => NumericSuffix::Length(UnitLength::M),
            "in" => NumericSuffix::Length(UnitLength::In),
            "ft" => NumericSuffix::Length(UnitLength::Ft),
            "yd" => NumericSuffix::Length(UnitLength::Yd),
            "deg" => NumericSuffix::Angle(UnitAngle::Deg),
            "rad" => NumericSuffix::Angle(UnitAngle::Rad),
            _ => return None,
        };
        Some(parsed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NumericSuffix::Length(unit) => unit.suffix(),
            NumericSuffix::Angle(unit) => unit.suffix(),
        }
    }

    pub fn numeric_type(self) -> NumericType {
        match self {
            NumericSuffix::Length(_) => NumericType::Length,
            NumericSuffix::Angle(_) => NumericType::Angle,
        }
    }
}

/// Dimension carried by a runtime number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumericType {
    #[default]
    Unitless,
    Length,
    Angle,
}

impl NumericType {
    pub fn name(self) -> &'static str {
        match self {
            NumericType::Unitless => "unitless number",
            NumericType::Length => "length",
            NumericType::Angle => "angle",
        }
    }

    /// Result type of `+`, `-` and comparisons, or `None` when the operands clash
    pub fn additive(self, other: NumericType) -> Option<NumericType> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (NumericType::Unitless, b) => Some(b),
            (a, NumericType::Unitless) => Some(a),
            _ => None,
        }
    }

    /// Result type of `*`, `/` and `%`
    pub fn multiplicative(self, other: NumericType) -> Option<NumericType> {
        match (self, other) {
            (NumericType::Unitless, b) => Some(b),
            (a, NumericType::Unitless) => Some(a),
            (a, b) if a == b => Some(NumericType::Unitless),
            _ => None,
        }
    }
}
