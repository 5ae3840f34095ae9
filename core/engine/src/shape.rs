//! FILENAME: core/engine/src/shape.rs
//! PURPOSE: The shape formula library.
//! CONTEXT: Pure, stateless mapping from (shape, operation, dimension) to a number.
//! The dimension is the single characteristic length of the shape: radius for
//! circle/sphere, edge length for everything else. Flat shapes have no volume
//! and report 0 for a volume request.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::CalcError;

/// The shapes the engine knows how to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    Circle,
    Square,
    EquilateralTriangle,
    Sphere,
    Cube,
    Tetrahedron,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 6] = [
        ShapeKind::Circle,
        ShapeKind::Square,
        ShapeKind::EquilateralTriangle,
        ShapeKind::Sphere,
        ShapeKind::Cube,
        ShapeKind::Tetrahedron,
    ];

    /// True for three-dimensional shapes (the ones with a volume).
    pub fn is_solid(self) -> bool {
        matches!(self, ShapeKind::Sphere | ShapeKind::Cube | ShapeKind::Tetrahedron)
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Square => "square",
            ShapeKind::EquilateralTriangle => "equilateral-triangle",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Cube => "cube",
            ShapeKind::Tetrahedron => "tetrahedron",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeKind {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "" => Err(CalcError::invalid("shape kind is required")),
            "circle" => Ok(ShapeKind::Circle),
            "square" => Ok(ShapeKind::Square),
            "equilateraltriangle" => Ok(ShapeKind::EquilateralTriangle),
            "sphere" => Ok(ShapeKind::Sphere),
            "cube" => Ok(ShapeKind::Cube),
            "tetrahedron" => Ok(ShapeKind::Tetrahedron),
            _ => Err(CalcError::invalid(format!("unknown shape kind '{}'", s.trim()))),
        }
    }
}

/// The quantity being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Area,
    Volume,
}

impl Operation {
    pub const ALL: [Operation; 2] = [Operation::Area, Operation::Volume];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Area => "area",
            Operation::Volume => "volume",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = normalize_name(s);
        // Accept the "calc_area" / "calc_volume" spelling as well
        let name = name.strip_prefix("calc").unwrap_or(name.as_str());
        match name {
            "" => Err(CalcError::invalid("operation is required")),
            "area" => Ok(Operation::Area),
            "volume" => Ok(Operation::Volume),
            _ => Err(CalcError::invalid(format!("unknown operation '{}'", s.trim()))),
        }
    }
}

/// Lowercase and drop separators so "Equilateral-Triangle", "EQUILATERAL_TRIANGLE"
/// and "equilateral triangle" all compare equal.
fn normalize_name(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Computes `operation` for `shape` with the given characteristic length.
///
/// Fails with `InvalidArgument` for a negative or non-finite dimension and with
/// `ComputationFailed` if the closed-form result overflows.
pub fn compute(shape: ShapeKind, operation: Operation, dimension: f64) -> Result<f64, CalcError> {
    if !dimension.is_finite() || dimension < 0.0 {
        return Err(CalcError::invalid(format!(
            "dimension must be a non-negative finite number, got {}",
            dimension
        )));
    }

    let d = dimension;
    let value = match operation {
        Operation::Area => area(shape, d),
        Operation::Volume => volume(shape, d),
    };

    if !value.is_finite() {
        return Err(CalcError::failed(format!(
            "{} {} of {} is not representable",
            shape, operation, dimension
        )));
    }
    Ok(value)
}

fn area(shape: ShapeKind, d: f64) -> f64 {
    match shape {
        ShapeKind::Circle => PI * d * d,
        ShapeKind::Square => d * d,
        ShapeKind::EquilateralTriangle => (3f64.sqrt() / 4.0) * d * d,
        ShapeKind::Sphere => 4.0 * PI * d * d,
        ShapeKind::Cube => 6.0 * d * d,
        ShapeKind::Tetrahedron => 3f64.sqrt() * d * d,
    }
}

fn volume(shape: ShapeKind, d: f64) -> f64 {
    match shape {
        // Flat shapes have no volume
        ShapeKind::Circle | ShapeKind::Square | ShapeKind::EquilateralTriangle => 0.0,
        ShapeKind::Sphere => (4.0 / 3.0) * PI * d * d * d,
        ShapeKind::Cube => d * d * d,
        ShapeKind::Tetrahedron => d * d * d / (6.0 * 2f64.sqrt()),
    }
}
