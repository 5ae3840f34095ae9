//! FILENAME: core/engine/src/request.rs
//! PURPOSE: Defines the calculation request and calculation result values.
//! CONTEXT: A request has no identity beyond its three fields; two requests with
//! the same shape, operation and dimension are the same request. That equality
//! is the deduplication key of the pending store, so `Eq` and `Hash` must agree
//! exactly, which is why the dimension is compared by its bit pattern after
//! validation has ruled out NaN and folded -0.0 into 0.0.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::CalcError;
use crate::shape::{self, Operation, ShapeKind};

/// An immutable, validated request to compute one quantity of one shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RawRequest")]
pub struct CalculationRequest {
    shape: ShapeKind,
    operation: Operation,
    dimension: f64,
}

/// Unvalidated wire form; deserialization goes through `CalculationRequest::new`.
#[derive(Deserialize)]
struct RawRequest {
    shape: ShapeKind,
    operation: Operation,
    dimension: f64,
}

impl TryFrom<RawRequest> for CalculationRequest {
    type Error = CalcError;

    fn try_from(raw: RawRequest) -> Result<Self, Self::Error> {
        CalculationRequest::new(raw.shape, raw.operation, raw.dimension)
    }
}

impl CalculationRequest {
    /// Builds a request, rejecting negative, NaN and infinite dimensions.
    pub fn new(shape: ShapeKind, operation: Operation, dimension: f64) -> Result<Self, CalcError> {
        if dimension.is_nan() || dimension.is_infinite() || dimension < 0.0 {
            return Err(CalcError::invalid(format!(
                "dimension must be a non-negative finite number, got {}",
                dimension
            )));
        }

        Ok(CalculationRequest {
            shape,
            operation,
            // -0.0 == 0.0 but they hash differently
            dimension: if dimension == 0.0 { 0.0 } else { dimension },
        })
    }

    /// Builds a request from possibly-missing parts. Used at untyped boundaries
    /// where the caller may not have supplied a shape or an operation.
    pub fn from_parts(
        shape: Option<ShapeKind>,
        operation: Option<Operation>,
        dimension: f64,
    ) -> Result<Self, CalcError> {
        let shape = shape.ok_or_else(|| CalcError::invalid("shape kind is required"))?;
        let operation = operation.ok_or_else(|| CalcError::invalid("operation is required"))?;
        Self::new(shape, operation, dimension)
    }

    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn dimension(&self) -> f64 {
        self.dimension
    }

    /// Runs the formula for this request.
    pub fn evaluate(&self) -> Result<f64, CalcError> {
        shape::compute(self.shape, self.operation, self.dimension)
    }
}

impl PartialEq for CalculationRequest {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.operation == other.operation
            && self.dimension.to_bits() == other.dimension.to_bits()
    }
}

impl Eq for CalculationRequest {}

impl Hash for CalculationRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shape.hash(state);
        self.operation.hash(state);
        self.dimension.to_bits().hash(state);
    }
}

impl fmt::Display for CalculationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}({})", self.shape, self.operation, self.dimension)
    }
}

/// The outcome stored for a request: either the computed number or the failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultValue {
    Number(f64),
    Error(CalcError),
}

impl ResultValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ResultValue::Number(n) => Some(*n),
            ResultValue::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResultValue::Error(_))
    }
}

impl From<Result<f64, CalcError>> for ResultValue {
    fn from(outcome: Result<f64, CalcError>) -> Self {
        match outcome {
            Ok(n) => ResultValue::Number(n),
            Err(e) => ResultValue::Error(e),
        }
    }
}

/// A request paired with what executing it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub request: CalculationRequest,
    pub value: ResultValue,
}

impl CalculationResult {
    pub fn new(request: CalculationRequest, value: ResultValue) -> Self {
        CalculationResult { request, value }
    }

    pub fn number(request: CalculationRequest, value: f64) -> Self {
        Self::new(request, ResultValue::Number(value))
    }

    pub fn failure(request: CalculationRequest, error: CalcError) -> Self {
        Self::new(request, ResultValue::Error(error))
    }
}

impl fmt::Display for CalculationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            ResultValue::Number(n) => write!(f, "{} = {}", self.request, n),
            ResultValue::Error(e) => write!(f, "{} failed: {}", self.request, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn req(shape: ShapeKind, op: Operation, d: f64) -> CalculationRequest {
        CalculationRequest::new(shape, op, d).unwrap()
    }

    #[test]
    fn test_value_equality() {
        let a = req(ShapeKind::Circle, Operation::Area, 1.5);
        let b = req(ShapeKind::Circle, Operation::Area, 1.5);
        assert_eq!(a, b);

        assert_ne!(a, req(ShapeKind::Circle, Operation::Area, 1.6));
        assert_ne!(a, req(ShapeKind::Circle, Operation::Volume, 1.5));
        assert_ne!(a, req(ShapeKind::Sphere, Operation::Area, 1.5));
    }

    #[test]
    fn test_negative_zero_is_zero() {
        let pos = req(ShapeKind::Square, Operation::Area, 0.0);
        let neg = req(ShapeKind::Square, Operation::Area, -0.0);
        assert_eq!(pos, neg);

        let mut set = HashSet::new();
        set.insert(pos);
        assert!(!set.insert(neg));
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        for d in [-0.01, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = CalculationRequest::new(ShapeKind::Circle, Operation::Area, d).unwrap_err();
            assert!(matches!(err, CalcError::InvalidArgument(_)), "dimension {}", d);
        }
    }

    #[test]
    fn test_from_parts_requires_shape_and_operation() {
        assert!(CalculationRequest::from_parts(None, Some(Operation::Area), 0.0).is_err());
        assert!(CalculationRequest::from_parts(Some(ShapeKind::Circle), None, 0.0).is_err());
        assert!(CalculationRequest::from_parts(Some(ShapeKind::Circle), Some(Operation::Area), 0.0).is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: CalculationRequest =
            serde_json::from_str(r#"{"shape":"equilateral-triangle","operation":"area","dimension":5.0}"#)
                .unwrap();
        assert_eq!(ok, req(ShapeKind::EquilateralTriangle, Operation::Area, 5.0));

        let bad = serde_json::from_str::<CalculationRequest>(
            r#"{"shape":"circle","operation":"area","dimension":-2.0}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_result_value_from_outcome() {
        let r = req(ShapeKind::Cube, Operation::Volume, 4.0);
        let ok = CalculationResult::new(r, r.evaluate().into());
        assert_eq!(ok.value.as_number(), Some(64.0));

        let failed: ResultValue = Err(CalcError::failed("overflow")).into();
        assert!(failed.is_error());
        assert_eq!(failed.as_number(), None);
    }

    #[test]
    fn test_display() {
        let r = req(ShapeKind::Cube, Operation::Area, 3.0);
        assert_eq!(r.to_string(), "cube area(3)");
        assert_eq!(CalculationResult::number(r, 54.0).to_string(), "cube area(3) = 54");
    }
}
