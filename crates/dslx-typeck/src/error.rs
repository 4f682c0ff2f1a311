//! Instantiation error types.
//!
//! Every error carries the span of the invocation or struct literal that
//! triggered the instantiation. The first error aborts the instantiation;
//! there is no partial result.

use dslx_common::Span;
use thiserror::Error;

use crate::env::BindingOrigin;
use crate::eval::EvalError;

/// An error produced while instantiating a parametric function or struct.
#[derive(Clone, Debug, Error)]
pub enum InstantiationError {
    /// The call supplies a different number of arguments than the signature declares.
    #[error("expected {expected} parameter(s) but got {found} argument(s)")]
    ArgCountMismatch {
        span: Span,
        expected: usize,
        found: usize,
    },
    /// Formal and actual are different kinds of type (e.g. bits vs array).
    #[error(
        "parameter {arg_index} and argument types are different kinds ({formal_kind} vs {actual_kind}): {formal} vs {actual}"
    )]
    KindMismatch {
        span: Span,
        arg_index: usize,
        formal: String,
        actual: String,
        formal_kind: &'static str,
        actual_kind: &'static str,
    },
    /// Formal and actual are structs/enums of different definitions.
    #[error("parameter type name: '{formal_name}'; argument type name: '{actual_name}'")]
    NominalMismatch {
        span: Span,
        arg_index: usize,
        formal: String,
        actual: String,
        formal_name: String,
        actual_name: String,
    },
    /// Tuples with different member counts.
    #[error("tuple member count mismatch at parameter {arg_index}: expected {expected}, got {found} ({formal} vs {actual})")]
    ArityMismatch {
        span: Span,
        arg_index: usize,
        expected: usize,
        found: usize,
        formal: String,
        actual: String,
    },
    /// An unconstrained parametric observed with two different values.
    #[error(
        "parametric value {name} was bound to different values at different places in invocation; saw: {first} ({first_origin}); then: {second} (argument {second_arg})"
    )]
    ConflictingBinding {
        span: Span,
        name: String,
        first: i64,
        first_origin: BindingOrigin,
        second: i64,
        second_arg: usize,
        formal: String,
        actual: String,
    },
    /// A constrained parametric whose observed value disagrees with its
    /// previous value.
    #[error("parametric constraint violated, saw {name} = {seen}; then {name} = {expr} = {value}")]
    ConstraintViolation {
        span: Span,
        name: String,
        seen: i64,
        expr: String,
        value: i64,
    },
    /// After substituting bindings, the formal still differs from the actual.
    #[error("mismatch between {what} and argument types (after instantiation): {expected} vs {found}")]
    TypeMismatch {
        span: Span,
        arg_index: usize,
        what: &'static str,
        expected: String,
        found: String,
    },
    /// A symbolic dimension references a parametric that never got a value.
    #[error("parametric `{name}` has no binding; cannot resolve {ty}")]
    UnboundParametric {
        span: Span,
        name: String,
        ty: String,
    },
    /// A dimension evaluated to something that is not a size.
    #[error("dimension `{dim}` of {ty} is not a valid size: {reason}")]
    InvalidDimension {
        span: Span,
        dim: String,
        ty: String,
        reason: String,
    },
    /// An actual argument type still contains symbolic dimensions.
    #[error("argument {arg_index} has non-concrete type {ty}")]
    NonConcreteArgument {
        span: Span,
        arg_index: usize,
        ty: String,
    },
    #[error("{feature} is not implemented")]
    Unimplemented { span: Span, feature: &'static str },
    /// A caller broke an instantiator precondition.
    #[error("internal error: {message}")]
    Internal { span: Span, message: String },
    /// The constant evaluator failed for a reason other than missing bindings.
    #[error("{source}")]
    Evaluation {
        span: Span,
        #[source]
        source: EvalError,
    },
}

impl InstantiationError {
    /// The span of the instantiation site.
    pub fn span(&self) -> Span {
        match self {
            InstantiationError::ArgCountMismatch { span, .. }
            | InstantiationError::KindMismatch { span, .. }
            | InstantiationError::NominalMismatch { span, .. }
            | InstantiationError::ArityMismatch { span, .. }
            | InstantiationError::ConflictingBinding { span, .. }
            | InstantiationError::ConstraintViolation { span, .. }
            | InstantiationError::TypeMismatch { span, .. }
            | InstantiationError::UnboundParametric { span, .. }
            | InstantiationError::InvalidDimension { span, .. }
            | InstantiationError::NonConcreteArgument { span, .. }
            | InstantiationError::Unimplemented { span, .. }
            | InstantiationError::Internal { span, .. }
            | InstantiationError::Evaluation { span, .. } => *span,
        }
    }

    /// The argument position this error is about, when there is one.
    pub fn arg_index(&self) -> Option<usize> {
        match self {
            InstantiationError::KindMismatch { arg_index, .. }
            | InstantiationError::NominalMismatch { arg_index, .. }
            | InstantiationError::ArityMismatch { arg_index, .. }
            | InstantiationError::TypeMismatch { arg_index, .. }
            | InstantiationError::NonConcreteArgument { arg_index, .. } => Some(*arg_index),
            InstantiationError::ConflictingBinding { second_arg, .. } => Some(*second_arg),
            _ => None,
        }
    }
}
