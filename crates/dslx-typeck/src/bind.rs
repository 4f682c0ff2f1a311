//! Symbolic binding of formal parameter types against actual argument types.
//!
//! The binder walks formal and actual types in lockstep. Wherever the formal
//! has a dimension that is exactly one parametric name, the actual's concrete
//! size is recorded as that name's value (or checked against the value already
//! recorded). Structure and nominal identity must agree along the way.

use dslx_common::Span;
use tracing::trace;

use crate::env::{BindingEnv, BindingOrigin};
use crate::error::InstantiationError;
use crate::ty::{Dim, Ty};

/// The argument being bound, for error reporting.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BindSite {
    pub span: Span,
    pub arg_index: usize,
}

/// Bind `formal` against `actual`, recording parametric values in `env`.
pub fn bind(
    env: &mut BindingEnv,
    formal: &Ty,
    actual: &Ty,
    site: BindSite,
) -> Result<(), InstantiationError> {
    match (formal, actual) {
        (Ty::Bits { size: fsize, .. }, Ty::Bits { size: asize, .. }) => {
            bind_dims(env, formal, actual, fsize, asize, site)
        }

        // Enums carry no bindable size; only identity matters.
        (Ty::Enum { def: fdef, .. }, Ty::Enum { def: adef, .. }) => {
            if fdef == adef {
                Ok(())
            } else {
                Err(InstantiationError::NominalMismatch {
                    span: site.span,
                    arg_index: site.arg_index,
                    formal: formal.to_string(),
                    actual: actual.to_string(),
                    formal_name: fdef.name.clone(),
                    actual_name: adef.name.clone(),
                })
            }
        }

        // Element first, then the array's own size.
        (
            Ty::Array {
                element: felem,
                size: fsize,
            },
            Ty::Array {
                element: aelem,
                size: asize,
            },
        ) => {
            bind(env, felem, aelem, site)?;
            bind_dims(env, formal, actual, fsize, asize, site)
        }

        (
            Ty::Tuple {
                members: fmembers,
                nominal: fnominal,
            },
            Ty::Tuple {
                members: amembers,
                nominal: anominal,
            },
        ) => {
            if fnominal != anominal {
                let name = |n: &Option<crate::ty::StructRef>| {
                    n.as_ref()
                        .map_or_else(|| "<none>".to_string(), |s| s.name.clone())
                };
                return Err(InstantiationError::NominalMismatch {
                    span: site.span,
                    arg_index: site.arg_index,
                    formal: formal.to_string(),
                    actual: actual.to_string(),
                    formal_name: name(fnominal),
                    actual_name: name(anominal),
                });
            }
            if fmembers.len() != amembers.len() {
                return Err(InstantiationError::ArityMismatch {
                    span: site.span,
                    arg_index: site.arg_index,
                    expected: fmembers.len(),
                    found: amembers.len(),
                    formal: formal.to_string(),
                    actual: actual.to_string(),
                });
            }
            for (f, a) in fmembers.iter().zip(amembers) {
                bind(env, f, a, site)?;
            }
            Ok(())
        }

        // No call path constructs a function-typed formal today.
        (Ty::Function(_), Ty::Function(_)) => Err(InstantiationError::Unimplemented {
            span: site.span,
            feature: "symbolic binding of function-typed parameters",
        }),

        (formal, actual) => Err(InstantiationError::KindMismatch {
            span: site.span,
            arg_index: site.arg_index,
            formal: formal.to_string(),
            actual: actual.to_string(),
            formal_kind: formal.kind_name(),
            actual_kind: actual.kind_name(),
        }),
    }
}

/// Bind one formal dimension against the matching actual dimension.
fn bind_dims(
    env: &mut BindingEnv,
    formal: &Ty,
    actual: &Ty,
    fdim: &Dim,
    adim: &Dim,
    site: BindSite,
) -> Result<(), InstantiationError> {
    let Some(name) = fdim.as_symbol() else {
        // Concrete or compound: nothing to bind, Resolve checks it.
        return Ok(());
    };
    let Some(size) = adim.as_concrete() else {
        return Err(InstantiationError::NonConcreteArgument {
            span: site.span,
            arg_index: site.arg_index,
            ty: actual.to_string(),
        });
    };
    let value = i64::try_from(size).map_err(|_| InstantiationError::InvalidDimension {
        span: site.span,
        dim: size.to_string(),
        ty: actual.to_string(),
        reason: "does not fit in a signed 64-bit integer".to_string(),
    })?;

    match env.get(name) {
        Some(seen) if seen == value => Ok(()),
        Some(seen) => {
            if let Some(expr) = env.constraint(name) {
                Err(InstantiationError::ConstraintViolation {
                    span: site.span,
                    name: name.to_string(),
                    seen,
                    expr: expr.to_string(),
                    value,
                })
            } else {
                Err(InstantiationError::ConflictingBinding {
                    span: site.span,
                    name: name.to_string(),
                    first: seen,
                    first_origin: env.origin(name).unwrap_or(BindingOrigin::Explicit),
                    second: value,
                    second_arg: site.arg_index,
                    formal: formal.to_string(),
                    actual: actual.to_string(),
                })
            }
        }
        None => {
            trace!(name, value, arg = site.arg_index, "binding parametric from argument");
            env.install(name, value, BindingOrigin::Argument(site.arg_index));
            Ok(())
        }
    }
}
