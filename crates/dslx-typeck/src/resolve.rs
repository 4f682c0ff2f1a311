//! Resolution of type templates against bindings.

use dslx_common::Span;

use crate::env::BindingEnv;
use crate::error::InstantiationError;
use crate::eval::{ConstEvaluator, FnCtx};
use crate::expr::DimEvalError;
use crate::ty::{Dim, Ty};
use crate::verify::verify_constraints;

/// Verify constraints, then substitute every symbolic dimension of `ty`.
pub fn resolve(
    env: &mut BindingEnv,
    ty: &Ty,
    span: Span,
    evaluator: &dyn ConstEvaluator,
    fn_ctx: &FnCtx,
) -> Result<Ty, InstantiationError> {
    verify_constraints(env, span, evaluator, fn_ctx)?;
    substitute(env, ty, span)
}

/// Substitute current bindings into `ty` without re-checking constraints.
///
/// Fails if any symbolic dimension references an unbound name.
pub fn substitute(env: &BindingEnv, ty: &Ty, span: Span) -> Result<Ty, InstantiationError> {
    ty.map_size(&mut |dim| match dim {
        Dim::Concrete(_) => Ok(dim.clone()),
        Dim::Parametric(expr) => expr
            .evaluate(&|name| env.get(name))
            .map(Dim::Concrete)
            .map_err(|e| match e {
                DimEvalError::Unbound(name) => InstantiationError::UnboundParametric {
                    span,
                    name,
                    ty: ty.to_string(),
                },
                other => InstantiationError::InvalidDimension {
                    span,
                    dim: expr.to_string(),
                    ty: ty.to_string(),
                    reason: other.to_string(),
                },
            }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{BindingOrigin, ParametricBinding};
    use crate::eval::Interpreter;
    use crate::expr::{BinaryOp, ConstExpr, ParametricExpr};

    fn resolve_in(env: &mut BindingEnv, ty: &Ty) -> Result<Ty, InstantiationError> {
        resolve(env, ty, Span::default(), &Interpreter::new(), &FnCtx::default())
    }

    #[test]
    fn concrete_types_resolve_to_themselves() {
        let mut env = BindingEnv::new(None, None);
        let ty = Ty::tuple(vec![Ty::ubits(3), Ty::array(Ty::sbits(2), 5)]);
        assert_eq!(resolve_in(&mut env, &ty).unwrap(), ty);
    }

    #[test]
    fn compound_dims_are_evaluated() {
        let mut env = BindingEnv::new(None, None);
        env.install("N", 8, BindingOrigin::Argument(0));
        let ty = Ty::Bits {
            signed: false,
            size: Dim::Parametric(ParametricExpr::add(
                ParametricExpr::symbol("N"),
                ParametricExpr::Constant(1),
            )),
        };
        assert_eq!(resolve_in(&mut env, &ty).unwrap(), Ty::ubits(9));
    }

    #[test]
    fn resolve_runs_constraints_first() {
        let decls = vec![
            ParametricBinding::new("N", 32),
            ParametricBinding::with_expr(
                "M",
                32,
                ConstExpr::binary(BinaryOp::Mul, ConstExpr::name("N"), ConstExpr::number(2)),
            ),
        ];
        let mut env = BindingEnv::new(Some(&decls), None);
        env.install("N", 3, BindingOrigin::Argument(0));
        let ty = Ty::array(Ty::ubits(1), Dim::symbol("M"));
        assert_eq!(resolve_in(&mut env, &ty).unwrap(), Ty::array(Ty::ubits(1), 6));
    }

    #[test]
    fn unbound_dims_fail() {
        let env = BindingEnv::new(None, None);
        let err = substitute(&env, &Ty::bits_param(false, "N"), Span::default()).unwrap_err();
        assert_eq!(err.to_string(), "parametric `N` has no binding; cannot resolve uN[N]");
    }

    #[test]
    fn negative_bindings_are_invalid_sizes() {
        let mut env = BindingEnv::new(None, None);
        env.install("N", -2, BindingOrigin::Explicit);
        let err = substitute(&env, &Ty::bits_param(true, "N"), Span::default()).unwrap_err();
        assert!(matches!(err, InstantiationError::InvalidDimension { .. }));
    }
}
