//! Constraint verification.
//!
//! Walks the declared parametrics in declaration order and evaluates each
//! defining expression against the current bindings. A result either installs
//! a new binding or must agree with the one already present. Expressions that
//! cannot be evaluated yet are skipped. Passes repeat while the previous one
//! installed a binding, so a constraint that depends on a later-declared
//! derived parametric is picked up in the same call.

use dslx_common::Span;
use tracing::{debug, trace};

use crate::env::{BindingEnv, BindingOrigin};
use crate::error::InstantiationError;
use crate::eval::{ConstEvaluator, FnCtx};

pub fn verify_constraints(
    env: &mut BindingEnv,
    span: Span,
    evaluator: &dyn ConstEvaluator,
    fn_ctx: &FnCtx,
) -> Result<(), InstantiationError> {
    loop {
        let generation = env.generation();
        verify_pass(env, span, evaluator, fn_ctx)?;
        if env.generation() == generation {
            return Ok(());
        }
        trace!(generation = env.generation(), "constraints installed bindings; re-verifying");
    }
}

/// One walk over the constraints in declaration order.
fn verify_pass(
    env: &mut BindingEnv,
    span: Span,
    evaluator: &dyn ConstEvaluator,
    fn_ctx: &FnCtx,
) -> Result<(), InstantiationError> {
    for idx in 0..env.order().len() {
        let name = env.order()[idx].clone();
        let Some(expr) = env.constraint(&name) else {
            continue; // e.g. `N: u32` with no defining expression
        };

        let value = match evaluator.evaluate(expr, env, fn_ctx) {
            Ok(value) => value,
            Err(e) if e.is_benign() => {
                trace!(name = %name, reason = %e, "constraint not yet resolvable");
                continue;
            }
            Err(source) => return Err(InstantiationError::Evaluation { span, source }),
        };
        debug!(name = %name, %expr, value, "evaluated parametric constraint");

        match env.get(&name) {
            Some(seen) if seen != value => {
                return Err(InstantiationError::ConstraintViolation {
                    span,
                    name,
                    seen,
                    expr: expr.to_string(),
                    value,
                });
            }
            Some(_) => {}
            None => env.install(&name, value, BindingOrigin::Constraint),
        }
    }
    Ok(())
}
