//! Function and struct instantiation.
//!
//! An instantiator is built for one invocation (or one struct literal), runs
//! once, and yields the concrete result type plus the final bindings:
//!
//! 1. For each argument, bind the formal against the actual, then resolve the
//!    formal; the resolved formal must equal the actual exactly.
//! 2. Resolve the return type (or the struct type) against the final bindings.
//!
//! Constraints are re-verified before every resolve, so a violation surfaces
//! at the first argument that makes it observable.

use dslx_common::Span;
use tracing::{debug, trace};

use crate::bind::{bind, BindSite};
use crate::env::{BindingEnv, ParametricBinding, SymbolicBindings};
use crate::error::InstantiationError;
use crate::eval::{ConstEvaluator, FnCtx};
use crate::resolve::resolve;
use crate::ty::{FunctionType, Ty};

/// Collaborators shared by every instantiation at one call site.
pub struct InstantiateCtx<'a> {
    pub evaluator: &'a dyn ConstEvaluator,
    pub fn_ctx: FnCtx,
}

impl<'a> InstantiateCtx<'a> {
    pub fn new(evaluator: &'a dyn ConstEvaluator, fn_ctx: FnCtx) -> Self {
        InstantiateCtx { evaluator, fn_ctx }
    }
}

/// The outcome of a successful instantiation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeAndBindings {
    pub ty: Ty,
    pub bindings: SymbolicBindings,
}

/// State shared by the function and struct instantiators.
struct ParametricInstantiator<'a> {
    span: Span,
    arg_types: &'a [Ty],
    ctx: &'a InstantiateCtx<'a>,
    env: BindingEnv,
}

impl<'a> ParametricInstantiator<'a> {
    fn new(
        span: Span,
        arg_types: &'a [Ty],
        ctx: &'a InstantiateCtx<'a>,
        parametric_constraints: Option<&[ParametricBinding]>,
        explicit_constraints: Option<&SymbolicBindings>,
    ) -> Self {
        ParametricInstantiator {
            span,
            arg_types,
            ctx,
            env: BindingEnv::new(parametric_constraints, explicit_constraints),
        }
    }

    /// Bind one formal against its actual and return the resolved formal.
    fn instantiate_one_arg(
        &mut self,
        i: usize,
        formal: &Ty,
        actual: &Ty,
    ) -> Result<Ty, InstantiationError> {
        if !actual.is_concrete() {
            return Err(InstantiationError::NonConcreteArgument {
                span: self.span,
                arg_index: i,
                ty: actual.to_string(),
            });
        }
        if !formal.same_kind(actual) {
            return Err(InstantiationError::KindMismatch {
                span: self.span,
                arg_index: i,
                formal: formal.to_string(),
                actual: actual.to_string(),
                formal_kind: formal.kind_name(),
                actual_kind: actual.kind_name(),
            });
        }

        trace!(arg = i, %formal, %actual, "symbolically binding parameter");
        let site = BindSite {
            span: self.span,
            arg_index: i,
        };
        bind(&mut self.env, formal, actual, site)?;
        let resolved = self.resolve(formal)?;
        trace!(arg = i, %resolved, "resolved parameter type");
        Ok(resolved)
    }

    fn resolve(&mut self, ty: &Ty) -> Result<Ty, InstantiationError> {
        resolve(
            &mut self.env,
            ty,
            self.span,
            self.ctx.evaluator,
            &self.ctx.fn_ctx,
        )
    }

    fn finish(self, ty: Ty) -> TypeAndBindings {
        TypeAndBindings {
            ty,
            bindings: self.env.to_symbolic_bindings(),
        }
    }
}

/// Instantiates a parametric function at one invocation.
pub struct FunctionInstantiator<'a> {
    base: ParametricInstantiator<'a>,
    function_type: &'a FunctionType,
}

impl<'a> FunctionInstantiator<'a> {
    /// Validate the argument count and seed explicit bindings.
    pub fn new(
        span: Span,
        function_type: &'a FunctionType,
        arg_types: &'a [Ty],
        ctx: &'a InstantiateCtx<'a>,
        parametric_constraints: Option<&[ParametricBinding]>,
        explicit_constraints: Option<&SymbolicBindings>,
    ) -> Result<Self, InstantiationError> {
        debug!(
            function = %Ty::Function(function_type.clone()),
            parametric_constraints = parametric_constraints.map_or(0, <[_]>::len),
            explicit_constraints = explicit_constraints.map_or(0, SymbolicBindings::len),
            "making function instantiator"
        );
        if arg_types.len() != function_type.params.len() {
            return Err(InstantiationError::ArgCountMismatch {
                span,
                expected: function_type.params.len(),
                found: arg_types.len(),
            });
        }
        Ok(FunctionInstantiator {
            base: ParametricInstantiator::new(
                span,
                arg_types,
                ctx,
                parametric_constraints,
                explicit_constraints,
            ),
            function_type,
        })
    }

    pub fn instantiate(mut self) -> Result<TypeAndBindings, InstantiationError> {
        let params = &self.function_type.params;
        for (i, (formal, actual)) in params.iter().zip(self.base.arg_types).enumerate() {
            let resolved = self.base.instantiate_one_arg(i, formal, actual)?;
            if resolved != *actual {
                return Err(InstantiationError::TypeMismatch {
                    span: self.base.span,
                    arg_index: i,
                    what: "parameter",
                    expected: resolved.to_string(),
                    found: actual.to_string(),
                });
            }
        }

        let ret = &self.function_type.ret;
        let resolved = self.base.resolve(ret)?;
        debug!(from = %ret, to = %resolved, "resolved return type");
        Ok(self.base.finish(resolved))
    }
}

/// Instantiates a parametric struct at one construction site.
pub struct StructInstantiator<'a> {
    base: ParametricInstantiator<'a>,
    struct_type: &'a Ty,
    member_types: &'a [Ty],
}

impl<'a> StructInstantiator<'a> {
    /// `arg_types` and `member_types` must have equal length; the caller has
    /// already reported missing or extra fields, so a difference here is an
    /// internal error.
    pub fn new(
        span: Span,
        struct_type: &'a Ty,
        arg_types: &'a [Ty],
        member_types: &'a [Ty],
        ctx: &'a InstantiateCtx<'a>,
        parametric_bindings: Option<&[ParametricBinding]>,
    ) -> Result<Self, InstantiationError> {
        if arg_types.len() != member_types.len() {
            return Err(InstantiationError::Internal {
                span,
                message: format!(
                    "struct {} has {} member type(s) but {} argument(s)",
                    struct_type,
                    member_types.len(),
                    arg_types.len()
                ),
            });
        }
        debug!(
            %struct_type,
            members = member_types.len(),
            parametric_bindings = parametric_bindings.map_or(0, <[_]>::len),
            "making struct instantiator"
        );
        Ok(StructInstantiator {
            base: ParametricInstantiator::new(span, arg_types, ctx, parametric_bindings, None),
            struct_type,
            member_types,
        })
    }

    pub fn instantiate(mut self) -> Result<TypeAndBindings, InstantiationError> {
        for (i, (member, actual)) in self.member_types.iter().zip(self.base.arg_types).enumerate() {
            let resolved = self.base.instantiate_one_arg(i, member, actual)?;
            if resolved != *actual {
                return Err(InstantiationError::TypeMismatch {
                    span: self.base.span,
                    arg_index: i,
                    what: "member",
                    expected: resolved.to_string(),
                    found: actual.to_string(),
                });
            }
        }

        let resolved = self.base.resolve(self.struct_type)?;
        debug!(to = %resolved, "resolved struct type");
        Ok(self.base.finish(resolved))
    }
}

/// Instantiate a parametric function invocation.
///
/// `explicit_constraints` are caller-pinned values (e.g. `f<u32:8>(x)`); they
/// are authoritative and checked against what the arguments imply.
pub fn instantiate_function(
    span: Span,
    function_type: &FunctionType,
    arg_types: &[Ty],
    ctx: &InstantiateCtx<'_>,
    parametric_constraints: Option<&[ParametricBinding]>,
    explicit_constraints: Option<&SymbolicBindings>,
) -> Result<TypeAndBindings, InstantiationError> {
    debug!(%span, function = %ctx.fn_ctx.function, depth = ctx.fn_ctx.depth, "function instantiation");
    FunctionInstantiator::new(
        span,
        function_type,
        arg_types,
        ctx,
        parametric_constraints,
        explicit_constraints,
    )?
    .instantiate()
}

/// Instantiate a parametric struct literal.
pub fn instantiate_struct(
    span: Span,
    struct_type: &Ty,
    arg_types: &[Ty],
    member_types: &[Ty],
    ctx: &InstantiateCtx<'_>,
    parametric_bindings: Option<&[ParametricBinding]>,
) -> Result<TypeAndBindings, InstantiationError> {
    debug!(%span, %struct_type, "struct instantiation");
    StructInstantiator::new(span, struct_type, arg_types, member_types, ctx, parametric_bindings)?
        .instantiate()
}
