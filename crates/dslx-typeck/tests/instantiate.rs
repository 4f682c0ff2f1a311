//! End-to-end tests for function and struct instantiation.
//!
//! Signatures are written in the textual type syntax and run through the
//! public `instantiate_function` / `instantiate_struct` entry points with the
//! default interpreter as the constant evaluator.

use dslx_common::Span;
use dslx_typeck::env::BindingOrigin;
use dslx_typeck::syntax::{parse_expr, parse_type, NominalScope};
use dslx_typeck::{
    instantiate_function, instantiate_struct, FnCtx, FunctionType, InstantiateCtx,
    InstantiationError, Interpreter, ParametricBinding, SymbolicBindings, Ty, TypeAndBindings,
};

// ── Helpers ────────────────────────────────────────────────────────────

fn ty(text: &str) -> Ty {
    parse_type(text, &NominalScope::new()).unwrap()
}

fn tys(texts: &[&str]) -> Vec<Ty> {
    texts.iter().map(|t| ty(t)).collect()
}

/// `N` with no defining expression.
fn free(name: &str) -> ParametricBinding {
    ParametricBinding::new(name, 32)
}

/// `name: u32 = {expr}`.
fn defined(name: &str, expr: &str) -> ParametricBinding {
    ParametricBinding::with_expr(name, 32, parse_expr(expr).unwrap())
}

fn call(
    params: &[&str],
    ret: &str,
    args: &[&str],
    parametrics: &[ParametricBinding],
    explicit: Option<&SymbolicBindings>,
) -> Result<TypeAndBindings, InstantiationError> {
    call_with(&Interpreter::new(), params, ret, args, parametrics, explicit)
}

fn call_with(
    interp: &Interpreter,
    params: &[&str],
    ret: &str,
    args: &[&str],
    parametrics: &[ParametricBinding],
    explicit: Option<&SymbolicBindings>,
) -> Result<TypeAndBindings, InstantiationError> {
    let sig = FunctionType::new(tys(params), ty(ret));
    let ctx = InstantiateCtx::new(interp, FnCtx::new("test", "main"));
    instantiate_function(
        Span::new(0, 10),
        &sig,
        &tys(args),
        &ctx,
        Some(parametrics),
        explicit,
    )
}

// ── Function Instantiation ─────────────────────────────────────────────

#[test]
fn same_width_arguments_bind_and_resolve_return() {
    let result = call(&["uN[N]", "uN[N]"], "uN[N]", &["uN[8]", "uN[8]"], &[free("N")], None)
        .unwrap();
    assert_eq!(result.ty, Ty::ubits(8));
    assert_eq!(result.bindings.to_string(), "{N: 8}");
}

#[test]
fn concrete_signature_is_identity() {
    let result = call(
        &["(u8, sN[4][2])"],
        "u16",
        &["(u8, sN[4][2])"],
        &[],
        None,
    )
    .unwrap();
    assert_eq!(result.ty, Ty::ubits(16));
    assert!(result.bindings.is_empty());
}

#[test]
fn conflicting_widths_name_both_values_in_order() {
    let err = call(&["uN[N]", "uN[N]"], "uN[N]", &["uN[8]", "uN[9]"], &[free("N")], None)
        .unwrap_err();
    match &err {
        InstantiationError::ConflictingBinding {
            name,
            first,
            first_origin,
            second,
            second_arg,
            ..
        } => {
            assert_eq!(name, "N");
            assert_eq!((*first, *second), (8, 9));
            assert_eq!(*first_origin, BindingOrigin::Argument(0));
            assert_eq!(*second_arg, 1);
        }
        other => panic!("expected ConflictingBinding, got {:?}", other),
    }
    let msg = err.to_string();
    let saw = msg.find("saw: 8").unwrap();
    let then = msg.find("then: 9").unwrap();
    assert!(saw < then, "values out of order: {}", msg);
}

#[test]
fn kind_mismatch_names_argument_and_binds_nothing_for_it() {
    let err = call(&["uN[N]", "uN[M]"], "uN[N]", &["uN[8]", "uN[4][2]"], &[free("N"), free("M")], None)
        .unwrap_err();
    match err {
        InstantiationError::KindMismatch {
            arg_index,
            formal,
            actual,
            ..
        } => {
            assert_eq!(arg_index, 1);
            assert_eq!(formal, "uN[M]");
            assert_eq!(actual, "uN[4][2]");
        }
        other => panic!("expected KindMismatch, got {:?}", other),
    }
}

#[test]
fn argument_count_checked_first() {
    let err = call(
        &["uN[N]", "uN[N]"],
        "uN[N]",
        &["uN[8]", "uN[8]", "uN[8]"],
        &[free("N")],
        None,
    )
    .unwrap_err();
    match err {
        InstantiationError::ArgCountMismatch {
            expected, found, ..
        } => assert_eq!((expected, found), (2, 3)),
        other => panic!("expected ArgCountMismatch, got {:?}", other),
    }
}

#[test]
fn explicit_binding_is_authoritative() {
    let explicit: SymbolicBindings = [("N", 16)].into_iter().collect();
    let result = call(&["uN[N]"], "uN[N]", &["uN[16]"], &[free("N")], Some(&explicit)).unwrap();
    assert_eq!(result.ty, Ty::ubits(16));
    assert_eq!(result.bindings.get("N"), Some(16));

    let err = call(&["uN[N]"], "uN[N]", &["uN[8]"], &[free("N")], Some(&explicit)).unwrap_err();
    match err {
        InstantiationError::ConflictingBinding {
            first,
            first_origin,
            second,
            ..
        } => {
            assert_eq!((first, second), (16, 8));
            assert_eq!(first_origin, BindingOrigin::Explicit);
        }
        other => panic!("expected ConflictingBinding, got {:?}", other),
    }
}

#[test]
fn signedness_mismatch_after_substitution() {
    let err = call(&["uN[N]"], "uN[N]", &["sN[8]"], &[free("N")], None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "mismatch between parameter and argument types (after instantiation): uN[8] vs sN[8]"
    );
}

#[test]
fn compound_dims_are_checked_not_bound() {
    let params = ["uN[N]", "uN[N + 1]"];
    let ok = call(&params, "uN[N * 2]", &["uN[8]", "uN[9]"], &[free("N")], None).unwrap();
    assert_eq!(ok.ty, Ty::ubits(16));

    let err = call(&params, "uN[N]", &["uN[8]", "uN[8]"], &[free("N")], None).unwrap_err();
    assert!(matches!(
        err,
        InstantiationError::TypeMismatch { arg_index: 1, .. }
    ));
}

#[test]
fn arrays_bind_element_and_size() {
    let result = call(
        &["uN[W][N]"],
        "(uN[W], uN[N])",
        &["uN[3][5]"],
        &[free("W"), free("N")],
        None,
    )
    .unwrap();
    assert_eq!(result.ty.to_string(), "(uN[3], uN[5])");
    assert_eq!(result.bindings.to_string(), "{N: 5, W: 3}");
}

#[test]
fn unbound_return_parametric_fails() {
    let err = call(&["uN[N]"], "uN[M]", &["uN[8]"], &[free("N"), free("M")], None).unwrap_err();
    match err {
        InstantiationError::UnboundParametric { name, ty, .. } => {
            assert_eq!(name, "M");
            assert_eq!(ty, "uN[M]");
        }
        other => panic!("expected UnboundParametric, got {:?}", other),
    }
}

#[test]
fn errors_carry_invocation_span() {
    let err = call(&["uN[N]"], "uN[N]", &["(u8,)"], &[free("N")], None).unwrap_err();
    assert_eq!(err.span(), Span::new(0, 10));
    assert_eq!(err.arg_index(), Some(0));
}

// ── Nominal Types ──────────────────────────────────────────────────────

#[test]
fn struct_arguments_compare_identity() {
    let mut scope = NominalScope::new();
    scope.add_struct("A", vec!["x".into()]);
    scope.add_struct("B", vec!["x".into()]);
    let formal = parse_type("A { x: uN[N] }", &scope).unwrap();
    let good = parse_type("A { x: u8 }", &scope).unwrap();
    let bad = parse_type("B { x: u8 }", &scope).unwrap();

    let interp = Interpreter::new();
    let ctx = InstantiateCtx::new(&interp, FnCtx::default());
    let sig = FunctionType::new(vec![formal.clone()], formal);
    let decls = [free("N")];

    let ok = instantiate_function(Span::default(), &sig, &[good.clone()], &ctx, Some(&decls), None)
        .unwrap();
    assert_eq!(ok.ty, good);

    let err = instantiate_function(Span::default(), &sig, &[bad], &ctx, Some(&decls), None)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "parameter type name: 'A'; argument type name: 'B'"
    );
}

#[test]
fn enums_pass_through_by_identity() {
    let mut scope = NominalScope::new();
    scope.add_enum("Op", false, 2);
    scope.add_enum("Mode", false, 2);
    let op = parse_type("Op", &scope).unwrap();
    let mode = parse_type("Mode", &scope).unwrap();

    let interp = Interpreter::new();
    let ctx = InstantiateCtx::new(&interp, FnCtx::default());
    let sig = FunctionType::new(vec![op.clone(), Ty::bits_param(false, "N")], op.clone());
    let decls = [free("N")];

    let ok = instantiate_function(
        Span::default(),
        &sig,
        &[op.clone(), Ty::ubits(4)],
        &ctx,
        Some(&decls),
        None,
    )
    .unwrap();
    assert_eq!(ok.ty, op);

    let err = instantiate_function(
        Span::default(),
        &sig,
        &[mode, Ty::ubits(4)],
        &ctx,
        Some(&decls),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, InstantiationError::NominalMismatch { arg_index: 0, .. }));
}

#[test]
fn function_typed_parameters_are_unimplemented() {
    let err = call(&["fn(uN[N]) -> uN[N]"], "uN[N]", &["fn(u8) -> u8"], &[free("N")], None)
        .unwrap_err();
    assert!(matches!(err, InstantiationError::Unimplemented { .. }));
}

#[test]
fn symbolic_actual_is_rejected_before_binding() {
    let err = call(&["uN[8]", "uN[N]"], "uN[N]", &["u8", "uN[M]"], &[free("N")], None).unwrap_err();
    match err {
        InstantiationError::NonConcreteArgument { arg_index, ty, .. } => {
            assert_eq!(arg_index, 1);
            assert_eq!(ty, "uN[M]");
        }
        other => panic!("expected NonConcreteArgument, got {:?}", other),
    }

    // A concrete formal does not bind anything, so this would otherwise
    // surface as a post-substitution mismatch.
    let err = call(&["uN[8]"], "u1", &["uN[M]"], &[], None).unwrap_err();
    assert!(matches!(err, InstantiationError::NonConcreteArgument { arg_index: 0, .. }));
}

// ── Struct Instantiation ───────────────────────────────────────────────

fn point_scope() -> NominalScope {
    let mut scope = NominalScope::new();
    scope.add_struct("Point", vec!["x".into(), "y".into()]);
    scope
}

#[test]
fn struct_members_bind_and_resolve_whole_type() {
    let scope = point_scope();
    let struct_type = parse_type("Point { x: uN[N], y: uN[N * 2] }", &scope).unwrap();
    let members = tys(&["uN[N]", "uN[N * 2]"]);
    let args = tys(&["u8", "u16"]);

    let interp = Interpreter::new();
    let ctx = InstantiateCtx::new(&interp, FnCtx::default());
    let result = instantiate_struct(
        Span::new(4, 20),
        &struct_type,
        &args,
        &members,
        &ctx,
        Some(&[free("N")]),
    )
    .unwrap();
    assert_eq!(result.ty.to_string(), "Point { x: uN[8], y: uN[16] }");
    assert_eq!(result.bindings.get("N"), Some(8));
}

#[test]
fn struct_member_mismatch_reports_member() {
    let scope = point_scope();
    let struct_type = parse_type("Point { x: uN[N], y: uN[N * 2] }", &scope).unwrap();
    let members = tys(&["uN[N]", "uN[N * 2]"]);
    let args = tys(&["u8", "u8"]);

    let interp = Interpreter::new();
    let ctx = InstantiateCtx::new(&interp, FnCtx::default());
    let err = instantiate_struct(
        Span::default(),
        &struct_type,
        &args,
        &members,
        &ctx,
        Some(&[free("N")]),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "mismatch between member and argument types (after instantiation): uN[16] vs uN[8]"
    );
}

// ── Nested Evaluation ──────────────────────────────────────────────────

#[test]
fn constraint_calls_instantiate_const_functions() {
    let mut interp = Interpreter::new();
    interp.register(dslx_typeck::ConstFn {
        name: "double".into(),
        parametrics: vec![free("W")],
        params: vec![("x".into(), ty("uN[W]"))],
        ret: ty("uN[W]"),
        body: parse_expr("x + x").unwrap(),
    });
    let result = call_with(
        &interp,
        &["uN[N]"],
        "uN[M]",
        &["uN[8]"],
        &[free("N"), defined("M", "double(N)")],
        None,
    )
    .unwrap();
    assert_eq!(result.ty, Ty::ubits(16));
    assert_eq!(result.bindings.to_string(), "{M: 16, N: 8}");
}
