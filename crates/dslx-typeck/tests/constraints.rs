//! Constraint verification through the public instantiation entry points.

use dslx_common::Span;
use dslx_typeck::syntax::{parse_expr, parse_type, NominalScope};
use dslx_typeck::{
    instantiate_function, ConstFn, EvalError, EvalOptions, FnCtx, FunctionType, InstantiateCtx,
    InstantiationError, Interpreter, ParametricBinding, Ty, TypeAndBindings,
};

fn ty(text: &str) -> Ty {
    parse_type(text, &NominalScope::new()).unwrap()
}

fn free(name: &str) -> ParametricBinding {
    ParametricBinding::new(name, 32)
}

fn defined(name: &str, expr: &str) -> ParametricBinding {
    ParametricBinding::with_expr(name, 32, parse_expr(expr).unwrap())
}

fn run(
    interp: &Interpreter,
    params: &[&str],
    ret: &str,
    args: &[&str],
    parametrics: &[ParametricBinding],
) -> Result<TypeAndBindings, InstantiationError> {
    let sig = FunctionType::new(params.iter().map(|p| ty(p)).collect(), ty(ret));
    let args: Vec<Ty> = args.iter().map(|a| ty(a)).collect();
    let ctx = InstantiateCtx::new(interp, FnCtx::new("test", "main"));
    instantiate_function(Span::new(0, 1), &sig, &args, &ctx, Some(parametrics), None)
}

// ── Derived Parametrics ────────────────────────────────────────────────

#[test]
fn derived_parametric_matches_argument() {
    let result = run(
        &Interpreter::new(),
        &["uN[M]", "uN[N]"],
        "uN[N]",
        &["uN[7]", "uN[8]"],
        &[free("M"), defined("N", "M + 1")],
    )
    .unwrap();
    assert_eq!(result.ty, Ty::ubits(8));
    assert_eq!(result.bindings.to_string(), "{M: 7, N: 8}");
}

#[test]
fn derived_parametric_checked_at_the_argument_that_reveals_it() {
    // Argument 2 is also wrong, but the violation at argument 1 wins.
    let err = run(
        &Interpreter::new(),
        &["uN[M]", "uN[N]", "uN[4]"],
        "uN[N]",
        &["uN[7]", "uN[9]", "(u4,)"],
        &[free("M"), defined("N", "M + 1")],
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "parametric constraint violated, saw N = 8; then N = M + 1 = 9"
    );
}

#[test]
fn constraint_on_later_declared_name_is_deferred() {
    // `A` depends on `B`, which only the second argument binds.
    let decls = [defined("A", "B + 1"), free("B")];
    let ok = run(
        &Interpreter::new(),
        &["uN[A]", "uN[B]"],
        "uN[A]",
        &["uN[9]", "uN[8]"],
        &decls,
    )
    .unwrap();
    assert_eq!(ok.ty, Ty::ubits(9));

    let err = run(
        &Interpreter::new(),
        &["uN[A]", "uN[B]"],
        "uN[A]",
        &["uN[5]", "uN[8]"],
        &decls,
    )
    .unwrap_err();
    match err {
        InstantiationError::ConstraintViolation {
            name, seen, value, ..
        } => {
            assert_eq!(name, "A");
            assert_eq!((seen, value), (5, 9));
        }
        other => panic!("expected ConstraintViolation, got {:?}", other),
    }
}

#[test]
fn return_only_parametric_comes_from_its_expression() {
    let result = run(
        &Interpreter::new(),
        &["uN[N]", "uN[N]"],
        "uN[R]",
        &["uN[8]", "uN[8]"],
        &[free("N"), defined("R", "N + N")],
    )
    .unwrap();
    assert_eq!(result.ty, Ty::ubits(16));
}

#[test]
fn boolean_constraints_evaluate_to_one_bit() {
    let result = run(
        &Interpreter::new(),
        &["uN[N]"],
        "uN[OK]",
        &["uN[8]"],
        &[free("N"), defined("OK", "N > 0 && N <= 64")],
    )
    .unwrap();
    assert_eq!(result.ty, Ty::ubits(1));
}

// ── Evaluator Failures ─────────────────────────────────────────────────

#[test]
fn unknown_callee_is_deferred_until_needed() {
    let decls = [free("N"), defined("L", "clog2(N)")];
    let ok = run(&Interpreter::new(), &["uN[N]"], "uN[N]", &["uN[8]"], &decls).unwrap();
    assert_eq!(ok.bindings.get("L"), None);

    let err = run(&Interpreter::new(), &["uN[N]"], "uN[L]", &["uN[8]"], &decls).unwrap_err();
    assert!(matches!(err, InstantiationError::UnboundParametric { ref name, .. } if name == "L"));
}

#[test]
fn division_by_zero_is_fatal() {
    let err = run(
        &Interpreter::new(),
        &["uN[N]"],
        "uN[N]",
        &["uN[0]"],
        &[free("N"), defined("Q", "8 / N")],
    )
    .unwrap_err();
    match err {
        InstantiationError::Evaluation {
            source: EvalError::DivisionByZero { expr },
            ..
        } => assert_eq!(expr, "8 / N"),
        other => panic!("expected DivisionByZero, got {:?}", other),
    }
}

#[test]
fn self_recursive_const_function_hits_depth_limit() {
    let mut interp = Interpreter::with_options(EvalOptions { max_depth: 4 });
    interp.register(ConstFn {
        name: "spin".into(),
        parametrics: vec![free("W")],
        params: vec![("x".into(), ty("uN[W]"))],
        ret: ty("uN[W]"),
        body: parse_expr("spin(x)").unwrap(),
    });
    let err = run(
        &interp,
        &["uN[N]"],
        "uN[N]",
        &["uN[8]"],
        &[free("N"), defined("S", "spin(N)")],
    )
    .unwrap_err();
    match err {
        InstantiationError::Evaluation {
            source: EvalError::RecursionLimit { callee, limit },
            ..
        } => {
            assert_eq!(callee, "spin");
            assert_eq!(limit, 4);
        }
        other => panic!("expected RecursionLimit, got {:?}", other),
    }
}

#[test]
fn failing_callee_instantiation_is_wrapped() {
    let mut interp = Interpreter::new();
    interp.register(ConstFn {
        name: "pair".into(),
        parametrics: vec![free("W")],
        params: vec![
            ("a".into(), ty("uN[W]")),
            ("b".into(), ty("uN[W]")),
        ],
        ret: ty("uN[W]"),
        body: parse_expr("a + b").unwrap(),
    });
    let err = run(
        &interp,
        &["uN[N]"],
        "uN[N]",
        &["uN[8]"],
        &[free("N"), defined("P", "pair(N, u8:1)")],
    )
    .unwrap_err();
    match err {
        InstantiationError::Evaluation {
            source: EvalError::Callee { callee, source },
            ..
        } => {
            assert_eq!(callee, "pair");
            assert!(matches!(*source, InstantiationError::ConflictingBinding { .. }));
        }
        other => panic!("expected Callee, got {:?}", other),
    }
}
