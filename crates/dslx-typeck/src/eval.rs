//! Constant evaluation of parametric expressions.
//!
//! The instantiator does not evaluate defining expressions itself; it asks a
//! [`ConstEvaluator`]. The evaluator signals "not enough bindings yet" with
//! the dedicated [`EvalError::NotYetResolvable`] variant, which the verifier
//! defers. Every other error is fatal.
//!
//! [`Interpreter`] is the default evaluator. It models values as bit vectors
//! of a known width and supports calls into registered constant functions,
//! which are themselves parametric: a call instantiates the callee against
//! the argument widths before evaluating its body.

use std::fmt;

use dslx_common::Span;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, trace};

use crate::env::{BindingEnv, ParametricBinding, SymbolicBindings, DEFAULT_PARAMETRIC_WIDTH};
use crate::error::InstantiationError;
use crate::expr::{BinaryOp, ConstExpr, UnaryOp};
use crate::instantiate::{instantiate_function, InstantiateCtx};
use crate::ty::{Dim, FunctionType, Ty};

/// Default bound on evaluator-triggered nested instantiation.
pub const DEFAULT_MAX_EVAL_DEPTH: u32 = 64;

/// Width given to literals with no width annotation and no typed partner.
const UNTYPED_WIDTH: u32 = 64;

/// Something the evaluator needed but the bindings do not provide yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unresolved {
    Identifier(String),
    CalleeBindings(String),
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unresolved::Identifier(name) => {
                write!(f, "Could not find bindings entry for identifier: {}", name)
            }
            Unresolved::CalleeBindings(name) => {
                write!(f, "Could not find callee bindings in type info for: {}", name)
            }
        }
    }
}

/// A constant evaluation failure.
#[derive(Clone, Debug, Error)]
pub enum EvalError {
    /// Insufficient bindings exist to evaluate the expression yet.
    #[error("{0}")]
    NotYetResolvable(Unresolved),
    #[error("division by zero in `{expr}`")]
    DivisionByZero { expr: String },
    #[error("`{callee}` expects {expected} argument(s), got {found}")]
    CallArity {
        callee: String,
        expected: usize,
        found: usize,
    },
    #[error("value of `{expr}` does not fit in a signed 64-bit integer")]
    Overflow { expr: String },
    #[error("nested instantiation of `{callee}` exceeds the depth limit of {limit}")]
    RecursionLimit { callee: String, limit: u32 },
    #[error("instantiating `{callee}` failed: {source}")]
    Callee {
        callee: String,
        #[source]
        source: Box<InstantiationError>,
    },
}

impl EvalError {
    /// Whether this error only means "try again once more is bound".
    pub fn is_benign(&self) -> bool {
        matches!(self, EvalError::NotYetResolvable(_))
    }
}

/// The function whose body contains the instantiation being evaluated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FnCtx {
    pub module: String,
    pub function: String,
    /// Number of evaluator-triggered instantiations enclosing this one.
    pub depth: u32,
}

impl FnCtx {
    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Self {
        FnCtx {
            module: module.into(),
            function: function.into(),
            depth: 0,
        }
    }

    /// The context for an instantiation nested inside this one.
    pub fn nested(&self, function: &str) -> FnCtx {
        FnCtx {
            module: self.module.clone(),
            function: function.to_string(),
            depth: self.depth + 1,
        }
    }
}

/// Evaluates constraint expressions against the current bindings.
pub trait ConstEvaluator {
    /// Evaluate `expr`, reading parametric values and declared widths from `env`.
    fn evaluate(&self, expr: &ConstExpr, env: &BindingEnv, fn_ctx: &FnCtx) -> Result<i64, EvalError>;
}

/// Tunables for [`Interpreter`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EvalOptions {
    pub max_depth: u32,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            max_depth: DEFAULT_MAX_EVAL_DEPTH,
        }
    }
}

/// A constant function callable from constraint expressions, e.g.
/// `fn double<W: u32>(x: uN[W]) -> uN[W] { x + x }`.
#[derive(Clone, Debug)]
pub struct ConstFn {
    pub name: String,
    pub parametrics: Vec<ParametricBinding>,
    pub params: Vec<(String, Ty)>,
    pub ret: Ty,
    pub body: ConstExpr,
}

impl ConstFn {
    pub fn signature(&self) -> FunctionType {
        FunctionType::new(
            self.params.iter().map(|(_, ty)| ty.clone()).collect(),
            self.ret.clone(),
        )
    }
}

/// A bit-vector value. `width` is `None` for an untyped literal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Value {
    bits: u64,
    width: Option<u32>,
    signed: bool,
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

impl Value {
    fn new(bits: u64, width: Option<u32>, signed: bool) -> Self {
        let bits = bits & mask(width.unwrap_or(UNTYPED_WIDTH));
        Value {
            bits,
            width,
            signed,
        }
    }

    fn bool(b: bool) -> Self {
        Value::new(b as u64, Some(1), false)
    }

    fn effective_width(&self) -> u32 {
        self.width.unwrap_or(UNTYPED_WIDTH)
    }

    /// The value as a signed 64-bit integer (sign-extended when signed).
    fn as_i64(&self) -> Option<i64> {
        if self.signed {
            Some(sign_extend(self.bits, self.effective_width()))
        } else {
            i64::try_from(self.bits).ok()
        }
    }

    fn is_true(&self) -> bool {
        self.bits != 0
    }
}

/// One frame of name → value.
type Frame = FxHashMap<String, Value>;

/// The default [`ConstEvaluator`].
#[derive(Clone, Debug, Default)]
pub struct Interpreter {
    functions: FxHashMap<String, ConstFn>,
    options: EvalOptions,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: EvalOptions) -> Self {
        Interpreter {
            functions: FxHashMap::default(),
            options,
        }
    }

    /// Register a constant function under its name.
    pub fn register(&mut self, function: ConstFn) {
        self.functions.insert(function.name.clone(), function);
    }

    pub fn options(&self) -> EvalOptions {
        self.options
    }

    fn eval(&self, expr: &ConstExpr, frame: &Frame, fn_ctx: &FnCtx) -> Result<Value, EvalError> {
        match expr {
            ConstExpr::Number { value, ty } => Ok(match ty {
                Some(lit) => Value::new(*value, Some(lit.width), lit.signed),
                None => Value::new(*value, None, false),
            }),
            ConstExpr::Name(name) => frame
                .get(name)
                .copied()
                .ok_or_else(|| EvalError::NotYetResolvable(Unresolved::Identifier(name.clone()))),
            ConstExpr::Unary { op, operand } => {
                let v = self.eval(operand, frame, fn_ctx)?;
                let bits = match op {
                    UnaryOp::Neg => v.bits.wrapping_neg(),
                    UnaryOp::Not => !v.bits,
                };
                Ok(Value::new(bits, v.width, v.signed))
            }
            ConstExpr::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs, frame, fn_ctx)?;
                // Short-circuit the logical operators.
                match op {
                    BinaryOp::And if !l.is_true() => return Ok(Value::bool(false)),
                    BinaryOp::Or if l.is_true() => return Ok(Value::bool(true)),
                    _ => {}
                }
                let r = self.eval(rhs, frame, fn_ctx)?;
                binary(*op, l, r, expr)
            }
            ConstExpr::Call { callee, args } => self.call(callee, args, frame, fn_ctx),
        }
    }

    fn call(
        &self,
        callee: &str,
        args: &[ConstExpr],
        frame: &Frame,
        fn_ctx: &FnCtx,
    ) -> Result<Value, EvalError> {
        let function = self
            .functions
            .get(callee)
            .ok_or_else(|| EvalError::NotYetResolvable(Unresolved::CalleeBindings(callee.to_string())))?;
        if function.params.len() != args.len() {
            return Err(EvalError::CallArity {
                callee: callee.to_string(),
                expected: function.params.len(),
                found: args.len(),
            });
        }
        if fn_ctx.depth >= self.options.max_depth {
            return Err(EvalError::RecursionLimit {
                callee: callee.to_string(),
                limit: self.options.max_depth,
            });
        }

        let values = args
            .iter()
            .map(|a| self.eval(a, frame, fn_ctx))
            .collect::<Result<Vec<_>, _>>()?;

        // Untyped literal arguments take the width of a concrete formal.
        let arg_types: Vec<Ty> = values
            .iter()
            .zip(&function.params)
            .map(|(v, (_, formal))| {
                let width = match (v.width, formal) {
                    (Some(w), _) => w as u64,
                    (None, Ty::Bits { size: Dim::Concrete(w), .. }) => *w,
                    (None, _) => DEFAULT_PARAMETRIC_WIDTH as u64,
                };
                Ty::Bits {
                    signed: v.signed,
                    size: Dim::Concrete(width),
                }
            })
            .collect();

        let nested = fn_ctx.nested(callee);
        debug!(callee, depth = nested.depth, "instantiating constant function");
        let signature = function.signature();
        let ctx = InstantiateCtx::new(self, nested.clone());
        let instantiated = instantiate_function(
            Span::default(),
            &signature,
            &arg_types,
            &ctx,
            Some(&function.parametrics),
            None,
        )
        .map_err(|e| EvalError::Callee {
            callee: callee.to_string(),
            source: Box::new(e),
        })?;

        let mut body_frame = callee_frame(&instantiated.bindings, &function.parametrics);
        for ((name, _), (value, ty)) in function.params.iter().zip(values.iter().zip(&arg_types)) {
            let width = ty_width(ty);
            body_frame.insert(name.clone(), Value::new(value.bits, width, value.signed));
        }
        let result = self.eval(&function.body, &body_frame, &nested)?;
        Ok(match &instantiated.ty {
            Ty::Bits { signed, size } => Value::new(result.bits, size.as_concrete().map(|w| w as u32), *signed),
            _ => result,
        })
    }
}

fn ty_width(ty: &Ty) -> Option<u32> {
    match ty {
        Ty::Bits { size, .. } => size.as_concrete().map(|w| w as u32),
        _ => None,
    }
}

fn callee_frame(bindings: &SymbolicBindings, parametrics: &[ParametricBinding]) -> Frame {
    bindings
        .iter()
        .map(|(name, value)| {
            let width = parametrics
                .iter()
                .find(|p| p.name == name)
                .map_or(DEFAULT_PARAMETRIC_WIDTH, |p| p.width);
            (name.to_string(), Value::new(value as u64, Some(width), false))
        })
        .collect()
}

fn binary(op: BinaryOp, l: Value, r: Value, expr: &ConstExpr) -> Result<Value, EvalError> {
    let width = match (l.width, r.width) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (Some(a), None) | (None, Some(a)) => Some(a),
        (None, None) => None,
    };
    let signed = l.signed || r.signed;
    let w = width.unwrap_or(UNTYPED_WIDTH);
    let operand = |v: Value| Value::new(v.bits, width, signed);
    let (a, b) = (operand(l), operand(r));
    let (sa, sb) = (sign_extend(a.bits, w), sign_extend(b.bits, w));

    if op.is_comparison() {
        let ord = if signed { sa.cmp(&sb) } else { a.bits.cmp(&b.bits) };
        return Ok(Value::bool(match op {
            BinaryOp::Eq => ord.is_eq(),
            BinaryOp::Ne => ord.is_ne(),
            BinaryOp::Lt => ord.is_lt(),
            BinaryOp::Le => ord.is_le(),
            BinaryOp::Gt => ord.is_gt(),
            _ => ord.is_ge(),
        }));
    }

    let bits = match op {
        BinaryOp::Add => a.bits.wrapping_add(b.bits),
        BinaryOp::Sub => a.bits.wrapping_sub(b.bits),
        BinaryOp::Mul => a.bits.wrapping_mul(b.bits),
        BinaryOp::Div | BinaryOp::Rem if b.bits == 0 => {
            return Err(EvalError::DivisionByZero {
                expr: expr.to_string(),
            })
        }
        BinaryOp::Div if signed => sa.wrapping_div(sb) as u64,
        BinaryOp::Div => a.bits / b.bits,
        BinaryOp::Rem if signed => sa.wrapping_rem(sb) as u64,
        BinaryOp::Rem => a.bits % b.bits,
        // Shifts keep the left operand's type.
        BinaryOp::Shl => {
            let lw = u64::from(l.effective_width());
            // Values are held in 64 bits; a wider result that keeps set bits
            // past bit 63 cannot be represented.
            let bits = if r.bits >= lw || l.bits == 0 {
                0
            } else if r.bits >= 64 || (lw > 64 && u64::from(l.bits.leading_zeros()) < r.bits) {
                return Err(EvalError::Overflow {
                    expr: expr.to_string(),
                });
            } else {
                l.bits << r.bits
            };
            return Ok(Value::new(bits, l.width, l.signed));
        }
        BinaryOp::Shr => {
            let lw = l.effective_width();
            let bits = if l.signed {
                let s = sign_extend(l.bits, lw);
                (s >> r.bits.min(63)) as u64
            } else if r.bits >= u64::from(lw.min(64)) {
                0
            } else {
                l.bits >> r.bits
            };
            return Ok(Value::new(bits, l.width, l.signed));
        }
        BinaryOp::BitAnd => a.bits & b.bits,
        BinaryOp::BitXor => a.bits ^ b.bits,
        BinaryOp::BitOr => a.bits | b.bits,
        BinaryOp::And => return Ok(Value::bool(a.is_true() && b.is_true())),
        BinaryOp::Or => return Ok(Value::bool(a.is_true() || b.is_true())),
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            unreachable!("comparisons are handled above")
        }
    };
    Ok(Value::new(bits, width, signed))
}

fn sign_extend(bits: u64, width: u32) -> i64 {
    if width == 0 {
        0
    } else if width >= 64 {
        bits as i64
    } else if (bits >> (width - 1)) & 1 == 1 {
        (bits | !mask(width)) as i64
    } else {
        bits as i64
    }
}

impl ConstEvaluator for Interpreter {
    fn evaluate(&self, expr: &ConstExpr, env: &BindingEnv, fn_ctx: &FnCtx) -> Result<i64, EvalError> {
        let frame: Frame = env
            .bindings()
            .map(|(name, value)| {
                let width = env.bit_width(name).unwrap_or(DEFAULT_PARAMETRIC_WIDTH);
                (name.to_string(), Value::new(value as u64, Some(width), false))
            })
            .collect();
        let value = self.eval(expr, &frame, fn_ctx)?;
        trace!(%expr, bits = value.bits, "evaluated constant expression");
        value.as_i64().ok_or_else(|| EvalError::Overflow {
            expr: expr.to_string(),
        })
    }
}
