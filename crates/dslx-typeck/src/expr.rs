//! Expressions over parametric names.
//!
//! Two small trees live here:
//!
//! - [`ParametricExpr`]: the symbolic form of a dimension (`N`, `N + 1`,
//!   `M * 8`), evaluated by the resolver.
//! - [`ConstExpr`]: a parametric's defining/constraint expression
//!   (`N + u32:1`, `clog2(M)`), evaluated by a [`crate::eval::ConstEvaluator`].

use std::fmt;

use thiserror::Error;

/// A symbolic dimension.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParametricExpr {
    Symbol(String),
    Constant(u64),
    Add(Box<ParametricExpr>, Box<ParametricExpr>),
    Mul(Box<ParametricExpr>, Box<ParametricExpr>),
}

/// Why a dimension could not be evaluated to a size.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DimEvalError {
    #[error("parametric `{0}` is not bound")]
    Unbound(String),
    #[error("parametric `{name}` is bound to negative value {value}")]
    Negative { name: String, value: i64 },
    #[error("dimension overflows a 64-bit size")]
    Overflow,
}

impl ParametricExpr {
    pub fn symbol(name: impl Into<String>) -> Self {
        ParametricExpr::Symbol(name.into())
    }

    pub fn add(lhs: ParametricExpr, rhs: ParametricExpr) -> Self {
        ParametricExpr::Add(Box::new(lhs), Box::new(rhs))
    }

    pub fn mul(lhs: ParametricExpr, rhs: ParametricExpr) -> Self {
        ParametricExpr::Mul(Box::new(lhs), Box::new(rhs))
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            ParametricExpr::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Names referenced by this expression, left to right (may repeat).
    pub fn symbols(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ParametricExpr::Symbol(name) => out.push(name),
            ParametricExpr::Constant(_) => {}
            ParametricExpr::Add(l, r) | ParametricExpr::Mul(l, r) => {
                l.collect_symbols(out);
                r.collect_symbols(out);
            }
        }
    }

    /// Evaluate fully against `lookup`, which yields the bound value of a name.
    pub fn evaluate(&self, lookup: &impl Fn(&str) -> Option<i64>) -> Result<u64, DimEvalError> {
        match self {
            ParametricExpr::Symbol(name) => {
                let value = lookup(name).ok_or_else(|| DimEvalError::Unbound(name.clone()))?;
                u64::try_from(value).map_err(|_| DimEvalError::Negative {
                    name: name.clone(),
                    value,
                })
            }
            ParametricExpr::Constant(n) => Ok(*n),
            ParametricExpr::Add(l, r) => l
                .evaluate(lookup)?
                .checked_add(r.evaluate(lookup)?)
                .ok_or(DimEvalError::Overflow),
            ParametricExpr::Mul(l, r) => l
                .evaluate(lookup)?
                .checked_mul(r.evaluate(lookup)?)
                .ok_or(DimEvalError::Overflow),
        }
    }
}

impl fmt::Display for ParametricExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParametricExpr::Symbol(name) => write!(f, "{}", name),
            ParametricExpr::Constant(n) => write!(f, "{}", n),
            ParametricExpr::Add(l, r) => write!(f, "{} + {}", l, r),
            ParametricExpr::Mul(l, r) => {
                let wrap = |e: &ParametricExpr| match e {
                    ParametricExpr::Add(..) => format!("({})", e),
                    _ => e.to_string(),
                };
                write!(f, "{} * {}", wrap(l), wrap(r))
            }
        }
    }
}

// ── Constraint expressions ─────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Binding power; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 3,
            BinaryOp::BitOr => 4,
            BinaryOp::BitXor => 5,
            BinaryOp::BitAnd => 6,
            BinaryOp::Shl | BinaryOp::Shr => 7,
            BinaryOp::Add | BinaryOp::Sub => 8,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 9,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 3
    }
}

/// Width annotation on a literal, e.g. the `u32` in `u32:1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LiteralType {
    pub signed: bool,
    pub width: u32,
}

/// A defining or constraint expression attached to a parametric binding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstExpr {
    Number {
        value: u64,
        ty: Option<LiteralType>,
    },
    Name(String),
    Unary {
        op: UnaryOp,
        operand: Box<ConstExpr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<ConstExpr>,
        rhs: Box<ConstExpr>,
    },
    Call {
        callee: String,
        args: Vec<ConstExpr>,
    },
}

impl ConstExpr {
    /// An untyped literal.
    pub fn number(value: u64) -> Self {
        ConstExpr::Number { value, ty: None }
    }

    /// An unsigned literal of the given width, rendered as `uW:value`.
    pub fn unsigned(width: u32, value: u64) -> Self {
        ConstExpr::Number {
            value,
            ty: Some(LiteralType {
                signed: false,
                width,
            }),
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        ConstExpr::Name(name.into())
    }

    pub fn binary(op: BinaryOp, lhs: ConstExpr, rhs: ConstExpr) -> Self {
        ConstExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn call(callee: impl Into<String>, args: Vec<ConstExpr>) -> Self {
        ConstExpr::Call {
            callee: callee.into(),
            args,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            ConstExpr::Binary { op, .. } => op.precedence(),
            ConstExpr::Unary { .. } => 10,
            _ => 11,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for ConstExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstExpr::Number { value, ty: None } => write!(f, "{}", value),
            ConstExpr::Number {
                value,
                ty: Some(lit),
            } => write!(
                f,
                "{}{}:{}",
                if lit.signed { "s" } else { "u" },
                lit.width,
                value
            ),
            ConstExpr::Name(name) => write!(f, "{}", name),
            ConstExpr::Unary { op, operand } => {
                write!(f, "{}", if *op == UnaryOp::Neg { "-" } else { "!" })?;
                operand.fmt_operand(f, 10)
            }
            ConstExpr::Binary { op, lhs, rhs } => {
                // Left-associative: the right operand needs parens at equal precedence.
                let p = op.precedence();
                lhs.fmt_operand(f, p)?;
                write!(f, " {} ", op.symbol())?;
                rhs.fmt_operand(f, p + 1)
            }
            ConstExpr::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<i64> {
        match name {
            "N" => Some(8),
            "M" => Some(3),
            "NEG" => Some(-1),
            _ => None,
        }
    }

    #[test]
    fn evaluate_compound_dimension() {
        let e = ParametricExpr::mul(
            ParametricExpr::add(ParametricExpr::symbol("N"), ParametricExpr::Constant(1)),
            ParametricExpr::symbol("M"),
        );
        assert_eq!(e.evaluate(&lookup), Ok(27));
        assert_eq!(e.to_string(), "(N + 1) * M");
        assert_eq!(e.symbols(), vec!["N", "M"]);
    }

    #[test]
    fn evaluate_reports_unbound_and_negative() {
        assert_eq!(
            ParametricExpr::symbol("Q").evaluate(&lookup),
            Err(DimEvalError::Unbound("Q".into()))
        );
        assert_eq!(
            ParametricExpr::symbol("NEG").evaluate(&lookup),
            Err(DimEvalError::Negative {
                name: "NEG".into(),
                value: -1
            })
        );
        let big = ParametricExpr::mul(
            ParametricExpr::Constant(u64::MAX),
            ParametricExpr::Constant(2),
        );
        assert_eq!(big.evaluate(&lookup), Err(DimEvalError::Overflow));
    }

    #[test]
    fn const_expr_display_respects_precedence() {
        let e = ConstExpr::binary(
            BinaryOp::Mul,
            ConstExpr::binary(BinaryOp::Add, ConstExpr::name("M"), ConstExpr::unsigned(32, 1)),
            ConstExpr::number(2),
        );
        assert_eq!(e.to_string(), "(M + u32:1) * 2");

        let e = ConstExpr::binary(
            BinaryOp::Sub,
            ConstExpr::name("A"),
            ConstExpr::binary(BinaryOp::Sub, ConstExpr::name("B"), ConstExpr::name("C")),
        );
        assert_eq!(e.to_string(), "A - (B - C)");
    }

    #[test]
    fn const_expr_display_call() {
        let e = ConstExpr::call("max", vec![ConstExpr::name("N"), ConstExpr::number(4)]);
        assert_eq!(e.to_string(), "max(N, 4)");
    }
}
