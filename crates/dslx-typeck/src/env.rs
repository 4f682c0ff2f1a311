//! The binding environment threaded through one instantiation.
//!
//! `BindingEnv` gathers everything the binder, verifier and resolver share:
//! the declared parametrics (in declaration order, with their bit widths and
//! optional constraint expressions) and the bindings discovered so far.
//! Bindings are append-only: a name, once bound, keeps its value for the rest
//! of the instantiation.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::expr::ConstExpr;

/// Bit width assumed for a parametric with no declaration, e.g. one pinned
/// only through explicit bindings.
pub const DEFAULT_PARAMETRIC_WIDTH: u32 = 32;

/// A declared parametric: `N: u32` or `N: u32 = {M + u32:1}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParametricBinding {
    pub name: String,
    /// Width of the integer holding the parametric's value.
    pub width: u32,
    /// The defining/constraint expression, if any.
    pub expr: Option<ConstExpr>,
}

impl ParametricBinding {
    pub fn new(name: impl Into<String>, width: u32) -> Self {
        ParametricBinding {
            name: name.into(),
            width,
            expr: None,
        }
    }

    pub fn with_expr(name: impl Into<String>, width: u32, expr: ConstExpr) -> Self {
        ParametricBinding {
            name: name.into(),
            width,
            expr: Some(expr),
        }
    }
}

impl fmt::Display for ParametricBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: u{}", self.name, self.width)?;
        if let Some(expr) = &self.expr {
            write!(f, " = {{{}}}", expr)?;
        }
        Ok(())
    }
}

/// Final parametric values of one instantiation, ordered by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SymbolicBindings(BTreeMap<String, i64>);

impl SymbolicBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for SymbolicBindings {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        SymbolicBindings(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for SymbolicBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}}")
    }
}

/// Where a binding's value was first observed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BindingOrigin {
    /// Pinned by the caller before inference (explicit instantiation).
    Explicit,
    /// Derived from the argument (or struct member) at this index.
    Argument(usize),
    /// Installed from the parametric's own defining expression.
    Constraint,
}

impl fmt::Display for BindingOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingOrigin::Explicit => write!(f, "explicit instantiation"),
            BindingOrigin::Argument(i) => write!(f, "argument {}", i),
            BindingOrigin::Constraint => write!(f, "parametric expression"),
        }
    }
}

/// Declarations plus discovered bindings for a single instantiation.
#[derive(Clone, Debug, Default)]
pub struct BindingEnv {
    /// Declared parametric names, in declaration order.
    order: Vec<String>,
    bit_widths: FxHashMap<String, u32>,
    constraints: FxHashMap<String, ConstExpr>,
    bindings: FxHashMap<String, i64>,
    origins: FxHashMap<String, BindingOrigin>,
    /// Incremented on every installed binding.
    generation: u32,
}

impl BindingEnv {
    /// Build an environment from the declared parametrics, then seed it with
    /// any caller-pinned values.
    pub fn new(
        parametrics: Option<&[ParametricBinding]>,
        explicit: Option<&SymbolicBindings>,
    ) -> Self {
        let mut env = BindingEnv::default();
        for binding in parametrics.unwrap_or_default() {
            env.order.push(binding.name.clone());
            env.bit_widths.insert(binding.name.clone(), binding.width);
            if let Some(expr) = &binding.expr {
                env.constraints.insert(binding.name.clone(), expr.clone());
            }
        }
        if let Some(explicit) = explicit {
            for (name, value) in explicit.iter() {
                env.install(name, value, BindingOrigin::Explicit);
            }
        }
        env
    }

    /// Declared parametric names, in declaration order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.bindings.get(name).copied()
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn origin(&self, name: &str) -> Option<BindingOrigin> {
        self.origins.get(name).copied()
    }

    pub fn bit_width(&self, name: &str) -> Option<u32> {
        self.bit_widths.get(name).copied()
    }

    pub fn constraint(&self, name: &str) -> Option<&ConstExpr> {
        self.constraints.get(name)
    }

    /// Number of bindings installed so far; changes whenever the bindings do.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Current bindings, for evaluators that need to enumerate them.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.bindings.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Record a new binding.
    ///
    /// Callers must check for an existing binding first: a bound name is
    /// never overwritten.
    pub fn install(&mut self, name: &str, value: i64, origin: BindingOrigin) {
        debug_assert!(
            !self.bindings.contains_key(name),
            "parametric `{name}` is already bound"
        );
        tracing::trace!(name, value, %origin, "installing parametric binding");
        self.bindings.insert(name.to_string(), value);
        self.origins.insert(name.to_string(), origin);
        self.generation += 1;
    }

    /// Snapshot the bindings as the result map.
    pub fn to_symbolic_bindings(&self) -> SymbolicBindings {
        self.bindings()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, ConstExpr};

    fn decls() -> Vec<ParametricBinding> {
        vec![
            ParametricBinding::new("M", 32),
            ParametricBinding::with_expr(
                "N",
                16,
                ConstExpr::binary(BinaryOp::Add, ConstExpr::name("M"), ConstExpr::unsigned(32, 1)),
            ),
        ]
    }

    #[test]
    fn declarations_keep_order_widths_and_constraints() {
        let decls = decls();
        let env = BindingEnv::new(Some(&decls), None);
        assert_eq!(env.order(), &["M".to_string(), "N".to_string()]);
        assert_eq!(env.bit_width("N"), Some(16));
        assert!(env.constraint("M").is_none());
        assert_eq!(env.constraint("N").unwrap().to_string(), "M + u32:1");
        assert_eq!(env.generation(), 0);
    }

    #[test]
    fn explicit_values_are_seeded() {
        let explicit: SymbolicBindings = [("N", 16)].into_iter().collect();
        let env = BindingEnv::new(None, Some(&explicit));
        assert_eq!(env.get("N"), Some(16));
        assert_eq!(env.origin("N"), Some(BindingOrigin::Explicit));
        assert_eq!(env.generation(), 1);
    }

    #[test]
    fn install_bumps_generation() {
        let mut env = BindingEnv::new(None, None);
        env.install("N", 8, BindingOrigin::Argument(0));
        env.install("M", 9, BindingOrigin::Constraint);
        assert_eq!(env.generation(), 2);
        assert_eq!(env.to_symbolic_bindings().to_string(), "{M: 9, N: 8}");
    }

    #[test]
    #[should_panic(expected = "already bound")]
    fn install_twice_panics_in_debug() {
        let mut env = BindingEnv::new(None, None);
        env.install("N", 8, BindingOrigin::Argument(0));
        env.install("N", 8, BindingOrigin::Argument(1));
    }

    #[test]
    fn parametric_binding_display() {
        let decls = decls();
        assert_eq!(decls[0].to_string(), "M: u32");
        assert_eq!(decls[1].to_string(), "N: u16 = {M + u32:1}");
    }
}
