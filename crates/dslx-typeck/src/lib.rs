//! DSLX parametric instantiation.
//!
//! Given the signature of a parametric function (or the member types of a
//! parametric struct) and the concrete types supplied at one use site, this
//! crate infers a value for every parametric, checks the declared constraints,
//! and produces the concrete result type together with the final bindings.
//!
//! ```text
//! fn add<N: u32>(x: uN[N], y: uN[N]) -> uN[N]      add(u8:1, u8:2)
//!                       bind: N = 8  ──────────────▶  uN[8]
//! ```
//!
//! # Architecture
//!
//! - [`ty`]: Type algebra (`Ty`, `Dim`, nominal struct/enum references)
//! - [`expr`]: Symbolic dimensions and constraint expressions
//! - [`env`]: The per-instantiation binding environment
//! - [`bind`]: Symbolic binding of formal types against actual types
//! - [`verify`]: Constraint verification in declaration order
//! - [`resolve`]: Substitution of bindings into type templates
//! - [`eval`]: The constant evaluator seam and its default interpreter
//! - [`instantiate`]: Function and struct instantiators
//! - [`error`]: Instantiation error types
//! - [`diagnostics`]: Ariadne and JSON rendering of errors
//! - [`syntax`]: Textual types and expressions

pub mod bind;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod eval;
pub mod expr;
pub mod instantiate;
pub mod resolve;
pub mod syntax;
pub mod ty;
pub mod verify;

pub use env::{BindingEnv, BindingOrigin, ParametricBinding, SymbolicBindings};
pub use error::InstantiationError;
pub use eval::{ConstEvaluator, ConstFn, EvalError, EvalOptions, FnCtx, Interpreter};
pub use instantiate::{instantiate_function, instantiate_struct, InstantiateCtx, TypeAndBindings};
pub use ty::{Dim, FunctionType, Ty};
