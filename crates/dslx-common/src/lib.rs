//! Shared types for the DSLX front end.
//!
//! - [`span`]: byte-offset spans and on-demand line/column lookup
//! - [`error`]: errors produced while reading the textual type and
//!   expression syntax

pub mod error;
pub mod span;

pub use error::{SyntaxError, SyntaxErrorKind};
pub use span::{LineIndex, Span};
