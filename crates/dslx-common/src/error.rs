use thiserror::Error;

use crate::span::Span;

/// An error encountered while reading a textual type or expression.
///
/// Carries the kind and the byte range of the offending input.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The specific kind of syntax error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxErrorKind {
    #[error("unexpected character: {0:?}")]
    UnexpectedCharacter(char),
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("expected {expected}, found end of input")]
    UnexpectedEof { expected: String },
    #[error("invalid number literal: {0}")]
    InvalidNumberLiteral(String),
    #[error("unknown type name: {0}")]
    UnknownTypeName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let err = SyntaxError::new(SyntaxErrorKind::UnexpectedCharacter('@'), Span::new(0, 1));
        assert_eq!(err.to_string(), "unexpected character: '@'");
    }

    #[test]
    fn syntax_error_kind_display() {
        assert_eq!(
            SyntaxErrorKind::UnexpectedToken {
                expected: "`]`".into(),
                found: "`,`".into()
            }
            .to_string(),
            "expected `]`, found `,`"
        );
        assert_eq!(
            SyntaxErrorKind::UnexpectedEof { expected: "a type".into() }.to_string(),
            "expected a type, found end of input"
        );
        assert_eq!(
            SyntaxErrorKind::UnknownTypeName("Point".into()).to_string(),
            "unknown type name: Point"
        );
    }
}
