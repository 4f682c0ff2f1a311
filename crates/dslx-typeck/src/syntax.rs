//! Textual syntax for types and constraint expressions.
//!
//! Lets signatures and parametric declarations be written the way they read
//! in DSLX source:
//!
//! - types: `uN[N]`, `sN[M + 1]`, `bits[8]`, `u32`, `bool`, `uN[W][4]`,
//!   `(u8, sN[N])`, `fn(uN[N]) -> uN[N]`, `Point { x: uN[N], y: u4 }`, `Op`
//! - expressions: `M + u32:1`, `(A << 2) | B`, `clog2(N)`, `N > 0 && N <= 64`
//!
//! Struct and enum names resolve through a [`NominalScope`].

use dslx_common::{Span, SyntaxError, SyntaxErrorKind};
use rustc_hash::FxHashMap;

use crate::expr::{BinaryOp, ConstExpr, LiteralType, ParametricExpr, UnaryOp};
use crate::ty::{DefId, Dim, EnumRef, StructRef, Ty};

// ── Nominal Scope ──────────────────────────────────────────────────────

/// A declared enum: its identity plus its underlying bits type.
#[derive(Clone, Debug)]
struct EnumDecl {
    def: EnumRef,
    signed: bool,
    size: u64,
}

/// Struct and enum declarations visible to [`parse_type`].
///
/// Each declaration gets a fresh [`DefId`], so two declarations with the same
/// name are still different types.
#[derive(Clone, Debug, Default)]
pub struct NominalScope {
    structs: FxHashMap<String, StructRef>,
    enums: FxHashMap<String, EnumDecl>,
    next_def: u32,
}

impl NominalScope {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_def(&mut self) -> DefId {
        let def = DefId(self.next_def);
        self.next_def += 1;
        def
    }

    /// Declare a struct with the given field names, shadowing any earlier
    /// declaration of the same name.
    pub fn add_struct(&mut self, name: impl Into<String>, fields: Vec<String>) -> DefId {
        let name = name.into();
        let def = self.fresh_def();
        self.structs.insert(
            name.clone(),
            StructRef { def, name, fields },
        );
        def
    }

    /// Declare an enum over `uN[size]` (or `sN[size]` when `signed`).
    pub fn add_enum(&mut self, name: impl Into<String>, signed: bool, size: u64) -> DefId {
        let name = name.into();
        let def = self.fresh_def();
        self.enums.insert(
            name.clone(),
            EnumDecl {
                def: EnumRef { def, name },
                signed,
                size,
            },
        );
        def
    }

    pub fn struct_ref(&self, name: &str) -> Option<&StructRef> {
        self.structs.get(name)
    }

    /// The enum type declared under `name`.
    pub fn enum_ty(&self, name: &str) -> Option<Ty> {
        self.enums.get(name).map(|decl| Ty::Enum {
            def: decl.def.clone(),
            signed: decl.signed,
            size: Dim::Concrete(decl.size),
        })
    }
}

// ── Lexer ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
enum TokenKind {
    Ident(String),
    Int(u64),
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Arrow,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Shl,
    Shr,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Bang,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eof,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier `{}`", name),
            TokenKind::Int(n) => format!("number `{}`", n),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("`{}`", other.punct()),
        }
    }

    fn punct(&self) -> &'static str {
        match self {
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Arrow => "->",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::Amp => "&",
            TokenKind::AmpAmp => "&&",
            TokenKind::Pipe => "|",
            TokenKind::PipePipe => "||",
            TokenKind::Caret => "^",
            TokenKind::Bang => "!",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Ident(_) | TokenKind::Int(_) | TokenKind::Eof => "",
        }
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        Some(match self {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Rem,
            TokenKind::Shl => BinaryOp::Shl,
            TokenKind::Shr => BinaryOp::Shr,
            TokenKind::Amp => BinaryOp::BitAnd,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::Ge,
            TokenKind::AmpAmp => BinaryOp::And,
            TokenKind::PipePipe => BinaryOp::Or,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    span: Span,
}

/// Character cursor with byte positions.
struct Cursor<'src> {
    source: &'src str,
    pos: u32,
    chars: std::str::Chars<'src>,
}

impl<'src> Cursor<'src> {
    fn new(source: &'src str) -> Self {
        Cursor {
            source,
            pos: 0,
            chars: source.chars(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8() as u32;
        Some(c)
    }

    /// Consume the next character if it is `c`.
    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&predicate) {
            self.advance();
        }
    }

    fn slice(&self, start: u32) -> &'src str {
        &self.source[start as usize..self.pos as usize]
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();
    loop {
        cursor.eat_while(char::is_whitespace);
        let start = cursor.pos;
        let Some(c) = cursor.advance() else {
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::new(start, start),
            });
            return Ok(tokens);
        };
        let kind = match c {
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '-' if cursor.eat('>') => TokenKind::Arrow,
            '-' => TokenKind::Minus,
            '&' if cursor.eat('&') => TokenKind::AmpAmp,
            '&' => TokenKind::Amp,
            '|' if cursor.eat('|') => TokenKind::PipePipe,
            '|' => TokenKind::Pipe,
            '!' if cursor.eat('=') => TokenKind::NotEq,
            '!' => TokenKind::Bang,
            '=' if cursor.eat('=') => TokenKind::EqEq,
            '<' if cursor.eat('<') => TokenKind::Shl,
            '<' if cursor.eat('=') => TokenKind::LtEq,
            '<' => TokenKind::Lt,
            '>' if cursor.eat('>') => TokenKind::Shr,
            '>' if cursor.eat('=') => TokenKind::GtEq,
            '>' => TokenKind::Gt,
            c if c.is_ascii_digit() => {
                cursor.eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
                let text = cursor.slice(start);
                let value = parse_int(text).ok_or_else(|| {
                    SyntaxError::new(
                        SyntaxErrorKind::InvalidNumberLiteral(text.to_string()),
                        Span::new(start, cursor.pos),
                    )
                })?;
                TokenKind::Int(value)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                cursor.eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
                TokenKind::Ident(cursor.slice(start).to_string())
            }
            other => {
                return Err(SyntaxError::new(
                    SyntaxErrorKind::UnexpectedCharacter(other),
                    Span::new(start, cursor.pos),
                ))
            }
        };
        tokens.push(Token {
            kind,
            span: Span::new(start, cursor.pos),
        });
    }
}

/// Decimal, `0x` hex or `0b` binary, with optional `_` separators.
fn parse_int(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|&c| c != '_').collect();
    if let Some(hex) = digits.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = digits.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()
    } else {
        digits.parse().ok()
    }
}

/// `u8` → `(false, 8)`, `s32` → `(true, 32)`.
fn sized_bits_name(name: &str) -> Option<(bool, u64)> {
    let (signed, digits) = match name.split_at(1) {
        ("u", rest) => (false, rest),
        ("s", rest) => (true, rest),
        _ => return None,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|w| (signed, w))
}

// ── Parser ─────────────────────────────────────────────────────────────

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    scope: Option<&'a NominalScope>,
}

impl<'a> Parser<'a> {
    fn new(source: &str, scope: Option<&'a NominalScope>) -> Result<Self, SyntaxError> {
        Ok(Parser {
            tokens: tokenize(source)?,
            pos: 0,
            scope,
        })
    }

    fn peek(&self) -> &Token {
        // `tokenize` always ends with Eof and the parser never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error(&self, expected: &str) -> SyntaxError {
        let token = self.peek();
        let kind = match token.kind {
            TokenKind::Eof => SyntaxErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            },
            ref found => SyntaxErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: found.describe(),
            },
        };
        SyntaxError::new(kind, token.span)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if self.at(&kind) {
            Ok(self.bump())
        } else {
            Err(self.error(&kind.describe()))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Span), SyntaxError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let span = self.bump().span;
                Ok((name, span))
            }
            _ => Err(self.error(what)),
        }
    }

    fn finish(&self) -> Result<(), SyntaxError> {
        if self.at(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error("end of input"))
        }
    }

    // ── Types ──

    fn ty(&mut self) -> Result<Ty, SyntaxError> {
        let mut ty = self.ty_atom()?;
        while self.eat(&TokenKind::LBracket) {
            let size = self.dim()?;
            self.expect(TokenKind::RBracket)?;
            ty = Ty::Array {
                element: Box::new(ty),
                size,
            };
        }
        Ok(ty)
    }

    fn ty_atom(&mut self) -> Result<Ty, SyntaxError> {
        if self.eat(&TokenKind::LParen) {
            let members = self.comma_list(TokenKind::RParen, Self::ty)?;
            return Ok(Ty::tuple(members));
        }
        let (name, span) = self.expect_ident("a type")?;
        match name.as_str() {
            "uN" | "sN" | "bits" => {
                self.expect(TokenKind::LBracket)?;
                let size = self.dim()?;
                self.expect(TokenKind::RBracket)?;
                Ok(Ty::Bits {
                    signed: name == "sN",
                    size,
                })
            }
            "bool" => Ok(Ty::ubits(1)),
            "fn" => {
                self.expect(TokenKind::LParen)?;
                let params = self.comma_list(TokenKind::RParen, Self::ty)?;
                self.expect(TokenKind::Arrow)?;
                let ret = self.ty()?;
                Ok(Ty::fun(params, ret))
            }
            _ => {
                if let Some((signed, width)) = sized_bits_name(&name) {
                    return Ok(Ty::Bits {
                        signed,
                        size: Dim::Concrete(width),
                    });
                }
                self.nominal(name, span)
            }
        }
    }

    fn nominal(&mut self, name: String, span: Span) -> Result<Ty, SyntaxError> {
        let scope = self.scope;
        if let Some(ty) = scope.and_then(|s| s.enum_ty(&name)) {
            return Ok(ty);
        }
        let Some(def) = scope.and_then(|s| s.struct_ref(&name)) else {
            return Err(SyntaxError::new(SyntaxErrorKind::UnknownTypeName(name), span));
        };

        // `Point { x: T, y: U }`, fields in declaration order.
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::with_capacity(def.fields.len());
        for (i, field) in def.fields.iter().enumerate() {
            if i > 0 {
                self.expect(TokenKind::Comma)?;
            }
            match &self.peek().kind {
                TokenKind::Ident(found) if found == field => {
                    self.bump();
                }
                _ => return Err(self.error(&format!("field `{}`", field))),
            }
            self.expect(TokenKind::Colon)?;
            members.push(self.ty()?);
        }
        self.eat(&TokenKind::Comma);
        self.expect(TokenKind::RBrace)?;
        Ok(Ty::struct_ty(def.clone(), members))
    }

    /// Parse `item (, item)* ,? close`, the opening delimiter already consumed.
    fn comma_list<T>(
        &mut self,
        close: TokenKind,
        mut item: impl FnMut(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<Vec<T>, SyntaxError> {
        let mut items = Vec::new();
        while !self.at(&close) {
            items.push(item(self)?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    // ── Dimensions ──

    fn dim(&mut self) -> Result<Dim, SyntaxError> {
        let start = self.peek().span;
        let expr = self.dim_sum()?;
        if !expr.symbols().is_empty() {
            return Ok(Dim::Parametric(expr));
        }
        // Constant-fold `uN[2 * 4]` to `uN[8]`.
        let end = self.tokens[self.pos.saturating_sub(1)].span;
        expr.evaluate(&|_| None).map(Dim::Concrete).map_err(|_| {
            SyntaxError::new(
                SyntaxErrorKind::InvalidNumberLiteral(expr.to_string()),
                start.merge(end),
            )
        })
    }

    fn dim_sum(&mut self) -> Result<ParametricExpr, SyntaxError> {
        let mut lhs = self.dim_product()?;
        while self.eat(&TokenKind::Plus) {
            lhs = ParametricExpr::add(lhs, self.dim_product()?);
        }
        Ok(lhs)
    }

    fn dim_product(&mut self) -> Result<ParametricExpr, SyntaxError> {
        let mut lhs = self.dim_atom()?;
        while self.eat(&TokenKind::Star) {
            lhs = ParametricExpr::mul(lhs, self.dim_atom()?);
        }
        Ok(lhs)
    }

    fn dim_atom(&mut self) -> Result<ParametricExpr, SyntaxError> {
        match self.peek().kind.clone() {
            TokenKind::Int(n) => {
                self.bump();
                Ok(ParametricExpr::Constant(n))
            }
            TokenKind::Ident(name) => {
                self.bump();
                Ok(ParametricExpr::Symbol(name))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.dim_sum()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(self.error("a dimension")),
        }
    }

    // ── Expressions ──

    fn expr(&mut self, min_prec: u8) -> Result<ConstExpr, SyntaxError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek().kind.binary_op() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.expr(prec + 1)?;
            lhs = ConstExpr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<ConstExpr, SyntaxError> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.primary(),
        };
        self.bump();
        Ok(ConstExpr::Unary {
            op,
            operand: Box::new(self.unary()?),
        })
    }

    fn primary(&mut self) -> Result<ConstExpr, SyntaxError> {
        match self.peek().kind.clone() {
            TokenKind::Int(value) => {
                self.bump();
                Ok(ConstExpr::number(value))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.expr(0)?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                self.bump();
                match name.as_str() {
                    "true" | "false" => {
                        return Ok(ConstExpr::Number {
                            value: (name == "true") as u64,
                            ty: Some(LiteralType {
                                signed: false,
                                width: 1,
                            }),
                        })
                    }
                    _ => {}
                }
                // `u32:1`
                let typed = self.at(&TokenKind::Colon);
                if let Some((signed, width)) = sized_bits_name(&name).filter(|_| typed) {
                    self.bump();
                    let TokenKind::Int(value) = self.peek().kind else {
                        return Err(self.error("a number"));
                    };
                    let span = self.bump().span;
                    let width = u32::try_from(width).map_err(|_| {
                        SyntaxError::new(SyntaxErrorKind::InvalidNumberLiteral(name.clone()), span)
                    })?;
                    return Ok(ConstExpr::Number {
                        value,
                        ty: Some(LiteralType { signed, width }),
                    });
                }
                if self.eat(&TokenKind::LParen) {
                    let args = self.comma_list(TokenKind::RParen, |p| p.expr(0))?;
                    return Ok(ConstExpr::call(name, args));
                }
                Ok(ConstExpr::Name(name))
            }
            _ => Err(self.error("an expression")),
        }
    }
}

// ── Entry Points ───────────────────────────────────────────────────────

/// Parse a type. Struct and enum names are looked up in `scope`.
pub fn parse_type(text: &str, scope: &NominalScope) -> Result<Ty, SyntaxError> {
    let mut parser = Parser::new(text, Some(scope))?;
    let ty = parser.ty()?;
    parser.finish()?;
    Ok(ty)
}

/// Parse a constraint expression such as `M + u32:1`.
pub fn parse_expr(text: &str) -> Result<ConstExpr, SyntaxError> {
    let mut parser = Parser::new(text, None)?;
    let expr = parser.expr(0)?;
    parser.finish()?;
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(text: &str) -> Ty {
        parse_type(text, &NominalScope::new()).unwrap()
    }

    fn round_trip(text: &str) -> String {
        parse_expr(text).unwrap().to_string()
    }

    #[test]
    fn bits_forms() {
        assert_eq!(ty("uN[8]"), Ty::ubits(8));
        assert_eq!(ty("sN[N]"), Ty::bits_param(true, "N"));
        assert_eq!(ty("bits[3]"), Ty::ubits(3));
        assert_eq!(ty("u32"), Ty::ubits(32));
        assert_eq!(ty("s7"), Ty::sbits(7));
        assert_eq!(ty("bool"), Ty::ubits(1));
    }

    #[test]
    fn arrays_nest_left_to_right() {
        let t = ty("uN[8][2][3]");
        assert_eq!(t, Ty::array(Ty::array(Ty::ubits(8), 2), 3));
        assert_eq!(t.to_string(), "uN[8][2][3]");
    }

    #[test]
    fn dims_fold_constants_and_keep_symbols() {
        assert_eq!(ty("uN[2 * 4]"), Ty::ubits(8));
        assert_eq!(ty("uN[(N + 1) * M]").to_string(), "uN[(N + 1) * M]");
    }

    #[test]
    fn tuples_and_functions() {
        assert_eq!(ty("()"), Ty::tuple(vec![]));
        assert_eq!(ty("(u8,)"), Ty::tuple(vec![Ty::ubits(8)]));
        assert_eq!(
            ty("fn(uN[N], u8) -> uN[N]"),
            Ty::fun(
                vec![Ty::bits_param(false, "N"), Ty::ubits(8)],
                Ty::bits_param(false, "N")
            )
        );
    }

    #[test]
    fn structs_and_enums_resolve_through_scope() {
        let mut scope = NominalScope::new();
        let point = scope.add_struct("Point", vec!["x".into(), "y".into()]);
        let op = scope.add_enum("Op", false, 2);
        assert_ne!(point, op);

        let t = parse_type("Point { x: uN[N], y: u4 }", &scope).unwrap();
        assert_eq!(t.to_string(), "Point { x: uN[N], y: uN[4] }");
        assert_eq!(t.kind_name(), "struct");

        let e = parse_type("Op", &scope).unwrap();
        assert!(matches!(e, Ty::Enum { ref def, .. } if def.def == op));
    }

    #[test]
    fn struct_fields_must_follow_declaration() {
        let mut scope = NominalScope::new();
        scope.add_struct("Point", vec!["x".into(), "y".into()]);
        let err = parse_type("Point { y: u4, x: u4 }", &scope).unwrap_err();
        assert_eq!(err.to_string(), "expected field `x`, found identifier `y`");
    }

    #[test]
    fn unknown_type_names_are_errors() {
        let err = parse_type("Widget", &NominalScope::new()).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnknownTypeName("Widget".into()));
        assert_eq!(err.span, Span::new(0, 6));
    }

    #[test]
    fn trailing_input_is_rejected() {
        let err = parse_type("uN[8] u8", &NominalScope::new()).unwrap_err();
        assert!(matches!(err.kind, SyntaxErrorKind::UnexpectedToken { .. }));
        let err = parse_type("uN[8", &NominalScope::new()).unwrap_err();
        assert!(matches!(err.kind, SyntaxErrorKind::UnexpectedEof { .. }));
    }

    #[test]
    fn expression_precedence() {
        assert_eq!(round_trip("M + u32:1"), "M + u32:1");
        assert_eq!(round_trip("(M + 1) * 2"), "(M + 1) * 2");
        assert_eq!(round_trip("A - (B - C)"), "A - (B - C)");
        assert_eq!(round_trip("A << 2 | B & 1"), "A << 2 | B & 1");
        assert_eq!(round_trip("N > 0 && N <= 64"), "N > 0 && N <= 64");
        assert_eq!(round_trip("max(N, 0x10)"), "max(N, 16)");
    }

    #[test]
    fn expression_structure() {
        let e = parse_expr("A - B - C").unwrap();
        assert_eq!(
            e,
            ConstExpr::binary(
                BinaryOp::Sub,
                ConstExpr::binary(BinaryOp::Sub, ConstExpr::name("A"), ConstExpr::name("B")),
                ConstExpr::name("C"),
            )
        );
        assert_eq!(
            parse_expr("!true").unwrap(),
            ConstExpr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(ConstExpr::Number {
                    value: 1,
                    ty: Some(LiteralType {
                        signed: false,
                        width: 1
                    }),
                }),
            }
        );
    }

    #[test]
    fn lexer_errors_carry_spans() {
        let err = parse_expr("N @ 1").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnexpectedCharacter('@'));
        assert_eq!(err.span, Span::new(2, 3));

        let err = parse_expr("0xZZ").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::InvalidNumberLiteral("0xZZ".into()));
    }
}
