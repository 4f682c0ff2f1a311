//! Ariadne-based diagnostic rendering for instantiation errors.
//!
//! Each error renders as one report anchored at the invocation span, with a
//! short label, an optional note and an optional help line. JSON mode emits
//! the same information as a single-line object for tooling.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use dslx_common::LineIndex;
use serde::Serialize;

use crate::error::InstantiationError;
use crate::eval::EvalError;

// ── Options ────────────────────────────────────────────────────────────

/// How diagnostics are rendered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticOptions {
    /// Emit ANSI colors in human-readable output.
    pub color: bool,
    /// Emit one JSON object per diagnostic instead of an ariadne report.
    pub json: bool,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions {
            color: true,
            json: false,
        }
    }
}

impl DiagnosticOptions {
    /// Plain text, for snapshots and non-terminal output.
    pub fn colorless() -> Self {
        DiagnosticOptions {
            color: false,
            json: false,
        }
    }

    pub fn json_mode() -> Self {
        DiagnosticOptions {
            color: false,
            json: true,
        }
    }
}

// ── Error Codes ────────────────────────────────────────────────────────

/// Stable code for each error variant.
pub fn error_code(err: &InstantiationError) -> &'static str {
    match err {
        InstantiationError::ArgCountMismatch { .. } => "P0001",
        InstantiationError::KindMismatch { .. } => "P0002",
        InstantiationError::NominalMismatch { .. } => "P0003",
        InstantiationError::ArityMismatch { .. } => "P0004",
        InstantiationError::ConflictingBinding { .. } => "P0005",
        InstantiationError::ConstraintViolation { .. } => "P0006",
        InstantiationError::TypeMismatch { .. } => "P0007",
        InstantiationError::UnboundParametric { .. } => "P0008",
        InstantiationError::InvalidDimension { .. } => "P0009",
        InstantiationError::NonConcreteArgument { .. } => "P0010",
        InstantiationError::Unimplemented { .. } => "P0011",
        InstantiationError::Evaluation { .. } => "P0012",
        InstantiationError::Internal { .. } => "P0013",
    }
}

// ── Labels and Help ────────────────────────────────────────────────────

/// The short text attached to the primary span.
fn label_message(err: &InstantiationError) -> String {
    match err {
        InstantiationError::ArgCountMismatch {
            expected, found, ..
        } => format!("{} argument(s) supplied, {} expected", found, expected),
        InstantiationError::KindMismatch {
            arg_index,
            formal_kind,
            actual_kind,
            ..
        } => format!(
            "argument {} is {} {}, parameter expects {} {}",
            arg_index,
            article(actual_kind),
            actual_kind,
            article(formal_kind),
            formal_kind
        ),
        InstantiationError::NominalMismatch {
            arg_index, actual, ..
        } => format!("argument {} has type {}", arg_index, actual),
        InstantiationError::ArityMismatch {
            arg_index, found, ..
        } => format!("argument {} has {} member(s)", arg_index, found),
        InstantiationError::ConflictingBinding { name, second, .. } => {
            format!("`{}` would be {} here", name, second)
        }
        InstantiationError::ConstraintViolation { name, value, .. } => {
            format!("`{}` must be {}", name, value)
        }
        InstantiationError::TypeMismatch {
            arg_index,
            expected,
            ..
        } => format!("argument {} should be {}", arg_index, expected),
        InstantiationError::UnboundParametric { name, .. } => {
            format!("`{}` is never bound", name)
        }
        InstantiationError::InvalidDimension { dim, .. } => {
            format!("`{}` is not a valid size", dim)
        }
        InstantiationError::NonConcreteArgument { arg_index, ty, .. } => {
            format!("argument {} has type {}", arg_index, ty)
        }
        InstantiationError::Unimplemented { feature, .. } => format!("{} needed here", feature),
        InstantiationError::Internal { .. } => "while instantiating here".to_string(),
        InstantiationError::Evaluation { .. } => "while evaluating parametric constraints".to_string(),
    }
}

fn article(kind: &str) -> &'static str {
    match kind.as_bytes().first() {
        Some(b'a' | b'e' | b'i' | b'o' | b'u') => "an",
        _ => "a",
    }
}

/// Context that does not fit in the label.
fn note(err: &InstantiationError) -> Option<String> {
    match err {
        InstantiationError::ConflictingBinding {
            name,
            first_origin,
            formal,
            actual,
            ..
        } => Some(format!(
            "`{}` was first bound by {}; parameter {} vs argument {}",
            name, first_origin, formal, actual
        )),
        InstantiationError::KindMismatch { formal, actual, .. }
        | InstantiationError::NominalMismatch { formal, actual, .. }
        | InstantiationError::ArityMismatch { formal, actual, .. } => {
            Some(format!("parameter type is {}, argument type is {}", formal, actual))
        }
        InstantiationError::Evaluation {
            source: EvalError::Callee { source, .. },
            ..
        } => Some(format!("caused by: {}", source)),
        _ => None,
    }
}

/// A fix suggestion, when one is plausible.
fn help(err: &InstantiationError) -> Option<String> {
    match err {
        InstantiationError::ConflictingBinding { name, .. } => Some(format!(
            "every argument sized by `{}` must have the same size",
            name
        )),
        InstantiationError::ConstraintViolation { name, expr, .. } => Some(format!(
            "`{}` is defined as `{}`; drop the explicit value or change the arguments",
            name, expr
        )),
        InstantiationError::UnboundParametric { name, .. } => Some(format!(
            "pass `{}` explicitly or give it a defining expression",
            name
        )),
        InstantiationError::NonConcreteArgument { .. } => {
            Some("argument types must be fully resolved before instantiation".to_string())
        }
        InstantiationError::Evaluation {
            source: EvalError::RecursionLimit { .. },
            ..
        } => Some("raise the evaluation depth limit if the recursion is intended".to_string()),
        _ => None,
    }
}

// ── JSON ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonSpan {
    start: usize,
    end: usize,
    /// 1-based position of `start`.
    line: u32,
    column: u32,
    label: String,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    code: &'static str,
    severity: &'static str,
    message: String,
    file: &'a str,
    spans: Vec<JsonSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<String>,
}

// ── Main Rendering Function ────────────────────────────────────────────

/// Clamp a byte range into `source`, widening empty ranges to one character
/// where possible so the label has something to point at.
fn clamp(range: Range<usize>, source_len: usize) -> Range<usize> {
    let start = range.start.min(source_len);
    let end = range.end.min(source_len).max(start);
    if start == end {
        start..(end + 1).min(source_len)
    } else {
        start..end
    }
}

/// Render an instantiation error against the source text containing the
/// invocation.
pub fn render_diagnostic(
    error: &InstantiationError,
    source: &str,
    filename: &str,
    options: &DiagnosticOptions,
) -> String {
    let range = clamp(error.span().to_range(), source.len());
    let code = error_code(error);
    let message = error.to_string();

    if options.json {
        let (line, column) = LineIndex::new(source).line_col(range.start as u32);
        let diagnostic = JsonDiagnostic {
            code,
            severity: "error",
            message,
            file: filename,
            spans: vec![JsonSpan {
                start: range.start,
                end: range.end,
                line,
                column,
                label: label_message(error),
            }],
            note: note(error),
            help: help(error),
        };
        return serde_json::to_string(&diagnostic).unwrap_or_else(|_| error.to_string());
    }

    let mut builder = Report::build(ReportKind::Error, range.clone())
        .with_code(code)
        .with_message(&message)
        .with_config(Config::default().with_color(options.color))
        .with_label(
            Label::new(range)
                .with_message(label_message(error))
                .with_color(Color::Red),
        );
    if let Some(note) = note(error) {
        builder = builder.with_note(note);
    }
    if let Some(help) = help(error) {
        builder = builder.with_help(help);
    }

    let mut buf = Vec::new();
    match builder.finish().write(Source::from(source), &mut buf) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("error[{}]: {}", code, message),
    }
}
