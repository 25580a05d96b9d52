use crate::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage an error originates from, derived from its code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Transpile,
    Optimize,
    Encode,
    Transmit,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Syntax => "syntax",
            Self::Transpile => "transpile",
            Self::Optimize => "optimize",
            Self::Encode => "encode",
            Self::Transmit => "transmit",
        })
    }
}

/// Stable numeric error code (E100–E599).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax (E100–E199), reported by the external parser ──
    pub const SYNTAX: Self = Self(100);

    // ── Transpile (E200–E299) ──
    pub const UNKNOWN_INSTRUCTION: Self = Self(200);
    pub const ARGUMENT_COUNT: Self = Self(201);
    pub const ARGUMENT_KIND: Self = Self(202);
    pub const UNRESOLVED_VARIABLE: Self = Self(203);
    pub const UNKNOWN_FUNCTION: Self = Self(204);
    pub const UNKNOWN_TAG: Self = Self(205);
    pub const INVALID_TAG_OPTION: Self = Self(206);
    pub const UNKNOWN_SELECTOR: Self = Self(207);
    pub const INVALID_LITERAL: Self = Self(208);
    pub const MISPLACED_STATEMENT: Self = Self(209);
    pub const DUPLICATE_DEFINITION: Self = Self(210);
    pub const UNKNOWN_EVENT: Self = Self(211);

    // ── Optimize (E300–E399) ──
    pub const UNSPLITTABLE_UNIT: Self = Self(300);
    pub const SPLIT_EXIT: Self = Self(301);

    // ── Transmit (E400–E499) ──
    pub const CONNECTION_REFUSED: Self = Self(400);
    pub const ACK_TIMEOUT: Self = Self(401);
    pub const CONNECTION_LOST: Self = Self(402);
    pub const DELIVERY_REJECTED: Self = Self(403);
    pub const UNEXPECTED_RESPONSE: Self = Self(404);
    pub const SESSION_CLOSED: Self = Self(405);

    // ── Encode (E500–E599) ──
    pub const ENCODING_FAILED: Self = Self(500);
    pub const SLOT_OVERFLOW: Self = Self(501);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            200..=299 => ErrorCategory::Transpile,
            300..=399 => ErrorCategory::Optimize,
            400..=499 => ErrorCategory::Transmit,
            500..=599 => ErrorCategory::Encode,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A parse failure handed over by the external lexer/parser.
///
/// The compiler never produces this itself; it only carries it through
/// unchanged so callers see the parser's own message and position.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{span}: syntax error: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(ErrorCode::SYNTAX, self.message.clone()).at(self.span)
    }
}

/// Structured error record for JSON output and detailed rendering.
///
/// Every stage error converts into one of these; front ends render it
/// instead of parsing `Display` strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// The quoted script line, when the source text is available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            category: code.category(),
            message: message.into(),
            span: None,
            source_line: None,
            suggestion: None,
        }
    }

    /// Attach a location. Unknown spans are dropped.
    pub fn at(mut self, span: Span) -> Self {
        self.span = span.is_known().then_some(span);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Quote the offending line from `source`, if the span points into it.
    pub fn with_source(mut self, source: &SourceFile) -> Self {
        if let Some(span) = self.span {
            self.source_line = source.line(span.line).map(str::to_owned);
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = self.span {
            write!(f, "{span}: ")?;
        }
        write!(f, "{} [{}] {}", self.code, self.category, self.message)
    }
}
