//! Transpile error types.

use kindling_ir::ValueKind;
use kindling_types::{Diagnostic, ErrorCode, Span};
use thiserror::Error;

/// A failure attributable to one AST node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranspileError {
    #[error("{span}: unknown {block} action `{name}`")]
    UnknownInstruction {
        block: &'static str,
        name: String,
        span: Span,
    },

    #[error("{span}: `{action}` takes {expected} argument(s), found {found}")]
    ArgumentCount {
        action: String,
        expected: String,
        found: usize,
        span: Span,
    },

    #[error("{span}: argument {position} (`{param}`) of `{action}` must be {expected}, found {found}")]
    ArgumentKind {
        action: String,
        /// 1-based.
        position: usize,
        param: &'static str,
        expected: String,
        found: ValueKind,
        span: Span,
    },

    #[error("{span}: unresolved variable `{name}`")]
    UnresolvedVariable { name: String, span: Span },

    #[error("{span}: unknown function or process `{name}`")]
    UnknownFunction { name: String, span: Span },

    #[error("{span}: `{action}` has no tag `{tag}`")]
    UnknownTag {
        action: String,
        tag: String,
        span: Span,
    },

    #[error("{span}: `{option}` is not an option of tag `{tag}`")]
    InvalidTagOption {
        tag: String,
        option: String,
        allowed: Vec<&'static str>,
        span: Span,
    },

    #[error("{span}: unknown target selector `{name}`")]
    UnknownSelector { name: String, span: Span },

    #[error("{span}: invalid literal: {reason}")]
    InvalidLiteral { reason: String, span: Span },

    #[error("{span}: {what} is not allowed here")]
    Misplaced { what: String, span: Span },

    #[error("{span}: `{name}` is defined more than once")]
    DuplicateDefinition { name: String, span: Span },

    #[error("{span}: unknown event `{name}`")]
    UnknownEvent { name: String, span: Span },
}

/// Transpile result type alias.
pub type TranspileResult<T> = Result<T, TranspileError>;

impl TranspileError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownInstruction { .. } => ErrorCode::UNKNOWN_INSTRUCTION,
            Self::ArgumentCount { .. } => ErrorCode::ARGUMENT_COUNT,
            Self::ArgumentKind { .. } => ErrorCode::ARGUMENT_KIND,
            Self::UnresolvedVariable { .. } => ErrorCode::UNRESOLVED_VARIABLE,
            Self::UnknownFunction { .. } => ErrorCode::UNKNOWN_FUNCTION,
            Self::UnknownTag { .. } => ErrorCode::UNKNOWN_TAG,
            Self::InvalidTagOption { .. } => ErrorCode::INVALID_TAG_OPTION,
            Self::UnknownSelector { .. } => ErrorCode::UNKNOWN_SELECTOR,
            Self::InvalidLiteral { .. } => ErrorCode::INVALID_LITERAL,
            Self::Misplaced { .. } => ErrorCode::MISPLACED_STATEMENT,
            Self::DuplicateDefinition { .. } => ErrorCode::DUPLICATE_DEFINITION,
            Self::UnknownEvent { .. } => ErrorCode::UNKNOWN_EVENT,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnknownInstruction { span, .. }
            | Self::ArgumentCount { span, .. }
            | Self::ArgumentKind { span, .. }
            | Self::UnresolvedVariable { span, .. }
            | Self::UnknownFunction { span, .. }
            | Self::UnknownTag { span, .. }
            | Self::InvalidTagOption { span, .. }
            | Self::UnknownSelector { span, .. }
            | Self::InvalidLiteral { span, .. }
            | Self::Misplaced { span, .. }
            | Self::DuplicateDefinition { span, .. }
            | Self::UnknownEvent { span, .. } => *span,
        }
    }

    /// Message without the span prefix.
    fn message(&self) -> String {
        let full = self.to_string();
        let prefix = format!("{}: ", self.span());
        full.strip_prefix(&prefix).unwrap_or(&full).to_string()
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::new(self.code(), self.message()).at(self.span());
        match self {
            Self::InvalidTagOption { allowed, .. } => {
                diag.with_suggestion(format!("expected one of: {}", allowed.join(", ")))
            }
            Self::UnresolvedVariable { name, .. } => diag.with_suggestion(format!(
                "declare it with `let {name}` or annotate its scope, e.g. `game {name}`"
            )),
            _ => diag,
        }
    }
}
