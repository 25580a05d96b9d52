use kindling_codegen::{CodegenError, TransmitError};
use kindling_optimizer::OptimizeError;
use kindling_transpiler::TranspileError;
use kindling_types::{Diagnostic, ErrorCode, SourceFile, SyntaxError};
use thiserror::Error;

use crate::config::ErrorDetail;

/// Any failure of the pipeline, tagged with the stage it came from.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// The AST document handed over by the parser did not deserialize.
    #[error("invalid AST document: {0}")]
    Ast(#[from] serde_json::Error),

    #[error(transparent)]
    Transpile(#[from] TranspileError),

    #[error(transparent)]
    Optimize(#[from] OptimizeError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    Transmit(#[from] TransmitError),
}

impl CompileError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Syntax(_) | Self::Ast(_) => ErrorCode::SYNTAX,
            Self::Transpile(e) => e.code(),
            Self::Optimize(e) => e.code(),
            Self::Codegen(e) => e.code(),
            Self::Transmit(e) => e.code(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Syntax(e) => e.to_diagnostic(),
            Self::Ast(_) => Diagnostic::new(self.code(), self.to_string()),
            Self::Transpile(e) => e.to_diagnostic(),
            Self::Optimize(e) => e.to_diagnostic(),
            Self::Codegen(e) => e.to_diagnostic(),
            Self::Transmit(e) => e.to_diagnostic(),
        }
    }

    /// `Short` is one line; `Full` adds code, category, location and the
    /// error's complete structure.
    pub fn render(&self, detail: ErrorDetail) -> String {
        self.render_with(detail, None)
    }

    /// [`render`](Self::render), quoting the offending line from `source`.
    pub fn render_with(&self, detail: ErrorDetail, source: Option<&SourceFile>) -> String {
        let mut diag = self.to_diagnostic();
        if let Some(source) = source {
            diag = diag.with_source(source);
        }
        let summary = format!("error[{}]: {}", diag.code, diag.message);
        if detail == ErrorDetail::Short {
            return summary;
        }

        let mut out = summary;
        out.push_str(&format!("\n  code: {}", diag.code));
        out.push_str(&format!("\n  category: {}", diag.category));
        match diag.span {
            Some(span) => out.push_str(&format!("\n  at: {span}")),
            None => out.push_str("\n  at: unknown"),
        }
        if let Some(line) = &diag.source_line {
            out.push_str(&format!("\n   | {line}"));
        }
        if let Some(help) = &diag.suggestion {
            out.push_str(&format!("\n  help: {help}"));
        }
        out.push_str(&format!("\n{self:#?}"));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindling_types::Span;

    #[test]
    fn syntax_error_passes_through() {
        let err = CompileError::from(SyntaxError::new("expected `}`", Span::point(4, 1)));
        assert_eq!(err.code(), ErrorCode::SYNTAX);
        assert_eq!(err.to_string(), "4:1: syntax error: expected `}`");
        assert_eq!(err.render(ErrorDetail::Short), "error[E100]: expected `}`");
    }

    #[test]
    fn full_render_has_structure() {
        let err = CompileError::from(SyntaxError::new("expected `}`", Span::point(4, 1)));
        let full = err.render(ErrorDetail::Full);
        assert!(full.starts_with("error[E100]: expected `}`\n"));
        assert!(full.contains("category: syntax"));
        assert!(full.contains("at: 4:1"));
        assert!(full.contains("Syntax("));
        assert!(!err.render(ErrorDetail::Short).contains('\n'));
    }

    #[test]
    fn full_render_quotes_source() {
        let src = SourceFile::new("a.kls", "on Join {\n  player.Jump(\n");
        let err = CompileError::from(SyntaxError::new("expected `)`", Span::point(2, 14)));
        let full = err.render_with(ErrorDetail::Full, Some(&src));
        assert!(full.contains("   |   player.Jump("));
    }

    #[test]
    fn transmit_error_keeps_its_code() {
        let err = CompileError::from(TransmitError::SessionClosed);
        assert_eq!(err.code(), ErrorCode::SESSION_CLOSED);
        assert!(err.render(ErrorDetail::Full).contains("at: unknown"));
    }
}
