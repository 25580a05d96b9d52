//! Shared types for the Kindling compiler.
//!
//! This crate defines the script AST consumed from the external parser,
//! source spans, the error-code taxonomy shared by every pipeline stage,
//! and the structured [`Diagnostic`] record used for error output.

mod error;
mod span;
pub mod ast;

pub use error::{Diagnostic, ErrorCategory, ErrorCode, SyntaxError};
pub use span::{SourceFile, Span};
