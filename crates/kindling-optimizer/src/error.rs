//! Optimizer error types.

use kindling_types::{Diagnostic, ErrorCode};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeError {
    /// A single construct cannot fit even an otherwise empty template.
    #[error("`{construct}` in `{unit}` does not fit a template of {capacity} slots")]
    UnsplittableUnit {
        unit: String,
        construct: String,
        capacity: usize,
    },

    /// Splitting a bracket would move a loop or function exit into a
    /// continuation, where it would leave the continuation instead.
    #[error("splitting `{construct}` in `{unit}` would move `{exit}` into a continuation")]
    SplitExit {
        unit: String,
        construct: String,
        exit: &'static str,
    },
}

/// Optimizer result type alias.
pub type OptimizeResult<T> = Result<T, OptimizeError>;

impl OptimizeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnsplittableUnit { .. } => ErrorCode::UNSPLITTABLE_UNIT,
            Self::SplitExit { .. } => ErrorCode::SPLIT_EXIT,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let suggestion = match self {
            Self::UnsplittableUnit { .. } => {
                "move part of the bracket's setup into a separate statement, or use a larger plot"
            }
            Self::SplitExit { .. } => {
                "move the statements before the exit into a function, or use a larger plot"
            }
        };
        Diagnostic::new(self.code(), self.to_string()).with_suggestion(suggestion)
    }
}
