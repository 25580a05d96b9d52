//! Kindling transpiler.
//!
//! Lowers a [`Script`](kindling_types::ast::Script) into a
//! [`Program`](kindling_ir::Program): one unit per top-level item, every
//! statement mapped to exactly one instruction node, every argument and tag
//! checked against the [`Catalog`].
//!
//! # Example
//!
//! ```ignore
//! let program = kindling_transpiler::transpile(&script)?;
//! ```

pub mod catalog;
mod error;
mod expr;
mod scope;
mod transpiler;

pub use catalog::{ArgKind, Catalog, Param, Signature, TagSpec};
pub use error::{TranspileError, TranspileResult};
pub use expr::TEMP_PREFIX;
pub use transpiler::{transpile, Transpiler};
