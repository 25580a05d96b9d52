//! Kindling codegen.
//!
//! Turns fitted templates into what the target platform accepts:
//!
//! - [`encode_template`]: template → `{"blocks": [...]}` wire document
//! - [`TemplateCode`]: the document gzip-compressed and base64 encoded
//! - [`OfflinePackage`]: every code plus one combined artifact and give
//!   commands, for manual import
//! - [`LiveSession`]: ordered, acknowledged delivery to the companion client

mod encode;
mod error;
mod payload;
mod transmit;

pub use encode::{encode_template, WIRE_VERSION};
pub use error::{CodegenError, CodegenResult, TransmitError};
pub use payload::{decode_code, encode_code, OfflinePackage, TemplateCode};
pub use transmit::{LiveSession, Progress, DEFAULT_ADDRESS};
