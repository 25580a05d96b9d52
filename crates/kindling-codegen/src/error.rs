//! Codegen and transmit error types.

use kindling_types::{Diagnostic, ErrorCode};
use thiserror::Error;

use crate::transmit::Progress;

/// Errors while turning templates into wire payloads.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("compression failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("`{block}` holds {count} values but a block chest has 27 slots")]
    SlotOverflow { block: String, count: usize },
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;

impl CodegenError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SlotOverflow { .. } => ErrorCode::SLOT_OVERFLOW,
            _ => ErrorCode::ENCODING_FAILED,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.code(), self.to_string())
    }
}

/// Live delivery failures. Every variant raised during a delivery carries
/// how far it got; templates below `progress.delivered` are placed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransmitError {
    #[error("could not connect to {address}: {reason}")]
    ConnectionRefused { address: String, reason: String },

    #[error("no acknowledgment for {awaiting} within {timeout_ms} ms ({progress})")]
    AckTimeout {
        awaiting: String,
        timeout_ms: u64,
        progress: Progress,
    },

    #[error("connection lost: {reason} ({progress})")]
    ConnectionLost { reason: String, progress: Progress },

    #[error("template {index} rejected: {reason} ({progress})")]
    DeliveryRejected {
        index: usize,
        reason: String,
        progress: Progress,
    },

    #[error("unexpected response `{response}` ({progress})")]
    UnexpectedResponse { response: String, progress: Progress },

    #[error("session already closed after an earlier failure")]
    SessionClosed,
}

impl TransmitError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ConnectionRefused { .. } => ErrorCode::CONNECTION_REFUSED,
            Self::AckTimeout { .. } => ErrorCode::ACK_TIMEOUT,
            Self::ConnectionLost { .. } => ErrorCode::CONNECTION_LOST,
            Self::DeliveryRejected { .. } => ErrorCode::DELIVERY_REJECTED,
            Self::UnexpectedResponse { .. } => ErrorCode::UNEXPECTED_RESPONSE,
            Self::SessionClosed => ErrorCode::SESSION_CLOSED,
        }
    }

    /// Delivery state at the moment of failure, when a delivery was running.
    pub fn progress(&self) -> Option<Progress> {
        match self {
            Self::AckTimeout { progress, .. }
            | Self::ConnectionLost { progress, .. }
            | Self::DeliveryRejected { progress, .. }
            | Self::UnexpectedResponse { progress, .. } => Some(*progress),
            Self::ConnectionRefused { .. } | Self::SessionClosed => None,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::new(self.code(), self.to_string());
        match self.progress() {
            Some(p) if p.delivered > 0 => diag.with_suggestion(format!(
                "templates {}..{} were placed; redeliver {}..{} after fixing the connection",
                p.confirmed().start,
                p.confirmed().end,
                p.unconfirmed().start,
                p.unconfirmed().end
            )),
            _ => diag,
        }
    }
}
