//! Centralized error types for the Aria Bridge core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps every failure to the single downstream `(ERROR)` response policy
//! - Exposes machine-readable error codes for logging and events

use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and events.
    fn code(&self) -> &'static str;
}

/// Errors raised while validating or mutating model state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// Identifier or value outside its permitted domain.
    #[error("{0} out of range")]
    OutOfRange(&'static str),

    /// Identifier valid but no such object.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The model lacks a value needed to synthesize a response.
    #[error("{0} not initialized")]
    NotInitialized(&'static str),
}

impl ErrorCode for ModelError {
    fn code(&self) -> &'static str {
        match self {
            Self::OutOfRange(_) => "out_of_range",
            Self::NotFound(_) => "not_found",
            Self::NotInitialized(_) => "not_initialized",
        }
    }
}

/// Errors raised by the record framer.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A record exceeded the framer's maximum accumulation size.
    #[error("record exceeds {0} bytes")]
    RecordTooLong(usize),

    /// Underlying socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application-wide error type for the proxy core.
///
/// The downstream wire policy is uniform: every variant except
/// [`ProxyError::NotInitialized`] surfaces to the originating client as a
/// single `(ERROR)` response frame. `NotInitialized` never reaches the wire;
/// it escalates to a forward-as-observation fallback instead.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Request did not match any pattern, matched with the wrong number of
    /// capturing groups, or an embedded integer failed to parse.
    #[error("bad command: {0}")]
    BadCommand(String),

    /// Identifier or value outside its permitted domain.
    #[error("out of range: {0}")]
    OutOfRange(&'static str),

    /// Identifier valid but no such object.
    #[error("not found: {0}")]
    NotFound(&'static str),

    /// Model lacks a value needed to synthesize a response.
    #[error("not initialized: {0}")]
    NotInitialized(&'static str),

    /// Upstream did not respond in time.
    #[error("upstream exchange timed out")]
    TimedOut,

    /// Upstream connection lost before completion.
    #[error("upstream link down")]
    LinkDown,

    /// Upstream responded with an error frame.
    #[error("upstream error response")]
    UpstreamError,

    /// Buffer allocation or channel capacity failure.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),
}

impl ProxyError {
    /// Returns a machine-readable error code for logs and events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadCommand(_) => "bad_command",
            Self::OutOfRange(_) => "out_of_range",
            Self::NotFound(_) => "not_found",
            Self::NotInitialized(_) => "not_initialized",
            Self::TimedOut => "timed_out",
            Self::LinkDown => "link_down",
            Self::UpstreamError => "upstream_error",
            Self::ResourceExhausted(_) => "resource_exhausted",
        }
    }

    /// True when the error escalates to the forward-as-observation fallback
    /// rather than an `(ERROR)` response.
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized(_))
    }
}

impl ErrorCode for ProxyError {
    fn code(&self) -> &'static str {
        ProxyError::code(self)
    }
}

impl From<ModelError> for ProxyError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::OutOfRange(what) => Self::OutOfRange(what),
            ModelError::NotFound(what) => Self::NotFound(what),
            ModelError::NotInitialized(what) => Self::NotInitialized(what),
        }
    }
}

/// Convenient Result alias for proxy-wide operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Convenient Result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_errors_map_onto_proxy_codes() {
        let err: ProxyError = ModelError::OutOfRange("zone identifier").into();
        assert_eq!(err.code(), "out_of_range");

        let err: ProxyError = ModelError::NotInitialized("zone volume").into();
        assert!(err.is_not_initialized());
        assert_eq!(err.code(), "not_initialized");
    }

    #[test]
    fn wire_facing_errors_are_not_fallbacks() {
        assert!(!ProxyError::TimedOut.is_not_initialized());
        assert!(!ProxyError::BadCommand("QZ".into()).is_not_initialized());
        assert_eq!(ProxyError::LinkDown.code(), "link_down");
    }
}
