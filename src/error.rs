//! Error types for the DevTools bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use devtools_bridge::{Chrome, Result};
//!
//! async fn example(chrome: &Chrome) -> Result<()> {
//!     chrome.load("https://example.com").await?;
//!     let title = chrome.eval("document.title").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::ChromeNotFound`] |
//! | Launch | [`Error::ProcessLaunchFailed`], [`Error::Handshake`], [`Error::HandshakeTimeout`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::RequestTimeout`] |
//! | Protocol | [`Error::Target`], [`Error::Remote`], [`Error::Protocol`], [`Error::InvalidArgument`] |
//! | Binding | [`Error::ArgumentMismatch`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`], [`Error::Base64`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when builder configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Browser binary not found at path.
    #[error("Chrome not found at: {path}")]
    ChromeNotFound {
        /// Path where the browser was expected.
        path: PathBuf,
    },

    // ========================================================================
    // Launch Errors
    // ========================================================================
    /// Failed to launch the browser process.
    #[error("Failed to launch Chrome: {message}")]
    ProcessLaunchFailed {
        /// Description of the launch failure.
        message: String,
    },

    /// The DevTools endpoint was never announced.
    ///
    /// Returned when the diagnostic stream ends before the
    /// `DevTools listening on` line, or the announced address is malformed.
    #[error("Handshake failed: {message}")]
    Handshake {
        /// Description of the handshake failure.
        message: String,
    },

    /// Timed out waiting for the DevTools endpoint line.
    #[error("Handshake timeout after {timeout_ms}ms")]
    HandshakeTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the DevTools websocket cannot be opened or written.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The connection is gone.
    ///
    /// Returned to callers whose request was still pending when the
    /// event loop stopped, and to any send after that.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Command request timeout.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Attaching to the page target failed.
    #[error("Target error: {message}")]
    Target {
        /// Remote error payload.
        message: String,
    },

    /// Error reported by the browser for a command.
    ///
    /// Covers protocol errors, thrown exceptions and rejected promises.
    /// Display is the bare remote message, e.g. `"foo"` for
    /// `Promise.reject('foo')`.
    #[error("{message}")]
    Remote {
        /// Remote error message.
        message: String,
    },

    /// Protocol violation or unexpected response shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Invalid argument passed to an operation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Binding Errors
    // ========================================================================
    /// A binding was called with the wrong number of arguments.
    #[error("function arguments mismatch: expected {expected}, got {actual}")]
    ArgumentMismatch {
        /// Arity the handler accepts.
        expected: usize,
        /// Number of arguments the page passed.
        actual: usize,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Base64 decode error.
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a Chrome not found error.
    #[inline]
    pub fn chrome_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ChromeNotFound { path: path.into() }
    }

    /// Creates a process launch failed error.
    #[inline]
    pub fn process_launch_failed(err: IoError) -> Self {
        Self::ProcessLaunchFailed {
            message: err.to_string(),
        }
    }

    /// Creates a handshake error.
    #[inline]
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake {
            message: message.into(),
        }
    }

    /// Creates a handshake timeout error.
    #[inline]
    pub fn handshake_timeout(timeout_ms: u64) -> Self {
        Self::HandshakeTimeout { timeout_ms }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a target error.
    #[inline]
    pub fn target(message: impl Into<String>) -> Self {
        Self::Target {
            message: message.into(),
        }
    }

    /// Creates a remote error.
    #[inline]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an argument mismatch error.
    #[inline]
    pub fn argument_mismatch(expected: usize, actual: usize) -> Self {
        Self::ArgumentMismatch { expected, actual }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::HandshakeTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the browser reported this error for a command.
    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Target { .. })
    }

    /// Returns `true` if this error happened while starting the browser.
    #[inline]
    #[must_use]
    pub fn is_launch_error(&self) -> bool {
        matches!(
            self,
            Self::ProcessLaunchFailed { .. }
                | Self::Handshake { .. }
                | Self::HandshakeTimeout { .. }
                | Self::ChromeNotFound { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_remote_display_is_bare_message() {
        let err = Error::remote("\"foo\"");
        assert_eq!(err.to_string(), "\"foo\"");
    }

    #[test]
    fn test_argument_mismatch_display() {
        let err = Error::argument_mismatch(2, 3);
        assert_eq!(
            err.to_string(),
            "function arguments mismatch: expected 2, got 3"
        );
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::request_timeout(RequestId::new(7), 5000);
        let other_err = Error::connection("test");

        assert!(timeout_err.is_timeout());
        assert!(Error::handshake_timeout(10).is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_remote() {
        assert!(Error::remote("boom").is_remote());
        assert!(Error::target("no such target").is_remote());
        assert!(!Error::protocol("bad").is_remote());
    }

    #[test]
    fn test_is_launch_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "no such file");
        assert!(Error::process_launch_failed(io_err).is_launch_error());
        assert!(Error::handshake("eof").is_launch_error());
        assert!(!Error::ConnectionClosed.is_launch_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
