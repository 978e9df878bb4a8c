//! Outbound request framing.
//!
//! Every session-scoped command is serialized twice: once as the inner
//! command, and again as the `message` string of a
//! `Target.sendMessageToTarget` command carrying the same id.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{RequestId, SessionId};

use super::command::{Command, TargetCommand};

// ============================================================================
// Request
// ============================================================================

/// A command request from client to browser.
///
/// # Format
///
/// ```json
/// { "id": 3, "method": "Runtime.evaluate", "params": { ... } }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Unique identifier for request/response correlation.
    pub id: RequestId,

    /// Method in `Domain.methodName` format.
    pub method: String,

    /// Method params; omitted when null.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Request {
    /// Creates a new request.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Creates a request from a typed command.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the command cannot be serialized.
    pub fn from_command(id: RequestId, command: Command) -> Result<Self> {
        let (method, params) = command.into_parts()?;
        Ok(Self::new(id, method, params))
    }

    /// Serializes the request as a top-level frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the request wrapped for delivery into `session`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_session_frame(&self, session_id: &SessionId) -> Result<String> {
        let wrapper = Self::from_command(
            self.id,
            Command::Target(TargetCommand::SendMessageToTarget {
                message: self.to_frame()?,
                session_id: session_id.clone(),
            }),
        )?;
        wrapper.to_frame()
    }
}

// ============================================================================
// Tests
// ============================================================================
