//! Event payload types.
//!
//! Events are notifications the browser sends without a request id.
//!
//! # Event Types
//!
//! | Scope | Events |
//! |-------|--------|
//! | Browser | `Target.targetCreated`, `Target.targetDestroyed`, `Target.receivedMessageFromTarget` |
//! | Session | `Runtime.bindingCalled`, `Runtime.consoleAPICalled`, `Runtime.exceptionThrown`, anything else |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{ExecutionContextId, SessionId, TargetId};

// ============================================================================
// Method Names
// ============================================================================

/// Event method names the client reacts to.
pub mod methods {
    /// A target appeared.
    pub const TARGET_CREATED: &str = "Target.targetCreated";
    /// A target went away.
    pub const TARGET_DESTROYED: &str = "Target.targetDestroyed";
    /// Session-scoped traffic wrapped for the browser connection.
    pub const RECEIVED_MESSAGE_FROM_TARGET: &str = "Target.receivedMessageFromTarget";
    /// Page code called a raw binding.
    pub const BINDING_CALLED: &str = "Runtime.bindingCalled";
    /// Page code logged to the console.
    pub const CONSOLE_API_CALLED: &str = "Runtime.consoleAPICalled";
    /// An exception went uncaught in page code.
    pub const EXCEPTION_THROWN: &str = "Runtime.exceptionThrown";
}

// ============================================================================
// Target Events
// ============================================================================

/// Params of `Target.targetCreated`.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetCreated {
    /// Description of the new target.
    #[serde(rename = "targetInfo")]
    pub target_info: TargetInfo,
}

/// Target description.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
    /// Target ID.
    #[serde(rename = "targetId")]
    pub target_id: TargetId,

    /// Target kind (`page`, `iframe`, `service_worker`, ...).
    #[serde(rename = "type")]
    pub target_type: String,
}

impl TargetInfo {
    /// Returns `true` for top-level page targets.
    #[inline]
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.target_type == "page"
    }
}

/// Params of `Target.targetDestroyed`.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetDestroyed {
    /// The destroyed target.
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
}

/// Params of `Target.receivedMessageFromTarget`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceivedMessageFromTarget {
    /// Session the message belongs to.
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,

    /// Serialized inner message.
    pub message: String,
}

// ============================================================================
// Binding Events
// ============================================================================

/// Params of `Runtime.bindingCalled`.
#[derive(Debug, Clone, Deserialize)]
struct BindingCalled {
    name: String,
    payload: String,
    #[serde(rename = "executionContextId")]
    execution_context_id: ExecutionContextId,
}

/// Payload the injected page shim passes to the raw binding.
#[derive(Debug, Clone, Deserialize)]
struct BindingPayload {
    seq: u64,
    #[serde(default)]
    args: Vec<Value>,
}

/// A decoded call from page script into a host binding.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingCall {
    /// Binding name.
    pub name: String,
    /// Page-side sequence number keying the pending promise.
    pub seq: u64,
    /// Call arguments, in order.
    pub args: Vec<Value>,
    /// Context the call came from; the reply is evaluated there.
    pub context_id: ExecutionContextId,
}

impl BindingCall {
    /// Decodes `Runtime.bindingCalled` params and the nested payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if either layer is malformed, e.g.
    /// when page code calls the raw binding without the shim.
    pub fn from_params(params: Value) -> Result<Self> {
        let event: BindingCalled = serde_json::from_value(params)?;
        let payload: BindingPayload = serde_json::from_str(&event.payload)?;
        Ok(Self {
            name: event.name,
            seq: payload.seq,
            args: payload.args,
            context_id: event.execution_context_id,
        })
    }
}

// ============================================================================
// SessionEvent
// ============================================================================

/// An unsolicited session-scoped event, as delivered to event handlers.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    /// Event name in `Domain.eventName` format.
    pub method: String,
    /// Event-specific data.
    pub params: Value,
}

impl SessionEvent {
    /// Creates a new session event.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Returns the domain name from the method.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns `true` for console API calls.
    #[inline]
    #[must_use]
    pub fn is_console(&self) -> bool {
        self.method == methods::CONSOLE_API_CALLED
    }

    /// Returns `true` for uncaught exceptions.
    #[inline]
    #[must_use]
    pub fn is_exception(&self) -> bool {
        self.method == methods::EXCEPTION_THROWN
    }

    /// Renders console arguments as one line.
    ///
    /// Primitive values are printed bare, remote objects by description.
    #[must_use]
    pub fn console_text(&self) -> String {
        let Some(args) = self.params.get("args").and_then(Value::as_array) else {
            return String::new();
        };
        args.iter()
            .map(|arg| match arg.get("value") {
                Some(Value::String(s)) => s.clone(),
                Some(value) => value.to_string(),
                None => arg
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Tests
// ============================================================================
