//! Inbound message envelopes and reply decoding.
//!
//! Every frame from the browser is decoded permissively into an
//! [`Envelope`]: a reply carries `id` plus `result` or `error`, an event
//! carries `method` plus `params`. Session-scoped traffic arrives as the
//! `message` string of a `Target.receivedMessageFromTarget` event and is
//! decoded a second time into a [`SessionMessage`].

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::event::{BindingCall, SessionEvent, methods};

// ============================================================================
// Envelope
// ============================================================================

/// A decoded frame, reply or event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    /// Present on replies.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// Present on events.
    #[serde(default)]
    pub method: Option<String>,

    /// Event params.
    #[serde(default)]
    pub params: Value,

    /// Reply result.
    #[serde(default)]
    pub result: Option<Value>,

    /// Reply error.
    #[serde(default)]
    pub error: Option<Value>,
}

impl Envelope {
    /// Parses a frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not a JSON object.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns `true` if the envelope carries the given event method.
    #[inline]
    #[must_use]
    pub fn is_event(&self, method: &str) -> bool {
        self.id.is_none() && self.method.as_deref() == Some(method)
    }

    /// Decodes the event params into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if params don't match `T`.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.params)?)
    }

    /// Returns the remote error message carried by a reply, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref().filter(|e| !e.is_null())?;
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| error.to_string());
        Some(message)
    }
}

// ============================================================================
// SessionMessage
// ============================================================================

/// A session-scoped message, classified for routing.
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// Reply to a command sent through the session.
    Reply {
        /// Request the reply answers.
        id: RequestId,
        /// Decoded outcome.
        outcome: ReplyOutcome,
    },
    /// `Runtime.consoleAPICalled`.
    Console(SessionEvent),
    /// `Runtime.exceptionThrown`.
    Exception(SessionEvent),
    /// `Runtime.bindingCalled` with its payload decoded.
    BindingCalled(BindingCall),
    /// Any other event.
    Event(SessionEvent),
}

impl SessionMessage {
    /// Decodes and classifies the inner message of a forwarded frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text or a binding payload is malformed
    /// - [`Error::Protocol`] if the message is neither reply nor event
    pub fn parse(text: &str) -> Result<Self> {
        Self::classify(Envelope::parse(text)?)
    }

    /// Classifies a decoded envelope.
    ///
    /// # Errors
    ///
    /// See [`SessionMessage::parse`].
    pub fn classify(envelope: Envelope) -> Result<Self> {
        if let Some(id) = envelope.id {
            let outcome = ReplyOutcome::decode(&envelope);
            return Ok(Self::Reply { id, outcome });
        }

        let Some(method) = envelope.method else {
            return Err(Error::protocol("message has neither id nor method"));
        };

        let message = match method.as_str() {
            methods::BINDING_CALLED => Self::BindingCalled(BindingCall::from_params(envelope.params)?),
            methods::CONSOLE_API_CALLED => Self::Console(SessionEvent::new(method, envelope.params)),
            methods::EXCEPTION_THROWN => Self::Exception(SessionEvent::new(method, envelope.params)),
            _ => Self::Event(SessionEvent::new(method, envelope.params)),
        };
        Ok(message)
    }
}

// ============================================================================
// ReplyOutcome
// ============================================================================

/// Outcome of a reply, decoded by fixed precedence.
///
/// | Priority | Shape | Variant |
/// |----------|-------|---------|
/// | 1 | top-level `error` | [`ReplyOutcome::ProtocolError`] |
/// | 2 | `result.result` is an `object` of subtype `error` | [`ReplyOutcome::ErrorObject`] |
/// | 3 | `result.exceptionDetails` present | [`ReplyOutcome::Exception`] |
/// | 4 | `result.result` has a `type` | [`ReplyOutcome::Value`] |
/// | 5 | anything else | [`ReplyOutcome::Raw`] |
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    /// The command itself failed.
    ProtocolError(String),
    /// Evaluation produced an `Error` object; carries its description.
    ErrorObject(String),
    /// Evaluation threw or rejected; carries the serialized thrown value.
    Exception(String),
    /// Evaluation produced a value.
    Value(Value),
    /// A result of another domain, passed through.
    Raw(Value),
}

/// The `Runtime.evaluate` result shape.
#[derive(Debug, Default, Deserialize)]
struct EvaluateResult {
    #[serde(default)]
    result: Option<RemoteObject>,
    #[serde(rename = "exceptionDetails", default)]
    exception_details: Option<ExceptionDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct RemoteObject {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

impl RemoteObject {
    fn is_error(&self) -> bool {
        self.kind == "object" && self.subtype.as_deref() == Some("error")
    }
}

#[derive(Debug, Default, Deserialize)]
struct ExceptionDetails {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    fn message(&self) -> String {
        if let Some(exception) = &self.exception {
            if let Some(value) = &exception.value {
                return value.to_string();
            }
            if let Some(description) = &exception.description {
                return description.clone();
            }
        }
        self.text.clone().unwrap_or_else(|| "Uncaught".to_string())
    }
}

impl ReplyOutcome {
    /// Decodes a reply envelope.
    #[must_use]
    pub fn decode(envelope: &Envelope) -> Self {
        if let Some(message) = envelope.error_message() {
            return Self::ProtocolError(message);
        }

        let raw = envelope.result.clone().unwrap_or_default();
        let evaluated = EvaluateResult::deserialize(&raw).unwrap_or_default();

        if let Some(object) = evaluated.result.as_ref().filter(|o| o.is_error()) {
            return Self::ErrorObject(object.description.clone().unwrap_or_default());
        }
        if let Some(details) = &evaluated.exception_details {
            return Self::Exception(details.message());
        }
        match evaluated.result {
            Some(object) if !object.kind.is_empty() => Self::Value(object.value.unwrap_or_default()),
            _ => Self::Raw(raw),
        }
    }

    /// Returns `true` for the three error variants.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ProtocolError(_) | Self::ErrorObject(_) | Self::Exception(_)
        )
    }

    /// Converts the outcome into the value delivered to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] for the error variants.
    pub fn into_result(self) -> Result<Value> {
        match self {
            Self::ProtocolError(message) | Self::ErrorObject(message) | Self::Exception(message) => {
                Err(Error::remote(message))
            }
            Self::Value(value) | Self::Raw(value) => Ok(value),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
