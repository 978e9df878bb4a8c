//! Routing of inbound frames.
//!
//! The event loop hands every text frame to [`Dispatcher::dispatch`]. Only
//! two browser-level messages matter once the session is attached:
//!
//! | Method | Action |
//! |--------|--------|
//! | `Target.receivedMessageFromTarget` | Decode the inner message and route it |
//! | `Target.targetDestroyed` | Tear down if it names the attached target |
//!
//! Top-level replies (the browser acknowledging `Target.sendMessageToTarget`)
//! are ignored; the waiter is resolved by the inner reply carrying the same
//! id.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::identifiers::{SessionId, TargetId};
use crate::protocol::event::{ReceivedMessageFromTarget, TargetDestroyed, methods};
use crate::protocol::{BindingCall, Envelope, SessionEvent, SessionMessage};

use super::connection::ConnectionState;
use super::correlator::WeakCorrelator;

/// Tracing target for page console output and uncaught exceptions.
pub const PAGE_LOG_TARGET: &str = "devtools_bridge::page";

// ============================================================================
// Flow
// ============================================================================

/// What the event loop should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Keep reading.
    Continue,
    /// The page is gone; close everything.
    Teardown,
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes frames for one attached session.
pub(crate) struct Dispatcher {
    state: Arc<ConnectionState>,
    correlator: WeakCorrelator,
    session_id: SessionId,
    target_id: TargetId,
}

impl Dispatcher {
    /// Creates a dispatcher for the attached session.
    pub(crate) fn new(
        state: Arc<ConnectionState>,
        correlator: WeakCorrelator,
        session_id: SessionId,
        target_id: TargetId,
    ) -> Self {
        Self {
            state,
            correlator,
            session_id,
            target_id,
        }
    }

    /// Routes one text frame.
    pub(crate) fn dispatch(&self, text: &str) -> Flow {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                trace!(error = %e, "Ignoring undecodable frame");
                return Flow::Continue;
            }
        };

        if envelope.is_event(methods::RECEIVED_MESSAGE_FROM_TARGET) {
            self.route_forwarded(&envelope);
            Flow::Continue
        } else if envelope.is_event(methods::TARGET_DESTROYED) {
            self.check_destroyed(&envelope)
        } else {
            trace!(id = ?envelope.id, method = ?envelope.method, "Ignoring browser-level frame");
            Flow::Continue
        }
    }

    fn check_destroyed(&self, envelope: &Envelope) -> Flow {
        match envelope.params_as::<TargetDestroyed>() {
            Ok(destroyed) if destroyed.target_id == self.target_id => {
                info!(target_id = %self.target_id, "Page target destroyed");
                Flow::Teardown
            }
            Ok(destroyed) => {
                trace!(target_id = %destroyed.target_id, "Unrelated target destroyed");
                Flow::Continue
            }
            Err(e) => {
                debug!(error = %e, "Malformed targetDestroyed params");
                Flow::Continue
            }
        }
    }

    fn route_forwarded(&self, envelope: &Envelope) {
        let forwarded: ReceivedMessageFromTarget = match envelope.params_as() {
            Ok(forwarded) => forwarded,
            Err(e) => {
                debug!(error = %e, "Malformed receivedMessageFromTarget params");
                return;
            }
        };

        if forwarded.session_id != self.session_id {
            trace!(session_id = %forwarded.session_id, "Dropping message for stale session");
            return;
        }

        match SessionMessage::parse(&forwarded.message) {
            Ok(message) => self.route_session(message),
            Err(e) => warn!(error = %e, "Dropping malformed session message"),
        }
    }

    fn route_session(&self, message: SessionMessage) {
        match message {
            SessionMessage::Reply { id, outcome } => match self.state.take_waiter(id) {
                Some(tx) => {
                    trace!(%id, error = outcome.is_error(), "Reply received");
                    let _ = tx.send(outcome.into_result());
                }
                None => debug!(%id, "Reply for unknown request"),
            },

            SessionMessage::Console(event) => {
                let kind = event
                    .params
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("log");
                info!(target: PAGE_LOG_TARGET, kind, "{}", event.console_text());
                self.state.emit(&event);
            }

            SessionMessage::Exception(event) => {
                warn!(target: PAGE_LOG_TARGET, "Uncaught exception: {}", exception_text(&event));
                self.state.emit(&event);
            }

            SessionMessage::BindingCalled(call) => self.route_binding(call),

            SessionMessage::Event(event) => {
                trace!(method = %event.method, "Session event");
                self.state.emit(&event);
            }
        }
    }

    fn route_binding(&self, call: BindingCall) {
        let Some(handler) = self.state.bindings.get(&call.name) else {
            debug!(name = %call.name, "Call for unregistered binding");
            return;
        };
        let Some(correlator) = self.correlator.upgrade() else {
            debug!(name = %call.name, "Connection closing, binding call dropped");
            return;
        };
        self.state.bindings.spawn(handler, call, correlator);
    }
}

/// Renders the description of a `Runtime.exceptionThrown` event.
fn exception_text(event: &SessionEvent) -> String {
    let details = &event.params["exceptionDetails"];
    details["exception"]["description"]
        .as_str()
        .or_else(|| details["text"].as_str())
        .unwrap_or("Uncaught")
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================
