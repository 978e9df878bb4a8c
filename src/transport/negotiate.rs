//! Target discovery and session attach.
//!
//! Runs directly on the websocket before the event loop starts, using the
//! reserved request ids [`RequestId::DISCOVER`] and [`RequestId::ATTACH`].

// ============================================================================
// Imports
// ============================================================================

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, SessionId, TargetId};
use crate::protocol::event::{TargetCreated, methods};
use crate::protocol::{Command, Envelope, Request, TargetCommand};

// ============================================================================
// Negotiation
// ============================================================================

/// Enables target discovery and waits for the first page target.
///
/// # Errors
///
/// - [`Error::ConnectionClosed`] if the stream ends first
/// - [`Error::WebSocket`] on transport failure
pub(crate) async fn discover_page_target<S>(ws: &mut S) -> Result<TargetId>
where
    S: Stream<Item = std::result::Result<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Unpin,
{
    write(
        ws,
        RequestId::DISCOVER,
        Command::Target(TargetCommand::SetDiscoverTargets { discover: true }),
    )
    .await?;

    loop {
        let envelope = next_envelope(ws).await?;
        if !envelope.is_event(methods::TARGET_CREATED) {
            continue;
        }
        let created: TargetCreated = envelope.params_as()?;
        if created.target_info.is_page() {
            debug!(target_id = %created.target_info.target_id, "Page target discovered");
            return Ok(created.target_info.target_id);
        }
        trace!(kind = %created.target_info.target_type, "Skipping non-page target");
    }
}

/// Attaches a session to `target_id`.
///
/// # Errors
///
/// - [`Error::Target`] if the browser rejects the attach
/// - [`Error::ConnectionClosed`] if the stream ends first
/// - [`Error::WebSocket`] on transport failure
pub(crate) async fn attach<S>(ws: &mut S, target_id: &TargetId) -> Result<SessionId>
where
    S: Stream<Item = std::result::Result<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Unpin,
{
    write(
        ws,
        RequestId::ATTACH,
        Command::Target(TargetCommand::AttachToTarget {
            target_id: target_id.clone(),
        }),
    )
    .await?;

    loop {
        let envelope = next_envelope(ws).await?;
        if envelope.id != Some(RequestId::ATTACH) {
            continue;
        }
        if let Some(error) = envelope.error.as_ref().filter(|e| !e.is_null()) {
            return Err(Error::target(error.to_string()));
        }

        let session_id = envelope
            .result
            .as_ref()
            .and_then(|r| r.get("sessionId"))
            .and_then(|s| s.as_str())
            .ok_or_else(|| Error::target("attach reply has no sessionId"))?;

        debug!(session_id, "Session attached");
        return Ok(SessionId::new(session_id));
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn write<S>(ws: &mut S, id: RequestId, command: Command) -> Result<()>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    let frame = Request::from_command(id, command)?.to_frame()?;
    ws.send(Message::Text(frame.into())).await?;
    Ok(())
}

/// Reads the next text frame that decodes as an envelope.
async fn next_envelope<S>(ws: &mut S) -> Result<Envelope>
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => match Envelope::parse(&text) {
                Ok(envelope) => return Ok(envelope),
                Err(e) => trace!(error = %e, "Skipping undecodable frame"),
            },
            Some(Ok(Message::Close(_))) | None => return Err(Error::ConnectionClosed),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
