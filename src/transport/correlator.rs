//! Request id allocation and reply waiting.
//!
//! A [`Correlator`] is the sending half of a connection. It frames each
//! command for the attached session, hands the frame to the event loop
//! together with a oneshot waiter, and blocks until the dispatcher
//! delivers the reply, the deadline passes, or the loop ends.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, SessionId};
use crate::protocol::{Command, Request};

// ============================================================================
// Types
// ============================================================================

/// Waiter for a single reply.
pub(crate) type ReplySender = oneshot::Sender<Result<Value>>;

/// Internal commands for the event loop.
pub(crate) enum LoopCommand {
    /// Register a waiter and write a frame.
    Send {
        id: RequestId,
        frame: String,
        response_tx: ReplySender,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(RequestId),
    /// Close the websocket and stop the loop.
    Shutdown,
}

// ============================================================================
// Correlator
// ============================================================================

/// Sends session-scoped commands and waits for their replies.
#[derive(Clone)]
pub(crate) struct Correlator {
    command_tx: mpsc::UnboundedSender<LoopCommand>,
    next_id: Arc<AtomicU64>,
    session_id: SessionId,
    command_timeout: Option<Duration>,
}

impl Correlator {
    /// Creates a correlator. The counter holds [`RequestId::ATTACH`] + 1 and
    /// is pre-incremented, so the first id is 3.
    pub(crate) fn new(
        command_tx: mpsc::UnboundedSender<LoopCommand>,
        session_id: SessionId,
        command_timeout: Option<Duration>,
    ) -> Self {
        Self {
            command_tx,
            next_id: Arc::new(AtomicU64::new(RequestId::ATTACH.as_u64() + 1)),
            session_id,
            command_timeout,
        }
    }

    /// Allocates the next request id.
    fn allocate(&self) -> RequestId {
        RequestId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Sends `method` with the connection's default deadline.
    pub(crate) async fn send(&self, method: &str, params: Value) -> Result<Value> {
        self.send_with_timeout(method, params, self.command_timeout)
            .await
    }

    /// Sends `method` and waits up to `deadline` (forever when `None`).
    pub(crate) async fn send_with_timeout(
        &self,
        method: &str,
        params: Value,
        deadline: Option<Duration>,
    ) -> Result<Value> {
        let request = Request::new(self.allocate(), method, params);
        self.dispatch(request, deadline).await
    }

    /// Sends a typed command with the default deadline.
    pub(crate) async fn execute(&self, command: Command) -> Result<Value> {
        let request = Request::from_command(self.allocate(), command)?;
        self.dispatch(request, self.command_timeout).await
    }

    async fn dispatch(&self, request: Request, deadline: Option<Duration>) -> Result<Value> {
        let id = request.id;
        let frame = request.to_session_frame(&self.session_id)?;
        debug!(%id, method = %request.method, "Sending command");

        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(LoopCommand::Send {
                id,
                frame,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        let Some(deadline) = deadline else {
            return response_rx.await.map_err(|_| Error::ConnectionClosed)?;
        };

        match timeout(deadline, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = self.command_tx.send(LoopCommand::RemoveCorrelation(id));
                Err(Error::request_timeout(id, deadline.as_millis() as u64))
            }
        }
    }

    /// Asks the event loop to close the websocket and stop.
    ///
    /// Returns `false` if the loop is already gone.
    pub(crate) fn request_shutdown(&self) -> bool {
        self.command_tx.send(LoopCommand::Shutdown).is_ok()
    }

    /// Returns a handle that does not keep the event loop alive.
    pub(crate) fn downgrade(&self) -> WeakCorrelator {
        WeakCorrelator {
            command_tx: self.command_tx.downgrade(),
            next_id: Arc::clone(&self.next_id),
            session_id: self.session_id.clone(),
            command_timeout: self.command_timeout,
        }
    }
}

// ============================================================================
// WeakCorrelator
// ============================================================================

/// Non-owning correlator held by the event loop itself.
#[derive(Clone)]
pub(crate) struct WeakCorrelator {
    command_tx: mpsc::WeakUnboundedSender<LoopCommand>,
    next_id: Arc<AtomicU64>,
    session_id: SessionId,
    command_timeout: Option<Duration>,
}

impl WeakCorrelator {
    /// Upgrades to a full correlator while any owner is alive.
    pub(crate) fn upgrade(&self) -> Option<Correlator> {
        let Some(command_tx) = self.command_tx.upgrade() else {
            trace!("Correlator owners are gone");
            return None;
        };
        Some(Correlator {
            command_tx,
            next_id: Arc::clone(&self.next_id),
            session_id: self.session_id.clone(),
            command_timeout: self.command_timeout,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
