//! DevTools connection and event loop.
//!
//! A [`Connection`] owns the browser process, the websocket, and one
//! spawned event-loop task.
//!
//! # Event Loop
//!
//! The loop is the only reader and the only writer of the websocket. It
//! selects over:
//!
//! - Incoming frames, routed by the [`Dispatcher`]
//! - Outgoing frames from [`Correlator`]s, each registering its waiter
//!   before the frame is written
//!
//! When the loop ends (shutdown, page target destroyed, browser gone, or
//! every handle dropped) all pending callers receive
//! [`Error::ConnectionClosed`] and in-flight binding calls are aborted.

// ============================================================================
// Imports
// ============================================================================

use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::process::ChildStderr;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, SessionId, TargetId};
use crate::protocol::{Command, SessionEvent};

use super::bridge::{BindingHandler, BindingRegistry};
use super::correlator::{Correlator, LoopCommand, ReplySender};
use super::dispatcher::{Dispatcher, Flow};
use super::handshake::{self, WsStream};
use super::negotiate;
use super::process::{self, ProcessGuard};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for a single command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the browser to announce its endpoint.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// Map of request IDs to reply waiters.
type CorrelationMap = FxHashMap<RequestId, ReplySender>;

/// Event handler callback type.
///
/// Called on the event loop for every session event other than replies
/// and binding calls. Must not block.
pub type EventHandler = Box<dyn Fn(&SessionEvent) + Send + Sync>;

type SharedEventHandler = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

// ============================================================================
// ConnectionSettings
// ============================================================================

/// Timeouts applied while opening and using a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// How long to wait for the endpoint announcement.
    pub handshake_timeout: Duration,
    /// Default per-command deadline; `None` waits forever.
    pub command_timeout: Option<Duration>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
        }
    }
}

// ============================================================================
// ConnectionState
// ============================================================================

/// State shared between connection handles and the event loop.
#[derive(Default)]
pub(crate) struct ConnectionState {
    correlation: Mutex<CorrelationMap>,
    pub(crate) bindings: BindingRegistry,
    event_handler: Mutex<Option<SharedEventHandler>>,
}

impl ConnectionState {
    pub(crate) fn insert_waiter(&self, id: RequestId, tx: ReplySender) {
        self.correlation.lock().insert(id, tx);
    }

    pub(crate) fn take_waiter(&self, id: RequestId) -> Option<ReplySender> {
        self.correlation.lock().remove(&id)
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Wakes every pending caller with [`Error::ConnectionClosed`].
    fn fail_pending(&self) {
        let pending = std::mem::take(&mut *self.correlation.lock());
        if !pending.is_empty() {
            debug!(count = pending.len(), "Failing pending requests");
        }
        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }
    }

    pub(crate) fn set_event_handler(&self, handler: EventHandler) {
        *self.event_handler.lock() = Some(Arc::from(handler));
    }

    fn clear_event_handler(&self) {
        *self.event_handler.lock() = None;
    }

    /// Delivers `event` to the user handler, if any.
    pub(crate) fn emit(&self, event: &SessionEvent) {
        let handler = self.event_handler.lock().clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Control connection to a spawned browser.
///
/// Cheap to clone; all clones share one event loop. Dropping every clone
/// stops the loop and kills the browser.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    correlator: Correlator,
    state: Arc<ConnectionState>,
    process: Arc<Mutex<ProcessGuard>>,
    pid: u32,
    session_id: SessionId,
    target_id: TargetId,
    closed_rx: watch::Receiver<bool>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("pid", &self.inner.pid)
            .field("session_id", &self.inner.session_id)
            .field("target_id", &self.inner.target_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Connection {
    /// Launches `binary` and attaches to its first page.
    ///
    /// Spawns the process, waits for the endpoint line, connects,
    /// negotiates a session, starts the event loop, and enables the
    /// protocol domains the client relies on.
    ///
    /// # Errors
    ///
    /// - [`Error::ProcessLaunchFailed`] if the binary cannot be started
    /// - [`Error::Handshake`] / [`Error::HandshakeTimeout`] if no endpoint is announced
    /// - [`Error::Connection`] if the websocket cannot be opened
    /// - [`Error::Target`] if the session cannot be attached
    /// - Any error from the domain enable commands
    ///
    /// The process is killed before any error is returned.
    pub async fn open<I, S>(binary: &Path, args: I, settings: ConnectionSettings) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (mut process, stderr) = handshake::spawn(binary, args)?;

        let (ws, target_id, session_id) = match Self::establish(stderr, &settings).await {
            Ok(established) => established,
            Err(e) => {
                debug!(error = %e, "Connection setup failed, killing browser");
                process.kill().await;
                return Err(e);
            }
        };

        let connection = Self::start(ws, process, target_id, session_id, settings);

        for command in Command::startup_sequence() {
            if let Err(e) = connection.execute(command).await {
                error!(error = %e, "Failed to enable protocol domains");
                connection.close().await;
                return Err(e);
            }
        }

        info!(
            pid = connection.pid(),
            session_id = %connection.session_id(),
            "DevTools session ready"
        );
        Ok(connection)
    }

    async fn establish(
        stderr: ChildStderr,
        settings: &ConnectionSettings,
    ) -> Result<(WsStream, TargetId, SessionId)> {
        let url = handshake::await_endpoint(stderr, settings.handshake_timeout).await?;
        let mut ws = handshake::connect(&url).await?;
        let target_id = negotiate::discover_page_target(&mut ws).await?;
        let session_id = negotiate::attach(&mut ws, &target_id).await?;
        Ok((ws, target_id, session_id))
    }

    /// Starts the event loop on a negotiated websocket.
    fn start(
        ws: WsStream,
        process: ProcessGuard,
        target_id: TargetId,
        session_id: SessionId,
        settings: ConnectionSettings,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        let state = Arc::new(ConnectionState::default());
        let correlator = Correlator::new(command_tx, session_id.clone(), settings.command_timeout);

        let dispatcher = Dispatcher::new(
            Arc::clone(&state),
            correlator.downgrade(),
            session_id.clone(),
            target_id.clone(),
        );

        let pid = process.pid();
        let process = Arc::new(Mutex::new(process));

        tokio::spawn(run_event_loop(
            ws,
            command_rx,
            dispatcher,
            Arc::clone(&state),
            Arc::clone(&process),
            closed_tx,
        ));

        Self {
            inner: Arc::new(Inner {
                correlator,
                state,
                process,
                pid,
                session_id,
                target_id,
                closed_rx,
            }),
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Sends a raw session command with the default deadline.
    ///
    /// Returns the decoded reply: the evaluated value for
    /// `Runtime.evaluate`-style replies, the raw `result` object otherwise.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`] if the browser or page reported an error
    /// - [`Error::RequestTimeout`] if the deadline passes
    /// - [`Error::ConnectionClosed`] if the connection is gone
    /// - [`Error::Connection`] if the frame could not be written
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        self.inner.correlator.send(method, params).await
    }

    /// Sends a raw session command with an explicit deadline.
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub async fn send_with_timeout(
        &self,
        method: &str,
        params: Value,
        deadline: Option<Duration>,
    ) -> Result<Value> {
        self.inner
            .correlator
            .send_with_timeout(method, params, deadline)
            .await
    }

    /// Sends a typed command with the default deadline.
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub async fn execute(&self, command: Command) -> Result<Value> {
        self.inner.correlator.execute(command).await
    }

    // ========================================================================
    // Bindings and Events
    // ========================================================================

    /// Registers a binding handler, replacing any with the same name.
    ///
    /// This only affects host-side routing; see [`crate::Chrome::bind`] for
    /// the page side.
    ///
    /// Returns `true` if a handler with the same name was replaced.
    pub fn register_binding(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn BindingHandler>,
    ) -> bool {
        self.inner.state.bindings.insert(name, handler)
    }

    /// Removes the binding handler for `name`.
    ///
    /// Returns `true` if one was registered.
    pub fn unregister_binding(&self, name: &str) -> bool {
        self.inner.state.bindings.remove(name)
    }

    /// Sets the session event handler.
    pub fn set_event_handler(&self, handler: EventHandler) {
        self.inner.state.set_event_handler(handler);
    }

    /// Clears the session event handler.
    pub fn clear_event_handler(&self) {
        self.inner.state.clear_event_handler();
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the number of requests awaiting a reply.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.state.pending_count()
    }

    /// Returns the number of binding invocations still running.
    #[must_use]
    pub fn running_bindings(&self) -> usize {
        self.inner.state.bindings.running()
    }

    /// Returns the browser process ID.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.inner.pid
    }

    /// Returns the attached session.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.inner.session_id
    }

    /// Returns the attached page target.
    #[inline]
    #[must_use]
    pub fn target_id(&self) -> &TargetId {
        &self.inner.target_id
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Returns `true` once the event loop has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.inner.closed_rx.borrow()
    }

    /// Waits until the event loop has stopped.
    pub async fn closed(&self) {
        let mut closed_rx = self.inner.closed_rx.clone();
        // A dropped sender also means the loop is gone.
        let _ = closed_rx.wait_for(|closed| *closed).await;
    }

    /// Closes the connection and kills the browser.
    ///
    /// Stops the event loop, aborts and awaits in-flight binding calls,
    /// then kills and reaps the process. Safe to call more than once and
    /// after the browser already went away.
    ///
    /// Must not be awaited from inside a binding handler; spawn it instead.
    pub async fn close(&self) {
        if self.inner.correlator.request_shutdown() {
            debug!("Shutdown requested");
        }
        self.closed().await;

        self.inner.state.bindings.shutdown().await;

        let child = self.inner.process.lock().take();
        if let Some(child) = child {
            process::terminate(child, self.inner.pid).await;
        }
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Event loop that owns the websocket.
async fn run_event_loop(
    ws: WsStream,
    mut command_rx: mpsc::UnboundedReceiver<LoopCommand>,
    dispatcher: Dispatcher,
    state: Arc<ConnectionState>,
    process: Arc<Mutex<ProcessGuard>>,
    closed_tx: watch::Sender<bool>,
) {
    let (mut ws_write, mut ws_read) = ws.split();

    loop {
        tokio::select! {
            // Incoming frames from the browser
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if dispatcher.dispatch(&text) == Flow::Teardown {
                            let _ = ws_write.close().await;
                            process.lock().start_kill();
                            break;
                        }
                    }

                    Some(Ok(Message::Close(_))) => {
                        debug!("WebSocket closed by remote");
                        break;
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Commands from connection handles
            command = command_rx.recv() => {
                match command {
                    Some(LoopCommand::Send { id, frame, response_tx }) => {
                        handle_send(id, frame, response_tx, &mut ws_write, &state).await;
                    }

                    Some(LoopCommand::RemoveCorrelation(id)) => {
                        if state.take_waiter(id).is_some() {
                            debug!(%id, "Removed timed-out correlation");
                        }
                    }

                    Some(LoopCommand::Shutdown) => {
                        debug!("Shutdown command received");
                        let _ = ws_write.close().await;
                        break;
                    }

                    None => {
                        debug!("All connection handles dropped");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }

    command_rx.close();
    state.fail_pending();
    state.bindings.abort_all();
    let _ = closed_tx.send(true);

    debug!("Event loop terminated");
}

/// Registers the waiter, then writes the frame.
async fn handle_send<W>(
    id: RequestId,
    frame: String,
    response_tx: ReplySender,
    ws_write: &mut W,
    state: &ConnectionState,
) where
    W: Sink<Message, Error = WsError> + Unpin,
{
    state.insert_waiter(id, response_tx);

    if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
        error!(%id, error = %e, "Failed to write frame");
        if let Some(tx) = state.take_waiter(id) {
            let _ = tx.send(Err(Error::connection(format!("failed to write request {id}: {e}"))));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
