//! DevTools transport layer.
//!
//! This module takes a browser from a binary path to an attached control
//! session, and then carries every command and event over one websocket.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Chrome (Rust)   │   stderr: "DevTools          │  Browser        │
//! │                  │◄─ listening on ws://..." ────│  process        │
//! │  Connection      │                              │                 │
//! │   └ event loop   │◄────────── WebSocket ───────►│  page target    │
//! │      Dispatcher  │   Target.sendMessageToTarget │   └ session     │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `handshake` - Spawn with `--remote-debugging-port=0`, read the endpoint from stderr
//! 2. `negotiate` - Discover the page target (id 0), attach a session (id 1)
//! 3. `Connection` - Start the event loop, enable domains, send commands
//! 4. `Connection::close` - Stop the loop, abort bindings, kill the browser
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `bridge` | Binding handlers and invocation tasks |
//! | `connection` | Connection state and event loop |
//! | `correlator` | Request ids and reply waiting |
//! | `dispatcher` | Inbound frame routing |
//! | `handshake` | Process spawn and endpoint discovery |
//! | `negotiate` | Target discovery and session attach |
//! | `process` | Browser process ownership |

// ============================================================================
// Submodules
// ============================================================================

/// Binding handlers and invocation tasks.
pub mod bridge;

/// Connection state and event loop.
pub mod connection;

/// Request ids and reply waiting.
pub(crate) mod correlator;

/// Inbound frame routing.
pub mod dispatcher;

/// Process spawn and endpoint discovery.
pub mod handshake;

/// Target discovery and session attach.
pub(crate) mod negotiate;

/// Browser process ownership.
pub mod process;

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::BindingHandler;
pub use connection::{
    Connection, ConnectionSettings, DEFAULT_COMMAND_TIMEOUT, DEFAULT_HANDSHAKE_TIMEOUT,
    EventHandler,
};
pub use dispatcher::PAGE_LOG_TARGET;
pub use handshake::parse_endpoint;
pub use process::ProcessGuard;
