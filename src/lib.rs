//! DevTools Bridge - drive a local Chromium from Rust.
//!
//! This library launches a Chromium-family browser, attaches to its page
//! over the DevTools protocol, and lets page script call async Rust
//! functions.
//!
//! # Architecture
//!
//! - **Process**: the browser is spawned with `--remote-debugging-port=0`
//!   and announces its websocket endpoint on stderr
//! - **Session**: the first page target is attached; every page command
//!   travels wrapped in `Target.sendMessageToTarget`
//! - **Event loop**: one task owns the websocket, correlates replies to
//!   waiting callers, and routes page events
//! - **Bindings**: page calls to a bound name run the Rust handler on its
//!   own task and settle the page's promise with the result
//!
//! # Quick Start
//!
//! ```no_run
//! use devtools_bridge::{Chrome, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let chrome = Chrome::builder()
//!         .binary("/usr/bin/chromium")
//!         .window_size(800, 600)
//!         .launch()
//!         .await?;
//!
//!     chrome
//!         .bind_fn("add", |(a, b): (i64, i64)| -> Result<i64> { Ok(a + b) })
//!         .await?;
//!
//!     let sum = chrome.eval("add(2, 3)").await?;
//!     println!("2 + 3 = {sum}");
//!
//!     chrome.close().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | [`Chrome`] and its page, window, and capture operations |
//! | [`driver`] | Launch builder and command-line options |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | DevTools message types |
//! | [`transport`] | Process, handshake, and event loop |

// ============================================================================
// Modules
// ============================================================================

/// Browser handle and page operations.
pub mod browser;

/// Launch configuration.
///
/// Use [`Chrome::builder()`] to configure and launch a browser.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// DevTools protocol message types.
pub mod protocol;

/// DevTools transport layer.
///
/// Browser process, endpoint handshake, session negotiation, and the
/// event loop behind [`Connection`].
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{BindingArgs, Bounds, Chrome, Region, WindowState};

// Driver types
pub use driver::{ChromeBuilder, ChromeOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ExecutionContextId, RequestId, SessionId, TargetId, WindowId};

// Protocol types
pub use protocol::{BindingCall, Command, SessionEvent};

// Transport types
pub use transport::{BindingHandler, Connection, ConnectionSettings, EventHandler};
