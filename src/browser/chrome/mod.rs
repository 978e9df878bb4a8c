//! Browser control through an attached page session.
//!
//! A [`Chrome`] wraps one [`crate::transport::Connection`] and adds the
//! page-level operations.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Chrome struct, accessors, raw commands, lifecycle |
//! | `page` | Navigation, history, script evaluation |
//! | `binding` | Host functions callable from page script |
//! | `window` | Window bounds and state |
//! | `capture` | PDF and PNG capture |
//!
//! # Example
//!
//! ```ignore
//! let chrome = Chrome::builder().binary("/usr/bin/chromium").launch().await?;
//!
//! // Navigate
//! chrome.load_html("<h1>Hello</h1>").await?;
//!
//! // Call Rust from the page
//! chrome.bind_fn("add", |(a, b): (i64, i64)| -> Result<i64> { Ok(a + b) }).await?;
//! assert_eq!(chrome.eval("add(2, 3)").await?, 5);
//!
//! // Window
//! chrome.set_bounds(Bounds::new(0, 0, 1024, 768)).await?;
//!
//! chrome.close().await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod binding;
mod capture;
mod core;
mod page;
mod window;

// ============================================================================
// Re-exports
// ============================================================================

pub use binding::BindingArgs;
pub use capture::Region;
pub use core::Chrome;
pub use window::{Bounds, WindowState};
