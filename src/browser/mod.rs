//! Browser entities module.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Chrome`] | Running browser with its attached page |
//! | [`Bounds`] | Window position, size, and state |
//! | [`Region`] | Page area to capture |
//!
//! # Example
//!
//! ```no_run
//! use devtools_bridge::{Chrome, Result};
//!
//! # async fn example() -> Result<()> {
//! let chrome = Chrome::builder()
//!     .binary("/usr/bin/chromium")
//!     .launch()
//!     .await?;
//!
//! chrome.load("https://example.com").await?;
//! let heading = chrome.eval("document.querySelector('h1').textContent").await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Browser control through the attached page session.
pub mod chrome;

// ============================================================================
// Re-exports
// ============================================================================

pub use chrome::{BindingArgs, Bounds, Chrome, Region, WindowState};
