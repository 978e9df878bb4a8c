//! Browser launch configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ChromeBuilder`] | Fluent launch builder |
//! | [`ChromeOptions`] | Command-line options |
//!
//! # Example
//!
//! ```no_run
//! use devtools_bridge::{Chrome, ChromeOptions, Result};
//!
//! # async fn example() -> Result<()> {
//! let options = ChromeOptions::new()
//!     .with_window_size(1280, 800)
//!     .with_url("https://example.com");
//!
//! let chrome = Chrome::builder()
//!     .binary("/usr/bin/chromium")
//!     .options(options)
//!     .launch()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for launching a browser.
pub mod builder;

/// Chrome command-line options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ChromeBuilder;
pub use options::{BLANK_URL, ChromeOptions, DEFAULT_ARGS};
