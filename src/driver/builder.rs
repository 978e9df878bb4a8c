//! Builder pattern for launching a browser.
//!
//! Provides a fluent API for configuring and launching [`Chrome`] instances.
//!
//! # Example
//!
//! ```no_run
//! use devtools_bridge::Chrome;
//!
//! # async fn example() -> devtools_bridge::Result<()> {
//! let chrome = Chrome::builder()
//!     .binary("/usr/bin/chromium")
//!     .window_size(1024, 768)
//!     .launch()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::browser::Chrome;
use crate::error::{Error, Result};
use crate::transport::{Connection, ConnectionSettings};

use super::options::ChromeOptions;

// ============================================================================
// Constants
// ============================================================================

/// Prefix of temporary profile directories.
const TEMP_PROFILE_PREFIX: &str = "devtools-bridge";

// ============================================================================
// ChromeBuilder
// ============================================================================

/// Builder for launching a [`Chrome`] instance.
///
/// Use [`Chrome::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ChromeBuilder {
    /// Path to the browser binary.
    binary: Option<PathBuf>,
    /// Command-line options.
    options: ChromeOptions,
    /// Handshake and command deadlines.
    settings: ConnectionSettings,
}

// ============================================================================
// ChromeBuilder Implementation
// ============================================================================

impl ChromeBuilder {
    /// Creates a new builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the path to the browser executable.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the binary (e.g., "/usr/bin/chromium")
    #[inline]
    #[must_use]
    pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }

    /// Replaces all command-line options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ChromeOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the URL opened in app mode.
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.options = self.options.with_url(url);
        self
    }

    /// Uses a persistent profile directory instead of a temporary one.
    #[inline]
    #[must_use]
    pub fn user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options = self.options.with_user_data_dir(dir);
        self
    }

    /// Sets the window size in pixels.
    #[inline]
    #[must_use]
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.options = self.options.with_window_size(width, height);
        self
    }

    /// Runs without a visible window.
    #[inline]
    #[must_use]
    pub fn headless(mut self) -> Self {
        self.options = self.options.with_headless();
        self
    }

    /// Adds a custom command-line argument.
    #[inline]
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.options = self.options.with_arg(arg);
        self
    }

    /// Adds multiple custom command-line arguments.
    #[inline]
    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options = self.options.with_args(args);
        self
    }

    /// Sets how long to wait for the DevTools endpoint announcement.
    #[inline]
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.settings.handshake_timeout = timeout;
        self
    }

    /// Sets the default command deadline; `None` waits forever.
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.settings.command_timeout = timeout;
        self
    }

    /// Launches the browser and attaches to its page.
    ///
    /// Without a configured profile directory a temporary one is created
    /// and removed by [`Chrome::close`].
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if binary not set or options are invalid
    /// - [`Error::ChromeNotFound`] if binary path doesn't exist
    /// - [`Error::Io`] if the temporary profile cannot be created
    /// - Any error from [`Connection::open`]
    pub async fn launch(self) -> Result<Chrome> {
        let binary = self.validate_binary()?;
        self.options.validate().map_err(Error::config)?;

        let (profile, temp_dir) = match &self.options.user_data_dir {
            Some(dir) => (dir.clone(), None),
            None => {
                let dir = tempfile::Builder::new()
                    .prefix(TEMP_PROFILE_PREFIX)
                    .tempdir()?;
                (dir.path().to_path_buf(), Some(dir))
            }
        };

        let args = self.options.to_args(&profile);
        debug!(binary = %binary.display(), profile = %profile.display(), "Launching Chrome");

        let connection = Connection::open(&binary, &args, self.settings).await?;
        info!(pid = connection.pid(), "Chrome launched");

        Ok(Chrome::from_connection(connection, temp_dir))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ChromeBuilder {
    /// Validates the binary path configuration.
    fn validate_binary(&self) -> Result<PathBuf> {
        let binary = self.binary.clone().ok_or_else(|| {
            Error::config(
                "Chrome binary path is required. Use .binary() to set it.\n\
                 Example: Chrome::builder().binary(\"/usr/bin/chromium\")",
            )
        })?;

        if !binary.exists() {
            return Err(Error::chrome_not_found(&binary));
        }

        Ok(binary)
    }
}

// ============================================================================
// Tests
// ============================================================================
