//! Core Chrome struct, accessors, and lifecycle.

use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::driver::ChromeBuilder;
use crate::error::{Error, Result};
use crate::identifiers::{SessionId, TargetId, WindowId};
use crate::protocol::Command;
use crate::transport::{Connection, ConnectionSettings, EventHandler};

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a browser.
pub(crate) struct ChromeInner {
    /// DevTools connection.
    pub connection: Connection,
    /// Window hosting the page, resolved on first use.
    pub window_id: OnceCell<WindowId>,
    /// Temporary profile directory removed on close.
    user_data_dir: Mutex<Option<TempDir>>,
}

// ============================================================================
// Chrome
// ============================================================================

/// A handle to a running browser and its attached page.
///
/// Cheap to clone. The browser is killed by [`Chrome::close`], or when
/// the last handle is dropped.
///
/// # Example
///
/// ```no_run
/// use devtools_bridge::{Chrome, Result};
///
/// # async fn example() -> Result<()> {
/// let chrome = Chrome::builder()
///     .binary("/usr/bin/chromium")
///     .headless()
///     .launch()
///     .await?;
///
/// chrome.load("https://example.com").await?;
/// let title = chrome.eval("document.title").await?;
/// println!("{title}");
///
/// chrome.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Chrome {
    pub(crate) inner: Arc<ChromeInner>,
}

impl fmt::Debug for Chrome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chrome")
            .field("pid", &self.pid())
            .field("session_id", self.session_id())
            .field("window_id", &self.inner.window_id.get())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Chrome - Constructors
// ============================================================================

impl Chrome {
    /// Creates a builder with the default browser flags.
    #[must_use]
    pub fn builder() -> ChromeBuilder {
        ChromeBuilder::new()
    }

    /// Launches `binary` with exactly `args` and default timeouts.
    ///
    /// `args` must include `--remote-debugging-port=0` (or another way of
    /// making the browser print its endpoint on stderr).
    ///
    /// # Errors
    ///
    /// See [`Connection::open`].
    pub async fn with_args<I, S>(binary: impl AsRef<Path>, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let connection =
            Connection::open(binary.as_ref(), args, ConnectionSettings::default()).await?;
        Ok(Self::from_connection(connection, None))
    }

    /// Wraps an open connection.
    pub(crate) fn from_connection(connection: Connection, user_data_dir: Option<TempDir>) -> Self {
        debug!(pid = connection.pid(), "Chrome handle created");
        Self {
            inner: Arc::new(ChromeInner {
                connection,
                window_id: OnceCell::new(),
                user_data_dir: Mutex::new(user_data_dir),
            }),
        }
    }
}

// ============================================================================
// Chrome - Accessors
// ============================================================================

impl Chrome {
    /// Returns the underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// Returns the browser process ID.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.inner.connection.pid()
    }

    /// Returns the attached session.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        self.inner.connection.session_id()
    }

    /// Returns the attached page target.
    #[inline]
    #[must_use]
    pub fn target_id(&self) -> &TargetId {
        self.inner.connection.target_id()
    }

    /// Returns the temporary profile directory, if the builder created one.
    #[must_use]
    pub fn user_data_dir(&self) -> Option<std::path::PathBuf> {
        self.inner
            .user_data_dir
            .lock()
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
    }
}

// ============================================================================
// Chrome - Commands
// ============================================================================

impl Chrome {
    /// Sends a raw protocol command to the page session.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let metrics = chrome.send("Performance.getMetrics", Value::Null).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        self.inner.connection.send(method, params).await
    }

    /// Sends a typed command to the page session.
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub async fn execute(&self, command: Command) -> Result<Value> {
        self.inner.connection.execute(command).await
    }

    /// Sets the handler for console, exception, and other page events.
    pub fn set_event_handler(&self, handler: EventHandler) {
        self.inner.connection.set_event_handler(handler);
    }

    /// Removes the page event handler.
    pub fn clear_event_handler(&self) {
        self.inner.connection.clear_event_handler();
    }
}

// ============================================================================
// Chrome - Lifecycle
// ============================================================================

impl Chrome {
    /// Closes the connection, kills the browser, and removes the temporary
    /// profile directory.
    ///
    /// Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the temporary profile cannot be removed.
    pub async fn close(&self) -> Result<()> {
        debug!(pid = self.pid(), "Closing browser");
        self.inner.connection.close().await;

        let user_data_dir = self.inner.user_data_dir.lock().take();
        if let Some(dir) = user_data_dir {
            let path = dir.path().to_path_buf();
            tokio::task::spawn_blocking(move || dir.close())
                .await
                .map_err(|e| Error::Io(std::io::Error::other(e)))??;
            debug!(path = %path.display(), "Temporary profile removed");
        }

        info!(pid = self.pid(), "Browser closed");
        Ok(())
    }

    /// Alias for [`Chrome::close`].
    ///
    /// # Errors
    ///
    /// See [`Chrome::close`].
    pub async fn kill(&self) -> Result<()> {
        self.close().await
    }

    /// Waits until the connection is gone.
    ///
    /// Resolves when the page target is destroyed, the browser exits, or
    /// [`Chrome::close`] is called.
    pub async fn done(&self) {
        self.inner.connection.closed().await;
    }

    /// Returns `true` once the connection is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.connection.is_closed()
    }
}

// ============================================================================
// Tests
// ============================================================================
