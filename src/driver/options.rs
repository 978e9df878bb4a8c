//! Chrome command-line options.
//!
//! Provides a type-safe interface for the flags a launched browser gets:
//! the fixed set that keeps background services quiet, the app URL,
//! profile directory, window size, and any extra arguments.
//!
//! # Example
//!
//! ```ignore
//! use devtools_bridge::ChromeOptions;
//!
//! let options = ChromeOptions::new()
//!     .with_headless()
//!     .with_window_size(1280, 800)
//!     .with_url("https://example.com");
//!
//! let args = options.to_args(Path::new("/tmp/profile"));
//! // [..defaults, "--app=https://example.com", "--user-data-dir=/tmp/profile",
//! //  "--window-size=1280,800", "--headless", "--remote-debugging-port=0"]
//! ```

use std::path::{Path, PathBuf};

// ============================================================================
// Constants
// ============================================================================

/// Flags passed to every launched browser.
pub const DEFAULT_ARGS: &[&str] = &[
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-breakpad",
    "--disable-client-side-phishing-detection",
    "--disable-default-apps",
    "--disable-dev-shm-usage",
    "--disable-infobars",
    "--disable-extensions",
    "--disable-features=site-per-process",
    "--disable-hang-monitor",
    "--disable-ipc-flooding-protection",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--disable-renderer-backgrounding",
    "--disable-sync",
    "--disable-translate",
    "--disable-windows10-custom-titlebar",
    "--metrics-recording-only",
    "--no-first-run",
    "--no-default-browser-check",
    "--safebrowsing-disable-auto-update",
    "--disable-automation",
    "--password-store=basic",
    "--use-mock-keychain",
];

/// Page shown when no URL is configured.
pub const BLANK_URL: &str = "data:text/html,<html></html>";

/// Makes the browser pick a free port and announce it on stderr.
pub const REMOTE_DEBUGGING_ARG: &str = "--remote-debugging-port=0";

// ============================================================================
// ChromeOptions
// ============================================================================

/// Chrome process configuration options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChromeOptions {
    /// URL opened in app mode; [`BLANK_URL`] when unset.
    pub url: Option<String>,

    /// Persistent profile directory; a temporary one is used when unset.
    pub user_data_dir: Option<PathBuf>,

    /// Window dimensions in pixels (width, height).
    pub window_size: Option<(u32, u32)>,

    /// Run without a visible window.
    pub headless: bool,

    /// Additional custom command-line arguments.
    pub extra_args: Vec<String>,
}

// ============================================================================
// Constructors
// ============================================================================

impl ChromeOptions {
    /// Creates a new options instance with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            url: None,
            user_data_dir: None,
            window_size: None,
            headless: false,
            extra_args: Vec::new(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ChromeOptions {
    /// Sets the URL opened in app mode.
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Uses a persistent profile directory.
    #[inline]
    #[must_use]
    pub fn with_user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    /// Sets window size in pixels.
    #[inline]
    #[must_use]
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = Some((width, height));
        self
    }

    /// Enables headless mode.
    #[inline]
    #[must_use]
    pub fn with_headless(mut self) -> Self {
        self.headless = true;
        self
    }

    /// Adds a custom command-line argument.
    #[inline]
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Adds multiple custom command-line arguments.
    #[inline]
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl ChromeOptions {
    /// Converts options to command-line arguments.
    ///
    /// `user_data_dir` is the profile directory actually used, which is
    /// the configured one or a temporary directory.
    #[must_use]
    pub fn to_args(&self, user_data_dir: &Path) -> Vec<String> {
        let mut args = Vec::with_capacity(DEFAULT_ARGS.len() + 5 + self.extra_args.len());
        args.extend(DEFAULT_ARGS.iter().map(|arg| (*arg).to_string()));

        args.push(format!("--app={}", self.url.as_deref().unwrap_or(BLANK_URL)));
        args.push(format!("--user-data-dir={}", user_data_dir.display()));

        if let Some((width, height)) = self.window_size {
            args.push(format!("--window-size={width},{height}"));
        }

        if self.headless {
            args.push("--headless".to_string());
        }

        args.extend(self.extra_args.iter().cloned());
        args.push(REMOTE_DEBUGGING_ARG.to_string());
        args
    }

    /// Validates the options configuration.
    ///
    /// # Errors
    ///
    /// Returns error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if let Some((width, height)) = self.window_size
            && (width == 0 || height == 0)
        {
            return Err("Window dimensions must be greater than zero".to_string());
        }
        if self
            .extra_args
            .iter()
            .any(|arg| arg.starts_with("--remote-debugging-port"))
        {
            return Err("--remote-debugging-port is managed by the launcher".to_string());
        }
        Ok(())
    }

    /// Returns `true` if headless mode is enabled.
    #[inline]
    #[must_use]
    pub const fn is_headless(&self) -> bool {
        self.headless
    }
}

// ============================================================================
// Tests
// ============================================================================
