//! Window geometry.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::WindowId;
use crate::protocol::{BrowserCommand, Command};

use super::Chrome;

// ============================================================================
// Types
// ============================================================================

/// Window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    /// Regular window with explicit geometry.
    #[default]
    Normal,
    /// Maximized.
    Maximized,
    /// Minimized.
    Minimized,
    /// Fullscreen.
    Fullscreen,
}

/// Position, size, and state of a browser window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    /// Left edge in screen pixels.
    #[serde(default)]
    pub left: i64,
    /// Top edge in screen pixels.
    #[serde(default)]
    pub top: i64,
    /// Width in pixels.
    #[serde(default)]
    pub width: i64,
    /// Height in pixels.
    #[serde(default)]
    pub height: i64,
    /// Window state.
    #[serde(default)]
    pub window_state: WindowState,
}

impl Bounds {
    /// Creates normal-state bounds.
    #[must_use]
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            window_state: WindowState::Normal,
        }
    }

    /// Creates bounds that only carry a state.
    #[must_use]
    pub fn with_state(window_state: WindowState) -> Self {
        Self {
            window_state,
            ..Self::default()
        }
    }

    /// Returns the `bounds` payload for `Browser.setWindowBounds`.
    ///
    /// A non-normal state is sent alone; the browser rejects geometry
    /// combined with it.
    pub(crate) fn to_params(self) -> Result<Value> {
        if self.window_state == WindowState::Normal {
            Ok(serde_json::to_value(self)?)
        } else {
            Ok(json!({ "windowState": self.window_state }))
        }
    }
}

#[derive(Debug, Deserialize)]
struct WindowForTarget {
    #[serde(rename = "windowId")]
    window_id: WindowId,
}

#[derive(Debug, Deserialize)]
struct WindowBounds {
    bounds: Bounds,
}

// ============================================================================
// Chrome - Window
// ============================================================================

impl Chrome {
    /// Returns the window hosting the page, resolving it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if `Browser.getWindowForTarget` fails, e.g. in
    /// headless mode on some browser versions.
    pub async fn window_id(&self) -> Result<WindowId> {
        let window_id = self
            .inner
            .window_id
            .get_or_try_init(|| async {
                let reply = self
                    .execute(Command::Browser(BrowserCommand::GetWindowForTarget {
                        target_id: self.target_id().clone(),
                    }))
                    .await?;
                let window = WindowForTarget::deserialize(&reply)?;
                debug!(window_id = %window.window_id, "Window resolved");
                Ok::<_, Error>(window.window_id)
            })
            .await?;
        Ok(*window_id)
    }

    /// Sets the window position, size, or state.
    ///
    /// # Example
    ///
    /// ```ignore
    /// chrome.set_bounds(Bounds::new(0, 0, 1280, 800)).await?;
    /// chrome.set_bounds(Bounds::with_state(WindowState::Maximized)).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be resolved or the browser
    /// rejects the bounds.
    pub async fn set_bounds(&self, bounds: Bounds) -> Result<()> {
        let window_id = self.window_id().await?;
        debug!(%window_id, ?bounds, "Setting window bounds");

        self.execute(Command::Browser(BrowserCommand::SetWindowBounds {
            window_id,
            bounds: bounds.to_params()?,
        }))
        .await?;
        Ok(())
    }

    /// Returns the window position, size, and state.
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be resolved or the reply is
    /// malformed.
    pub async fn bounds(&self) -> Result<Bounds> {
        let window_id = self.window_id().await?;
        let reply = self
            .execute(Command::Browser(BrowserCommand::GetWindowBounds { window_id }))
            .await?;
        Ok(WindowBounds::deserialize(&reply)?.bounds)
    }
}

// ============================================================================
// Tests
// ============================================================================
