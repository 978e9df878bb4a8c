//! Navigation and script evaluation.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::protocol::{Command, NetworkCommand, PageCommand, RuntimeCommand};

use super::Chrome;

// ============================================================================
// Scripts
// ============================================================================

/// Suppresses the native context menu.
const DISABLE_CONTEXT_MENU_SCRIPT: &str =
    "window.addEventListener('contextmenu', (e) => e.preventDefault(), true);";

/// Suppresses browser shortcuts that would open, close, or reload windows.
const DISABLE_SHORTCUTS_SCRIPT: &str = r"window.addEventListener('keydown', (e) => {
  const key = e.key.toLowerCase();
  const mod = e.ctrlKey || e.metaKey;
  if (mod && ['n', 't', 'w', 'r', 'p', 's', 'o', 'u', 'j', 'h', 'f', 'g', 'l', '+', '-', '=', '0'].includes(key)) e.preventDefault();
  if (['f3', 'f5', 'f6', 'f7', 'f11', 'f12'].includes(key)) e.preventDefault();
  if (e.altKey && ['arrowleft', 'arrowright', 'home'].includes(key)) e.preventDefault();
}, true);";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct NavigateResult {
    #[serde(rename = "errorText", default)]
    error_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NavigationHistory {
    #[serde(rename = "currentIndex")]
    current_index: i64,
    entries: Vec<NavigationEntry>,
}

#[derive(Debug, Deserialize)]
struct NavigationEntry {
    id: i64,
}

// ============================================================================
// Chrome - Script Execution
// ============================================================================

impl Chrome {
    /// Evaluates a JavaScript expression in the page.
    ///
    /// Promises are awaited and the result is returned by value.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let sum = chrome.eval("1 + 2").await?;
    /// assert_eq!(sum, 3);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] if the expression throws or evaluates to
    /// an `Error` object.
    pub async fn eval(&self, expression: &str) -> Result<Value> {
        debug!(expr_len = expression.len(), "Evaluating expression");
        self.execute(Command::Runtime(RuntimeCommand::evaluate(expression)))
            .await
    }

    /// Installs a script that runs on every new document, and runs it now.
    ///
    /// # Errors
    ///
    /// Returns an error if either the install or the immediate run fails.
    pub async fn add_script_to_evaluate_on_new_document(&self, script: &str) -> Result<()> {
        self.execute(Command::Page(PageCommand::AddScriptToEvaluateOnNewDocument {
            source: script.to_string(),
        }))
        .await?;
        self.eval(script).await?;
        Ok(())
    }

    /// Disables the native context menu on right click.
    ///
    /// # Errors
    ///
    /// See [`Chrome::add_script_to_evaluate_on_new_document`].
    pub async fn disable_context_menu(&self) -> Result<()> {
        self.add_script_to_evaluate_on_new_document(DISABLE_CONTEXT_MENU_SCRIPT)
            .await
    }

    /// Disables default browser shortcuts such as `Ctrl+N`.
    ///
    /// # Errors
    ///
    /// See [`Chrome::add_script_to_evaluate_on_new_document`].
    pub async fn disable_default_shortcuts(&self) -> Result<()> {
        self.add_script_to_evaluate_on_new_document(DISABLE_SHORTCUTS_SCRIPT)
            .await
    }
}

// ============================================================================
// Chrome - Navigation
// ============================================================================

impl Chrome {
    /// Navigates the page to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] if the browser rejects the URL or the
    /// navigation reports an `errorText`.
    pub async fn load(&self, url: &str) -> Result<()> {
        debug!(url, "Navigating");

        let reply = self
            .execute(Command::Page(PageCommand::Navigate {
                url: url.to_string(),
            }))
            .await?;

        let result = NavigateResult::deserialize(&reply).unwrap_or_default();
        match result.error_text.filter(|text| !text.is_empty()) {
            Some(text) => Err(Error::remote(text)),
            None => Ok(()),
        }
    }

    /// Loads an HTML document through a `data:` URL.
    ///
    /// # Errors
    ///
    /// See [`Chrome::load`].
    pub async fn load_html(&self, html: &str) -> Result<()> {
        debug!(html_len = html.len(), "Loading HTML content");
        self.load(&html_data_url(html)).await
    }

    /// Reloads the page, optionally bypassing the HTTP cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache toggle or the reload fails.
    pub async fn reload(&self, disable_cache: bool) -> Result<()> {
        if disable_cache {
            self.set_cache_disabled(true).await?;
        }

        let reloaded = self.execute(Command::Page(PageCommand::Reload)).await;

        if disable_cache && let Err(e) = self.set_cache_disabled(false).await {
            warn!(error = %e, "Failed to re-enable HTTP cache");
        }
        reloaded.map(|_| ())
    }

    /// Navigates one entry back in history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if there is no previous entry.
    pub async fn back(&self) -> Result<()> {
        self.go_delta(-1).await
    }

    /// Navigates one entry forward in history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if there is no next entry.
    pub async fn forward(&self) -> Result<()> {
        self.go_delta(1).await
    }

    async fn go_delta(&self, delta: i64) -> Result<()> {
        let reply = self
            .execute(Command::Page(PageCommand::GetNavigationHistory))
            .await?;
        let history = NavigationHistory::deserialize(&reply)?;

        let entry_id = history_target(&history, delta)?;
        debug!(delta, entry_id, "Navigating history");

        self.execute(Command::Page(PageCommand::NavigateToHistoryEntry { entry_id }))
            .await?;
        Ok(())
    }

    async fn set_cache_disabled(&self, cache_disabled: bool) -> Result<()> {
        self.execute(Command::Network(NetworkCommand::SetCacheDisabled {
            cache_disabled,
        }))
        .await?;
        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Builds a `data:text/html` URL for `html`.
pub(crate) fn html_data_url(html: &str) -> String {
    format!("data:text/html,{}", urlencoding::encode(html))
}

/// Resolves the history entry `delta` steps from the current one.
fn history_target(history: &NavigationHistory, delta: i64) -> Result<i64> {
    let len = history.entries.len();
    let index = history.current_index + delta;

    usize::try_from(index)
        .ok()
        .and_then(|i| history.entries.get(i))
        .map(|entry| entry.id)
        .ok_or_else(|| {
            Error::invalid_argument(format!(
                "invalid delta {delta}, would navigate to {index} which is outside of history length of {len}"
            ))
        })
}

// ============================================================================
// Tests
// ============================================================================
