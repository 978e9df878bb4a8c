//! Command definitions organized by protocol domain.
//!
//! Commands follow the DevTools `Domain.methodName` format.
//!
//! # Command Domains
//!
//! | Domain | Commands |
//! |--------|----------|
//! | `Target` | Discovery, attach, message forwarding, auto-attach |
//! | `Page` | Navigation, history, injected scripts, PDF, screenshots |
//! | `Runtime` | Evaluation, bindings |
//! | `Browser` | Window lookup and bounds |
//! | `Network` | Cache control |
//! | `Emulation` | Background override |
//! | `Security` / `Performance` / `Log` | Enable only |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{ExecutionContextId, SessionId, TargetId, WindowId};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by domain.
///
/// This enum wraps domain-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Command {
    /// Target domain commands.
    Target(TargetCommand),
    /// Page domain commands.
    Page(PageCommand),
    /// Runtime domain commands.
    Runtime(RuntimeCommand),
    /// Browser domain commands.
    Browser(BrowserCommand),
    /// Network domain commands.
    Network(NetworkCommand),
    /// Emulation domain commands.
    Emulation(EmulationCommand),
    /// Domains that are only ever enabled.
    Domain(DomainCommand),
}

impl Command {
    /// Splits the command into its method name and params object.
    ///
    /// Commands without params yield [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn into_parts(self) -> Result<(String, Value)> {
        let mut value = serde_json::to_value(self)?;
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| Error::protocol("command serialized without a method"))?;
        let params = value.get_mut("params").map(Value::take).unwrap_or_default();
        Ok((method, params))
    }

    /// Commands issued once the session is attached, in order.
    #[must_use]
    pub fn startup_sequence() -> Vec<Self> {
        vec![
            Self::Page(PageCommand::Enable),
            Self::Target(TargetCommand::SetAutoAttach {
                auto_attach: true,
                wait_for_debugger_on_start: false,
            }),
            Self::Network(NetworkCommand::Enable),
            Self::Runtime(RuntimeCommand::Enable),
            Self::Domain(DomainCommand::SecurityEnable),
            Self::Domain(DomainCommand::PerformanceEnable),
            Self::Domain(DomainCommand::LogEnable),
        ]
    }
}

// ============================================================================
// Target Commands
// ============================================================================

/// Target domain commands for discovery and session routing.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum TargetCommand {
    /// Start emitting `Target.targetCreated` for existing and new targets.
    #[serde(rename = "Target.setDiscoverTargets")]
    SetDiscoverTargets {
        /// Whether to discover.
        discover: bool,
    },

    /// Attach a session to a target.
    #[serde(rename = "Target.attachToTarget")]
    AttachToTarget {
        /// Target to attach to.
        #[serde(rename = "targetId")]
        target_id: TargetId,
    },

    /// Forward a serialized command into a session.
    #[serde(rename = "Target.sendMessageToTarget")]
    SendMessageToTarget {
        /// Serialized inner command.
        message: String,
        /// Session to route through.
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },

    /// Auto-attach to related targets.
    #[serde(rename = "Target.setAutoAttach")]
    SetAutoAttach {
        /// Whether to auto-attach.
        #[serde(rename = "autoAttach")]
        auto_attach: bool,
        /// Whether new targets start paused.
        #[serde(rename = "waitForDebuggerOnStart")]
        wait_for_debugger_on_start: bool,
    },
}

// ============================================================================
// Page Commands
// ============================================================================

/// Page domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Enable page events.
    #[serde(rename = "Page.enable")]
    Enable,

    /// Navigate to URL.
    #[serde(rename = "Page.navigate")]
    Navigate {
        /// URL to navigate to.
        url: String,
    },

    /// Reload current page.
    #[serde(rename = "Page.reload")]
    Reload,

    /// Read the session history.
    #[serde(rename = "Page.getNavigationHistory")]
    GetNavigationHistory,

    /// Jump to a history entry.
    #[serde(rename = "Page.navigateToHistoryEntry")]
    NavigateToHistoryEntry {
        /// Entry ID from the navigation history.
        #[serde(rename = "entryId")]
        entry_id: i64,
    },

    /// Install a script that runs on every new document.
    #[serde(rename = "Page.addScriptToEvaluateOnNewDocument")]
    AddScriptToEvaluateOnNewDocument {
        /// Script source.
        source: String,
    },

    /// Print the page to PDF.
    #[serde(rename = "Page.printToPDF")]
    PrintToPdf {
        /// Paper width in inches.
        #[serde(rename = "paperWidth")]
        paper_width: f64,
        /// Paper height in inches.
        #[serde(rename = "paperHeight")]
        paper_height: f64,
    },

    /// Capture a screenshot of a region.
    #[serde(rename = "Page.captureScreenshot")]
    CaptureScreenshot {
        /// Region to capture.
        clip: Clip,
    },
}

/// Screenshot clip region in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Clip {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
    /// Page scale factor.
    pub scale: f64,
}

// ============================================================================
// Runtime Commands
// ============================================================================

/// Runtime domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum RuntimeCommand {
    /// Enable runtime events.
    #[serde(rename = "Runtime.enable")]
    Enable,

    /// Evaluate an expression.
    #[serde(rename = "Runtime.evaluate")]
    Evaluate {
        /// JavaScript source.
        expression: String,
        /// Wait for a returned promise to settle.
        #[serde(rename = "awaitPromise", skip_serializing_if = "Option::is_none")]
        await_promise: Option<bool>,
        /// Return the value as JSON instead of a remote object.
        #[serde(rename = "returnByValue", skip_serializing_if = "Option::is_none")]
        return_by_value: Option<bool>,
        /// Execution context to evaluate in.
        #[serde(rename = "contextId", skip_serializing_if = "Option::is_none")]
        context_id: Option<ExecutionContextId>,
    },

    /// Expose a raw binding function on the page's global object.
    #[serde(rename = "Runtime.addBinding")]
    AddBinding {
        /// Global name of the binding.
        name: String,
    },
}

impl RuntimeCommand {
    /// Evaluates an expression, awaiting promises and returning by value.
    #[must_use]
    pub fn evaluate(expression: impl Into<String>) -> Self {
        Self::Evaluate {
            expression: expression.into(),
            await_promise: Some(true),
            return_by_value: Some(true),
            context_id: None,
        }
    }

    /// Evaluates an expression in a specific execution context.
    #[must_use]
    pub fn evaluate_in(expression: impl Into<String>, context_id: ExecutionContextId) -> Self {
        Self::Evaluate {
            expression: expression.into(),
            await_promise: None,
            return_by_value: None,
            context_id: Some(context_id),
        }
    }
}

// ============================================================================
// Browser Commands
// ============================================================================

/// Browser domain commands for window geometry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum BrowserCommand {
    /// Look up the window hosting a target.
    #[serde(rename = "Browser.getWindowForTarget")]
    GetWindowForTarget {
        /// Target to look up.
        #[serde(rename = "targetId")]
        target_id: TargetId,
    },

    /// Read window bounds.
    #[serde(rename = "Browser.getWindowBounds")]
    GetWindowBounds {
        /// Window to query.
        #[serde(rename = "windowId")]
        window_id: WindowId,
    },

    /// Set window bounds or state.
    #[serde(rename = "Browser.setWindowBounds")]
    SetWindowBounds {
        /// Window to modify.
        #[serde(rename = "windowId")]
        window_id: WindowId,
        /// Bounds object; may carry only `windowState`.
        bounds: Value,
    },
}

// ============================================================================
// Network Commands
// ============================================================================

/// Network domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum NetworkCommand {
    /// Enable network events.
    #[serde(rename = "Network.enable")]
    Enable,

    /// Toggle the HTTP cache.
    #[serde(rename = "Network.setCacheDisabled")]
    SetCacheDisabled {
        /// Whether the cache is bypassed.
        #[serde(rename = "cacheDisabled")]
        cache_disabled: bool,
    },
}

// ============================================================================
// Emulation Commands
// ============================================================================

/// Emulation domain commands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum EmulationCommand {
    /// Override the default page background.
    #[serde(rename = "Emulation.setDefaultBackgroundColorOverride")]
    SetDefaultBackgroundColorOverride {
        /// Background color.
        color: Rgba,
    },
}

/// RGBA color with alpha in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgba {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: f64,
}

impl Rgba {
    /// Converts a packed `0xAARRGGBB` color.
    #[must_use]
    pub fn from_argb(argb: u32) -> Self {
        let [a, r, g, b] = argb.to_be_bytes();
        Self {
            r,
            g,
            b,
            a: f64::from(a) / 255.0,
        }
    }
}

// ============================================================================
// Enable-only Domains
// ============================================================================

/// Domains the client only ever enables.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum DomainCommand {
    /// Enable security events.
    #[serde(rename = "Security.enable")]
    SecurityEnable,
    /// Enable performance metrics.
    #[serde(rename = "Performance.enable")]
    PerformanceEnable,
    /// Enable log entries.
    #[serde(rename = "Log.enable")]
    LogEnable,
}

// ============================================================================
// Tests
// ============================================================================
