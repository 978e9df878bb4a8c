//! DevTools protocol message types.
//!
//! This module defines the JSON frames exchanged with the browser's
//! debugging endpoint.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`Request`] | Client → Browser | Command, wrapped in `Target.sendMessageToTarget` when session-scoped |
//! | [`Envelope`] | Browser → Client | Reply (`id`) or event (`method`) |
//! | [`SessionMessage`] | Browser → Client | Inner message of `Target.receivedMessageFromTarget` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Typed command definitions by domain |
//! | `event` | Event payloads |
//! | `message` | Inbound envelopes and reply decoding |
//! | `request` | Outbound request framing |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by domain.
pub mod command;

/// Event payload types.
pub mod event;

/// Inbound envelopes and reply decoding.
pub mod message;

/// Outbound request framing.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    BrowserCommand, Clip, Command, DomainCommand, EmulationCommand, NetworkCommand, PageCommand,
    Rgba, RuntimeCommand, TargetCommand,
};
pub use event::{BindingCall, SessionEvent};
pub use message::{Envelope, ReplyOutcome, SessionMessage};
pub use request::Request;
