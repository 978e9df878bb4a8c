//! Type-safe identifiers for protocol entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Wire form | Source |
//! |------|-----------|--------|
//! | [`RequestId`] | integer | Allocated locally, monotonic per connection |
//! | [`TargetId`] | string | `Target.targetCreated` |
//! | [`SessionId`] | string | `Target.attachToTarget` reply |
//! | [`WindowId`] | integer | `Browser.getWindowForTarget` reply |
//! | [`ExecutionContextId`] | integer | `Runtime.bindingCalled` event |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// RequestId
// ============================================================================

/// Identifier correlating a command with its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Id of the `Target.setDiscoverTargets` command sent during negotiation.
    pub const DISCOVER: Self = Self(0);

    /// Id of the `Target.attachToTarget` command sent during negotiation.
    pub const ATTACH: Self = Self(1);

    /// Creates a request ID from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// String IDs
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from its wire value.
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the wire value.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }
    };
}

string_id!(
    /// Identifier of an attachable page-like target.
    TargetId
);

string_id!(
    /// Identifier of an attached control session.
    SessionId
);

// ============================================================================
// Integer IDs
// ============================================================================

/// Browser window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(i64);

impl WindowId {
    /// Creates a window ID from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// JavaScript execution context identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContextId(i64);

impl ExecutionContextId {
    /// Creates a context ID from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ExecutionContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_serializes_as_integer() {
        let json = serde_json::to_string(&RequestId::new(42)).expect("serialize");
        assert_eq!(json, "42");
    }

    #[test]
    fn test_negotiation_ids_are_reserved() {
        assert_eq!(RequestId::DISCOVER.as_u64(), 0);
        assert_eq!(RequestId::ATTACH.as_u64(), 1);
    }

    #[test]
    fn test_session_id_roundtrip() {
        let id: SessionId = serde_json::from_str("\"ABC123\"").expect("parse");
        assert_eq!(id.as_str(), "ABC123");
        assert_eq!(id.to_string(), "ABC123");
        assert!(id == *"ABC123");
    }

    #[test]
    fn test_window_id_display() {
        assert_eq!(WindowId::new(3).to_string(), "3");
        assert_eq!(ExecutionContextId::new(9).to_string(), "9");
    }
}
