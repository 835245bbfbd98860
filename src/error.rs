//! Error types for backlight detection.
//!
//! Errors only travel between collaborator traits and the probes that
//! consume them. The public query never returns one: every probe turns a
//! failure into a default (`false` or [`BacklightType::Undefined`]) and logs
//! it.
//!
//! [`BacklightType::Undefined`]: crate::BacklightType::Undefined

use std::fmt;
use thiserror::Error;

/// Primary error type for collaborator operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The collaborator does not exist on this platform.
    ///
    /// This is a normal condition, e.g. the vendor firmware query on a
    /// non-x86 machine.
    #[error("not available on this platform: {subsystem}")]
    NotAvailable {
        /// The subsystem that was requested.
        subsystem: Subsystem,
    },

    /// A firmware method returned a failure status.
    #[error("firmware error (status {code}): {message}")]
    Firmware {
        /// Raw status code reported by the firmware transport.
        code: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Walking the device namespace failed, either entirely or at one node.
    #[error("device namespace walk failed: {reason}")]
    Walk {
        /// Description of what went wrong.
        reason: String,
    },

    /// Invalid input was provided, e.g. an unknown backlight token.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Description of what was invalid.
        reason: String,
    },
}

/// Collaborator subsystems consulted during detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    /// Hierarchical firmware device namespace.
    DeviceNamespace,
    /// Vendor brightness-ownership firmware query.
    VendorFirmware,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNamespace => write!(f, "device namespace"),
            Self::VendorFirmware => write!(f, "vendor firmware"),
        }
    }
}

/// Result type alias for collaborator operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new `NotAvailable` error.
    #[must_use]
    pub const fn not_available(subsystem: Subsystem) -> Self {
        Self::NotAvailable { subsystem }
    }

    /// Create a new `Firmware` error from a status code.
    #[must_use]
    pub fn firmware(code: i32, message: impl Into<String>) -> Self {
        Self::Firmware {
            code,
            message: message.into(),
        }
    }

    /// Create a new `Walk` error.
    #[must_use]
    pub fn walk(reason: impl Into<String>) -> Self {
        Self::Walk {
            reason: reason.into(),
        }
    }

    /// Create a new `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Check if this error indicates the collaborator is absent.
    #[must_use]
    pub const fn is_not_available(&self) -> bool {
        matches!(self, Self::NotAvailable { .. })
    }
}
