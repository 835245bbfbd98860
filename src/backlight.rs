//! Backlight interface kinds.
//!
//! [`BacklightType`] names every mechanism that can own display brightness.
//! Its textual form is the same token accepted on the boot command line, so
//! `Display` and `FromStr` round-trip for every selectable variant.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Which interface controls the display backlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BacklightType {
    /// Not decided yet. Only used internally and never returned by a query.
    #[default]
    Undefined,
    /// Vendor specific firmware methods (legacy laptops, platform drivers).
    Vendor,
    /// Generic platform-firmware video interface.
    Video,
    /// Brightness implemented directly by the GPU driver.
    Native,
    /// Vendor embedded-controller interface driven through firmware.
    VendorEmbeddedController,
    /// No backlight interface at all.
    None,
}

impl BacklightType {
    /// Every variant a query may return, in declaration order.
    pub const SELECTABLE: [Self; 5] = [
        Self::Vendor,
        Self::Video,
        Self::Native,
        Self::VendorEmbeddedController,
        Self::None,
    ];

    /// The command-line token for this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Vendor => "vendor",
            Self::Video => "video",
            Self::Native => "native",
            Self::VendorEmbeddedController => "nvidia_wmi_ec",
            Self::None => "none",
        }
    }

    /// Check whether a decision has been made.
    #[must_use]
    pub const fn is_defined(self) -> bool {
        !matches!(self, Self::Undefined)
    }

    /// Inverse of `ty as u8`. Unknown values decode as `Undefined`.
    pub(crate) const fn from_repr(raw: u8) -> Self {
        match raw {
            1 => Self::Vendor,
            2 => Self::Video,
            3 => Self::Native,
            4 => Self::VendorEmbeddedController,
            5 => Self::None,
            _ => Self::Undefined,
        }
    }

    /// Map a command-line token to a type.
    ///
    /// Matching is exact and case-sensitive. `"undefined"` is not a valid
    /// token: it cannot be selected from the outside.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "vendor" => Some(Self::Vendor),
            "video" => Some(Self::Video),
            "native" => Some(Self::Native),
            "nvidia_wmi_ec" => Some(Self::VendorEmbeddedController),
            "none" => Some(Self::None),
            _ => Option::None,
        }
    }
}

impl fmt::Display for BacklightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BacklightType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_token(s).ok_or_else(|| {
            Error::invalid_input(format!(
                "unknown backlight type {s:?}, expected one of vendor, video, native, nvidia_wmi_ec, none"
            ))
        })
    }
}
