//! Boot command-line override.
//!
//! The user can force an interface with `acpi_backlight=<token>`. An
//! unrecognised token is not an error: detection falls back to the
//! normal path and a warning is logged.

use crate::backlight::BacklightType;
use tracing::{debug, warn};

/// Boot parameter carrying the override token.
pub const CMDLINE_PARAM: &str = "acpi_backlight";

/// A raw command-line override token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLineOverride {
    token: Option<String>,
}

impl CommandLineOverride {
    /// Wrap a bare token such as `"native"`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// No override given.
    #[must_use]
    pub const fn unset() -> Self {
        Self { token: None }
    }

    /// Extract the token from a full boot command line.
    ///
    /// The last `acpi_backlight=` occurrence wins, matching how repeated
    /// boot parameters are applied. Values may be double-quoted.
    ///
    /// ```
    /// use backlight_detect::{BacklightType, CommandLineOverride};
    ///
    /// let cmdline = "root=/dev/sda1 quiet acpi_backlight=native splash";
    /// let ovr = CommandLineOverride::from_kernel_cmdline(cmdline);
    /// assert_eq!(ovr.resolve(), BacklightType::Native);
    /// ```
    #[must_use]
    pub fn from_kernel_cmdline(cmdline: &str) -> Self {
        let token = cmdline
            .split_whitespace()
            .filter_map(|param| param.split_once('='))
            .filter(|(key, _)| *key == CMDLINE_PARAM)
            .map(|(_, value)| value.trim_matches('"').to_string())
            .last();
        Self { token }
    }

    /// The raw token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Map the token to a backlight type.
    ///
    /// Returns [`BacklightType::Undefined`] when no token was given or the
    /// token is not recognised.
    #[must_use]
    pub fn resolve(&self) -> BacklightType {
        let Some(token) = self.token.as_deref() else {
            return BacklightType::Undefined;
        };
        if let Some(ty) = BacklightType::from_token(token) {
            debug!(%ty, "backlight type forced on command line");
            return ty;
        }
        if !token.is_empty() {
            warn!(
                token = %token,
                "ignoring unrecognised acpi_backlight value, falling back to autodetection"
            );
        }
        BacklightType::Undefined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_all_tokens_resolve() {
        let cases = [
            ("vendor", BacklightType::Vendor),
            ("video", BacklightType::Video),
            ("native", BacklightType::Native),
            ("nvidia_wmi_ec", BacklightType::VendorEmbeddedController),
            ("none", BacklightType::None),
        ];
        for (token, expected) in cases {
            assert_eq!(CommandLineOverride::new(token).resolve(), expected);
        }
    }

    #[test]
    fn test_unset_is_undefined() {
        assert_eq!(CommandLineOverride::unset().resolve(), BacklightType::Undefined);
        assert_eq!(CommandLineOverride::default().token(), None);
    }

    #[test]
    fn test_empty_token_is_undefined() {
        assert_eq!(CommandLineOverride::new("").resolve(), BacklightType::Undefined);
    }

    #[traced_test]
    #[test]
    fn test_unknown_token_warns_and_falls_back() {
        let ovr = CommandLineOverride::new("acpi");
        assert_eq!(ovr.resolve(), BacklightType::Undefined);
        assert!(logs_contain("ignoring unrecognised"));
    }

    #[test]
    fn test_kernel_cmdline_extraction() {
        let ovr = CommandLineOverride::from_kernel_cmdline(
            "BOOT_IMAGE=/vmlinuz root=UUID=abc ro acpi_backlight=vendor quiet",
        );
        assert_eq!(ovr.token(), Some("vendor"));
        assert_eq!(ovr.resolve(), BacklightType::Vendor);
    }

    #[test]
    fn test_kernel_cmdline_last_occurrence_wins() {
        let ovr = CommandLineOverride::from_kernel_cmdline(
            "acpi_backlight=video acpi_backlight=none",
        );
        assert_eq!(ovr.resolve(), BacklightType::None);
    }

    #[test]
    fn test_kernel_cmdline_quoted_value() {
        let ovr = CommandLineOverride::from_kernel_cmdline("acpi_backlight=\"native\"");
        assert_eq!(ovr.resolve(), BacklightType::Native);
    }

    #[test]
    fn test_kernel_cmdline_without_param() {
        let ovr = CommandLineOverride::from_kernel_cmdline("quiet splash acpi=off");
        assert_eq!(ovr.token(), None);
        assert_eq!(ovr.resolve(), BacklightType::Undefined);
    }

    #[test]
    fn test_kernel_cmdline_similar_param_ignored() {
        let ovr = CommandLineOverride::from_kernel_cmdline("acpi_backlight_extra=native");
        assert_eq!(ovr.token(), None);
    }
}
