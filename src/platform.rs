//! Platform generation heuristics.
//!
//! Firmware written for Windows 8 and later (machines from roughly 2012
//! on) no longer relies on the generic video interface, so it often does
//! not work there. Chromebooks, recognisable by their embedded controller,
//! always want native control. Both facts feed the autodetection branch of
//! the decision policy.

use crate::capability::{namespace_has_device, DeviceNamespace, CHROME_EC_HIDS};

/// Platform facts consulted by the decision policy.
pub trait PlatformHeuristics: Send + Sync {
    /// Firmware targets a modern OS generation (post-2012).
    fn is_modern_generation(&self) -> bool;

    /// A fixed-function controller that always wants native control is
    /// present (the Chromebook embedded controller).
    fn fixed_function_controller_present(&self) -> bool;

    /// Whether native control beats the generic video interface when both
    /// are available.
    fn prefer_native_over_video(&self) -> bool {
        self.is_modern_generation() || self.fixed_function_controller_present()
    }
}

/// Precomputed platform facts.
///
/// The default describes a legacy machine with no special controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Firmware targets a modern OS generation.
    pub modern_generation: bool,
    /// A Chromebook-style embedded controller is present.
    pub fixed_function_controller: bool,
}

impl PlatformProfile {
    /// Legacy platform.
    #[must_use]
    pub const fn legacy() -> Self {
        Self {
            modern_generation: false,
            fixed_function_controller: false,
        }
    }

    /// Modern-generation platform without a special controller.
    #[must_use]
    pub const fn modern() -> Self {
        Self {
            modern_generation: true,
            fixed_function_controller: false,
        }
    }

    /// Build a profile from the OS generation marker and a namespace scan
    /// for the Chromebook embedded controller.
    #[must_use]
    pub fn detect(modern_generation: bool, namespace: &dyn DeviceNamespace) -> Self {
        Self {
            modern_generation,
            fixed_function_controller: namespace_has_device(namespace, &CHROME_EC_HIDS),
        }
    }
}

impl PlatformHeuristics for PlatformProfile {
    fn is_modern_generation(&self) -> bool {
        self.modern_generation
    }

    fn fixed_function_controller_present(&self) -> bool {
        self.fixed_function_controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{DeviceNode, StaticNamespace};

    #[test]
    fn test_default_is_legacy() {
        assert_eq!(PlatformProfile::default(), PlatformProfile::legacy());
        assert!(!PlatformProfile::legacy().prefer_native_over_video());
    }

    #[test]
    fn test_modern_prefers_native() {
        assert!(PlatformProfile::modern().prefer_native_over_video());
    }

    #[test]
    fn test_controller_prefers_native_on_legacy_firmware() {
        let profile = PlatformProfile {
            modern_generation: false,
            fixed_function_controller: true,
        };
        assert!(profile.prefer_native_over_video());
        assert!(!profile.is_modern_generation());
    }

    #[test]
    fn test_detect_finds_chrome_ec() {
        let ns = StaticNamespace::new([DeviceNode::new("GOOG0004")]);
        let profile = PlatformProfile::detect(false, &ns);
        assert!(profile.fixed_function_controller_present());
        assert!(profile.prefer_native_over_video());
    }

    #[test]
    fn test_detect_without_chrome_ec() {
        let ns = StaticNamespace::new([DeviceNode::new("PNP0C09")]);
        let profile = PlatformProfile::detect(true, &ns);
        assert!(!profile.fixed_function_controller_present());
        assert!(profile.is_modern_generation());
    }
}
