//! Vendor embedded-controller brightness probe.
//!
//! Some hybrid-graphics laptops route brightness through the embedded
//! controller, reachable only through a vendor firmware method. The
//! firmware can be asked which subsystem currently owns brightness; if the
//! answer is the embedded controller, the dedicated EC interface must be
//! used.
//!
//! The transport is abstract ([`FirmwareQuery`]). The query mechanism only
//! exists on x86, so [`WmiEcProbe::new`] gates itself on the target
//! architecture.

use crate::error::{Error, Result, Subsystem};
use tracing::{debug, instrument, warn};

/// GUID of the vendor brightness firmware interface.
pub const WMI_BRIGHTNESS_GUID: &str = "603E9613-EF25-4338-A3D0-C46177516DB7";

/// Method id that reports the brightness source.
pub const WMI_BRIGHTNESS_METHOD_SOURCE: u32 = 2;

/// Subsystem that owns brightness according to the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrightnessSource {
    /// The GPU driver.
    Gpu,
    /// The embedded controller.
    EmbeddedController,
    /// An auxiliary channel on the panel link.
    Aux,
    /// A value this crate does not know.
    Unknown(u32),
}

impl BrightnessSource {
    /// Decode the raw firmware return value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Gpu,
            2 => Self::EmbeddedController,
            3 => Self::Aux,
            other => Self::Unknown(other),
        }
    }
}

/// Transport for the "who owns brightness" firmware request.
pub trait FirmwareQuery: Send + Sync {
    /// Ask the firmware for the current brightness source, i.e. evaluate
    /// method [`WMI_BRIGHTNESS_METHOD_SOURCE`] of the interface identified
    /// by [`WMI_BRIGHTNESS_GUID`].
    ///
    /// # Errors
    ///
    /// Returns an error if the method is missing or its evaluation fails.
    fn brightness_source(&self) -> Result<BrightnessSource>;
}

/// Reports whether the vendor embedded-controller interface is in charge.
pub trait VendorFeatureProbe: Send + Sync {
    /// Run the probe. Never fails.
    fn probe(&self) -> bool;
}

/// Transport for machines without the vendor interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFirmware;

impl FirmwareQuery for NoFirmware {
    fn brightness_source(&self) -> Result<BrightnessSource> {
        Err(Error::not_available(Subsystem::VendorFirmware))
    }
}

/// Transport that always answers with the same source.
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub BrightnessSource);

impl FirmwareQuery for FixedSource {
    fn brightness_source(&self) -> Result<BrightnessSource> {
        Ok(self.0)
    }
}

/// [`VendorFeatureProbe`] over a [`FirmwareQuery`] transport.
#[derive(Debug, Clone)]
pub struct WmiEcProbe<Q> {
    query: Q,
    platform_supported: bool,
}

impl<Q: FirmwareQuery> WmiEcProbe<Q> {
    /// Probe gated on the current target architecture.
    #[must_use]
    pub const fn new(query: Q) -> Self {
        Self::with_platform_support(query, cfg!(any(target_arch = "x86", target_arch = "x86_64")))
    }

    /// Probe with explicit platform gating.
    #[must_use]
    pub const fn with_platform_support(query: Q, platform_supported: bool) -> Self {
        Self {
            query,
            platform_supported,
        }
    }

    /// Whether the query mechanism exists on this platform.
    #[must_use]
    pub const fn is_platform_supported(&self) -> bool {
        self.platform_supported
    }
}

impl<Q: FirmwareQuery> VendorFeatureProbe for WmiEcProbe<Q> {
    #[instrument(level = "debug", skip(self))]
    fn probe(&self) -> bool {
        if !self.platform_supported {
            debug!("vendor brightness query unsupported on this platform");
            return false;
        }
        debug!(
            guid = WMI_BRIGHTNESS_GUID,
            method = WMI_BRIGHTNESS_METHOD_SOURCE,
            "querying vendor brightness source"
        );
        match self.query.brightness_source() {
            Ok(source) => {
                debug!(?source, "firmware reported brightness source");
                source == BrightnessSource::EmbeddedController
            }
            Err(err) if err.is_not_available() => {
                debug!(%err, "vendor brightness interface absent");
                false
            }
            Err(err) => {
                warn!(%err, "vendor brightness query failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    struct Failing;

    impl FirmwareQuery for Failing {
        fn brightness_source(&self) -> Result<BrightnessSource> {
            Err(Error::firmware(-1, "AE_ERROR"))
        }
    }

    #[test]
    fn test_raw_source_decoding() {
        assert_eq!(BrightnessSource::from_raw(1), BrightnessSource::Gpu);
        assert_eq!(BrightnessSource::from_raw(2), BrightnessSource::EmbeddedController);
        assert_eq!(BrightnessSource::from_raw(3), BrightnessSource::Aux);
        assert_eq!(BrightnessSource::from_raw(0), BrightnessSource::Unknown(0));
        assert_eq!(BrightnessSource::from_raw(42), BrightnessSource::Unknown(42));
    }

    #[test]
    fn test_ec_owner_detected() {
        let probe = WmiEcProbe::with_platform_support(
            FixedSource(BrightnessSource::EmbeddedController),
            true,
        );
        assert!(probe.probe());
    }

    #[test]
    fn test_other_owners_rejected() {
        for source in [
            BrightnessSource::Gpu,
            BrightnessSource::Aux,
            BrightnessSource::Unknown(7),
        ] {
            let probe = WmiEcProbe::with_platform_support(FixedSource(source), true);
            assert!(!probe.probe(), "{source:?} must not select the EC");
        }
    }

    #[test]
    fn test_unsupported_platform_never_queries() {
        let probe = WmiEcProbe::with_platform_support(
            FixedSource(BrightnessSource::EmbeddedController),
            false,
        );
        assert!(!probe.is_platform_supported());
        assert!(!probe.probe());
    }

    #[test]
    fn test_query_failure_is_false() {
        assert!(!WmiEcProbe::with_platform_support(Failing, true).probe());
        assert!(!WmiEcProbe::with_platform_support(NoFirmware, true).probe());
    }

    #[test]
    fn test_new_follows_target_arch() {
        let probe = WmiEcProbe::new(NoFirmware);
        assert_eq!(
            probe.is_platform_supported(),
            cfg!(any(target_arch = "x86", target_arch = "x86_64"))
        );
    }

    #[test]
    #[traced_test]
    fn test_query_names_interface_and_method() {
        let probe = WmiEcProbe::with_platform_support(FixedSource(BrightnessSource::Gpu), true);
        assert!(!probe.probe());
        assert!(logs_contain(WMI_BRIGHTNESS_GUID));
        assert!(logs_contain("method=2"));
    }

    #[test]
    #[traced_test]
    fn test_unsupported_platform_skips_query_log() {
        let probe = WmiEcProbe::with_platform_support(NoFirmware, false);
        assert!(!probe.probe());
        assert!(!logs_contain(WMI_BRIGHTNESS_GUID));
    }
}
