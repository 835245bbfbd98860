//! The decision engine.
//!
//! [`BacklightDetector`] owns all collaborators and the shared
//! [`ResolutionState`]. The first query runs the expensive one-time
//! initialization (command line, quirk table, namespace scan, vendor
//! firmware query) under a lock; every later query only evaluates the
//! precedence policy.
//!
//! # Precedence
//!
//! 1. Command-line override.
//! 2. Quirk (DMI) override, including one set at runtime by another driver.
//! 3. Vendor embedded controller owns brightness.
//! 4. Generic video interface, unless native is available and preferred.
//! 5. Native interface, once a GPU driver has announced it.
//! 6. Nothing on modern-generation firmware.
//! 7. Vendor firmware methods on legacy machines.
//!
//! Steps 4 to 7 are autodetection; [`Decision::auto_detected`] reports
//! whether the result came from there. The fallbacks (6 and 7) count as
//! autodetected as well.
//!
//! # Concurrency
//!
//! Any number of threads may query at once. The lock guards exactly two
//! things: initialization (the first caller runs it, others block until it
//! is done) and the native-availability flag. The policy itself reads the
//! committed state without holding the lock; every field only moves from
//! "unknown" to a final value, so a racing reader never sees one revert.
//!
//! Collaborators run while the lock is held and must not call back into
//! the detector, or they deadlock.

use crate::backlight::BacklightType;
use crate::capability::{CapabilityProbe, NamespaceScanner, StaticNamespace};
use crate::cmdline::CommandLineOverride;
use crate::identity::{IdentityProvider, SystemIdentity};
use crate::platform::{PlatformHeuristics, PlatformProfile};
use crate::quirks::{ExpansionBus, NoBus, QuirkDatabase};
use crate::vendor::{NoFirmware, VendorFeatureProbe, WmiEcProbe};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, instrument};

/// Consumer of the generic video backlight interface.
///
/// Told to tear its interface down when a runtime override means it is no
/// longer the one in charge.
pub trait BacklightConsumer: Send + Sync {
    /// Unregister the generic video backlight interface. Must be safe to
    /// call when nothing is registered.
    fn unregister(&self);
}

/// Snapshot of everything the policy decides on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionState {
    /// Type forced on the boot command line.
    pub cmdline_override: BacklightType,
    /// Type forced by the quirk table or a runtime override.
    pub dmi_override: BacklightType,
    /// The generic video interface advertises brightness control.
    pub video_capable: bool,
    /// The vendor embedded controller owns brightness.
    pub vendor_ec_present: bool,
    /// A GPU driver has announced a native interface.
    pub native_available: bool,
    /// One-time initialization has completed.
    pub initialized: bool,
}

/// Outcome of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// The interface that should control the backlight.
    pub backlight: BacklightType,
    /// The result came from autodetection (steps 4 to 7) rather than an
    /// override or the vendor embedded controller.
    pub auto_detected: bool,
}

impl Decision {
    const fn explicit(backlight: BacklightType) -> Self {
        Self {
            backlight,
            auto_detected: false,
        }
    }

    const fn detected(backlight: BacklightType) -> Self {
        Self {
            backlight,
            auto_detected: true,
        }
    }
}

impl ResolutionState {
    /// Apply the precedence policy. Pure apart from the platform queries.
    ///
    /// Never returns [`BacklightType::Undefined`].
    #[must_use]
    pub fn decide(&self, platform: &dyn PlatformHeuristics) -> Decision {
        if self.cmdline_override.is_defined() {
            return Decision::explicit(self.cmdline_override);
        }
        if self.dmi_override.is_defined() {
            return Decision::explicit(self.dmi_override);
        }
        if self.vendor_ec_present {
            return Decision::explicit(BacklightType::VendorEmbeddedController);
        }

        if self.video_capable && !(self.native_available && platform.prefer_native_over_video()) {
            return Decision::detected(BacklightType::Video);
        }
        if self.native_available {
            return Decision::detected(BacklightType::Native);
        }

        // Reaching this point on a modern machine usually means the GPU
        // driver has not loaded yet; a vendor interface would be wrong.
        if platform.is_modern_generation() {
            return Decision::detected(BacklightType::None);
        }
        Decision::detected(BacklightType::Vendor)
    }
}

/// Decides which interface controls the display backlight.
///
/// Construct one per machine with [`BacklightDetector::builder`] and share
/// it (e.g. behind an `Arc`) between every driver that needs to ask.
pub struct BacklightDetector {
    init_lock: Mutex<bool>,
    identity_snapshot: OnceLock<SystemIdentity>,
    cmdline_override: AtomicU8,
    dmi_override: AtomicU8,
    video_capable: AtomicBool,
    vendor_ec_present: AtomicBool,
    native_available: AtomicBool,
    initialized: AtomicBool,

    cmdline: CommandLineOverride,
    identity: Box<dyn IdentityProvider>,
    quirks: QuirkDatabase,
    bus: Box<dyn ExpansionBus>,
    capabilities: Box<dyn CapabilityProbe>,
    vendor: Box<dyn VendorFeatureProbe>,
    platform: Box<dyn PlatformHeuristics>,
    consumer: Option<Arc<dyn BacklightConsumer>>,
}

impl fmt::Debug for BacklightDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BacklightDetector")
            .field("state", &self.state())
            .field("cmdline", &self.cmdline)
            .field("quirk_rules", &self.quirks.rules().len())
            .field("has_consumer", &self.consumer.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for BacklightDetector {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl BacklightDetector {
    /// Start configuring a detector.
    #[must_use]
    pub fn builder() -> DetectorBuilder {
        DetectorBuilder::default()
    }

    /// Main query.
    ///
    /// `native_hint` is set by GPU drivers once they can drive the
    /// backlight themselves; it is remembered for the rest of the process.
    #[instrument(level = "debug", skip(self))]
    pub fn decide(&self, native_hint: bool) -> Decision {
        {
            let mut initialized = self.init_lock.lock();
            if !*initialized {
                self.initialize();
                *initialized = true;
                self.initialized.store(true, Ordering::Release);
            }
            if native_hint && !self.native_available.swap(true, Ordering::AcqRel) {
                debug!("native backlight interface announced");
            }
        }

        let decision = self.state().decide(self.platform.as_ref());
        debug!(backlight = %decision.backlight, auto = decision.auto_detected, "backlight decision");
        decision
    }

    /// The interface that should control the backlight.
    #[must_use]
    pub fn backlight_type(&self) -> BacklightType {
        self.decide(false).backlight
    }

    /// Announce a native interface and ask whether it should be used.
    ///
    /// Intended for GPU drivers deciding whether to register their own
    /// backlight device.
    #[must_use]
    pub fn use_native(&self) -> bool {
        self.decide(true).backlight == BacklightType::Native
    }

    /// Replace the quirk override at runtime.
    ///
    /// Used by platform drivers that know more about the machine than the
    /// built-in table. Initialization runs first if it has not yet, so the
    /// value given here is never overwritten by the table. If the outcome is
    /// anything but [`BacklightType::Video`], the video consumer is told to
    /// unregister.
    #[instrument(level = "debug", skip(self))]
    pub fn set_dmi_backlight_type(&self, backlight: BacklightType) {
        self.ensure_initialized();
        self.dmi_override.store(backlight as u8, Ordering::Release);
        info!(%backlight, "backlight type overridden at runtime");

        let current = self.backlight_type();
        if current != BacklightType::Video {
            if let Some(consumer) = &self.consumer {
                info!(%current, "unregistering video backlight interface");
                consumer.unregister();
            }
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> ResolutionState {
        ResolutionState {
            cmdline_override: BacklightType::from_repr(self.cmdline_override.load(Ordering::Acquire)),
            dmi_override: BacklightType::from_repr(self.dmi_override.load(Ordering::Acquire)),
            video_capable: self.video_capable.load(Ordering::Acquire),
            vendor_ec_present: self.vendor_ec_present.load(Ordering::Acquire),
            native_available: self.native_available.load(Ordering::Acquire),
            initialized: self.initialized.load(Ordering::Acquire),
        }
    }

    /// Whether one-time initialization has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Identity captured during initialization.
    #[must_use]
    pub fn identity(&self) -> Option<&SystemIdentity> {
        self.identity_snapshot.get()
    }

    fn ensure_initialized(&self) {
        if !self.is_initialized() {
            let _ = self.decide(false);
        }
    }

    /// Runs with `init_lock` held.
    fn initialize(&self) {
        let cmdline = self.cmdline.resolve();
        self.cmdline_override.store(cmdline as u8, Ordering::Release);

        let identity = SystemIdentity::capture(self.identity.as_ref());
        let dmi = self.quirks.resolve(&identity, self.bus.as_ref());
        self.dmi_override.store(dmi as u8, Ordering::Release);
        let _ = self.identity_snapshot.set(identity);

        let video_capable = self.capabilities.scan();
        self.video_capable.store(video_capable, Ordering::Release);

        let vendor_ec = self.vendor.probe();
        self.vendor_ec_present.store(vendor_ec, Ordering::Release);

        info!(
            %cmdline,
            %dmi,
            video_capable,
            vendor_ec,
            "backlight detection initialized"
        );
    }
}

/// Builder for [`BacklightDetector`].
///
/// Every collaborator has a conservative default: no command-line token,
/// an empty identity, the built-in quirk table, an empty bus, an empty
/// namespace, no vendor firmware, a legacy platform and no consumer.
pub struct DetectorBuilder {
    cmdline: CommandLineOverride,
    identity: Box<dyn IdentityProvider>,
    quirks: QuirkDatabase,
    bus: Box<dyn ExpansionBus>,
    capabilities: Box<dyn CapabilityProbe>,
    vendor: Box<dyn VendorFeatureProbe>,
    platform: Box<dyn PlatformHeuristics>,
    consumer: Option<Arc<dyn BacklightConsumer>>,
}

impl Default for DetectorBuilder {
    fn default() -> Self {
        Self {
            cmdline: CommandLineOverride::unset(),
            identity: Box::new(SystemIdentity::default()),
            quirks: QuirkDatabase::builtin(),
            bus: Box::new(NoBus),
            capabilities: Box::new(NamespaceScanner::new(StaticNamespace::default())),
            vendor: Box::new(WmiEcProbe::new(NoFirmware)),
            platform: Box::new(PlatformProfile::default()),
            consumer: None,
        }
    }
}

impl fmt::Debug for DetectorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorBuilder")
            .field("cmdline", &self.cmdline)
            .field("quirk_rules", &self.quirks.rules().len())
            .field("has_consumer", &self.consumer.is_some())
            .finish_non_exhaustive()
    }
}

impl DetectorBuilder {
    /// Command-line override.
    #[must_use]
    pub fn cmdline(mut self, cmdline: CommandLineOverride) -> Self {
        self.cmdline = cmdline;
        self
    }

    /// Platform identity source.
    #[must_use]
    pub fn identity(mut self, identity: impl IdentityProvider + 'static) -> Self {
        self.identity = Box::new(identity);
        self
    }

    /// Quirk table.
    #[must_use]
    pub fn quirks(mut self, quirks: QuirkDatabase) -> Self {
        self.quirks = quirks;
        self
    }

    /// Expansion bus for gated quirk checks.
    #[must_use]
    pub fn bus(mut self, bus: impl ExpansionBus + 'static) -> Self {
        self.bus = Box::new(bus);
        self
    }

    /// Video capability probe.
    #[must_use]
    pub fn capabilities(mut self, probe: impl CapabilityProbe + 'static) -> Self {
        self.capabilities = Box::new(probe);
        self
    }

    /// Vendor embedded-controller probe.
    #[must_use]
    pub fn vendor_probe(mut self, probe: impl VendorFeatureProbe + 'static) -> Self {
        self.vendor = Box::new(probe);
        self
    }

    /// Platform heuristics.
    #[must_use]
    pub fn platform(mut self, platform: impl PlatformHeuristics + 'static) -> Self {
        self.platform = Box::new(platform);
        self
    }

    /// Consumer told to unregister after a runtime override.
    #[must_use]
    pub fn consumer(mut self, consumer: Arc<dyn BacklightConsumer>) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// Finish. Nothing is probed until the first query.
    #[must_use]
    pub fn build(self) -> BacklightDetector {
        BacklightDetector {
            init_lock: Mutex::new(false),
            identity_snapshot: OnceLock::new(),
            cmdline_override: AtomicU8::new(BacklightType::Undefined as u8),
            dmi_override: AtomicU8::new(BacklightType::Undefined as u8),
            video_capable: AtomicBool::new(false),
            vendor_ec_present: AtomicBool::new(false),
            native_available: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            cmdline: self.cmdline,
            identity: self.identity,
            quirks: self.quirks,
            bus: self.bus,
            capabilities: self.capabilities,
            vendor: self.vendor,
            platform: self.platform,
            consumer: self.consumer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{DeviceNode, VideoCaps};
    use crate::identity::DmiField;
    use crate::vendor::{BrightnessSource, FixedSource};
    use std::sync::atomic::AtomicUsize;

    fn state() -> ResolutionState {
        ResolutionState {
            initialized: true,
            ..ResolutionState::default()
        }
    }

    #[test]
    fn test_policy_cmdline_first() {
        let s = ResolutionState {
            cmdline_override: BacklightType::None,
            dmi_override: BacklightType::Video,
            vendor_ec_present: true,
            video_capable: true,
            native_available: true,
            ..state()
        };
        let d = s.decide(&PlatformProfile::modern());
        assert_eq!(d, Decision::explicit(BacklightType::None));
    }

    #[test]
    fn test_policy_dmi_beats_native() {
        let s = ResolutionState {
            dmi_override: BacklightType::Vendor,
            native_available: true,
            ..state()
        };
        assert_eq!(s.decide(&PlatformProfile::modern()).backlight, BacklightType::Vendor);
    }

    #[test]
    fn test_policy_vendor_ec_not_autodetected() {
        let s = ResolutionState {
            vendor_ec_present: true,
            video_capable: true,
            native_available: true,
            ..state()
        };
        let d = s.decide(&PlatformProfile::legacy());
        assert_eq!(d.backlight, BacklightType::VendorEmbeddedController);
        assert!(!d.auto_detected);
    }

    #[test]
    fn test_policy_video_when_native_missing() {
        let s = ResolutionState {
            video_capable: true,
            ..state()
        };
        assert_eq!(
            s.decide(&PlatformProfile::modern()),
            Decision::detected(BacklightType::Video)
        );
    }

    #[test]
    fn test_policy_video_kept_on_legacy_even_with_native() {
        let s = ResolutionState {
            video_capable: true,
            native_available: true,
            ..state()
        };
        assert_eq!(s.decide(&PlatformProfile::legacy()).backlight, BacklightType::Video);
    }

    #[test]
    fn test_policy_native_preferred_on_modern() {
        let s = ResolutionState {
            video_capable: true,
            native_available: true,
            ..state()
        };
        assert_eq!(
            s.decide(&PlatformProfile::modern()),
            Decision::detected(BacklightType::Native)
        );
    }

    #[test]
    fn test_policy_terminal_branches() {
        assert_eq!(
            state().decide(&PlatformProfile::modern()).backlight,
            BacklightType::None
        );
        assert_eq!(
            state().decide(&PlatformProfile::legacy()).backlight,
            BacklightType::Vendor
        );
    }

    #[test]
    fn test_lazy_init() {
        let detector = BacklightDetector::default();
        assert!(!detector.is_initialized());
        assert!(detector.identity().is_none());

        let _ = detector.backlight_type();
        assert!(detector.is_initialized());
        assert!(detector.state().initialized);
        assert!(detector.identity().is_some());
    }

    #[test]
    fn test_default_detector_falls_back_to_vendor() {
        let detector = BacklightDetector::default();
        let d = detector.decide(false);
        assert_eq!(d.backlight, BacklightType::Vendor);
        assert!(d.auto_detected);
    }

    #[test]
    fn test_native_hint_is_sticky() {
        let detector = BacklightDetector::builder()
            .platform(PlatformProfile::modern())
            .build();
        assert_eq!(detector.backlight_type(), BacklightType::None);
        assert!(detector.use_native());
        assert_eq!(detector.backlight_type(), BacklightType::Native);
        assert!(detector.state().native_available);
    }

    #[test]
    fn test_probes_run_once() {
        struct Counting(Arc<AtomicUsize>);
        impl CapabilityProbe for Counting {
            fn scan(&self) -> bool {
                self.0.fetch_add(1, Ordering::SeqCst);
                true
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let detector = BacklightDetector::builder()
            .capabilities(Counting(Arc::clone(&calls)))
            .build();
        for hint in [false, true, false] {
            let _ = detector.decide(hint);
        }
        detector.set_dmi_backlight_type(BacklightType::Native);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_quirk_applied_from_identity() {
        let id = SystemIdentity::default()
            .with(DmiField::SysVendor, "Apple Inc.")
            .with(DmiField::ProductName, "iMac12,1");
        let detector = BacklightDetector::builder().identity(id).build();
        let d = detector.decide(false);
        assert_eq!(d, Decision::explicit(BacklightType::Native));
        assert_eq!(detector.state().dmi_override, BacklightType::Native);
    }

    #[test]
    fn test_vendor_probe_wired() {
        let detector = BacklightDetector::builder()
            .vendor_probe(WmiEcProbe::with_platform_support(
                FixedSource(BrightnessSource::EmbeddedController),
                true,
            ))
            .build();
        assert_eq!(detector.backlight_type(), BacklightType::VendorEmbeddedController);
    }

    #[test]
    fn test_capability_scan_wired() {
        let ns = StaticNamespace::new([DeviceNode::video(VideoCaps::BACKLIGHT)]);
        let detector = BacklightDetector::builder()
            .capabilities(NamespaceScanner::new(ns))
            .build();
        assert_eq!(detector.backlight_type(), BacklightType::Video);
    }

    #[derive(Default)]
    struct Recorder(AtomicUsize);

    impl BacklightConsumer for Recorder {
        fn unregister(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_runtime_override_unregisters_video() {
        let consumer = Arc::new(Recorder::default());
        let ns = StaticNamespace::new([DeviceNode::video(VideoCaps::BACKLIGHT)]);
        let detector = BacklightDetector::builder()
            .capabilities(NamespaceScanner::new(ns))
            .consumer(consumer.clone())
            .build();
        assert_eq!(detector.backlight_type(), BacklightType::Video);

        detector.set_dmi_backlight_type(BacklightType::Vendor);
        assert_eq!(detector.backlight_type(), BacklightType::Vendor);
        assert_eq!(consumer.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_runtime_override_to_video_keeps_consumer() {
        let consumer = Arc::new(Recorder::default());
        let detector = BacklightDetector::builder()
            .consumer(consumer.clone())
            .build();
        detector.set_dmi_backlight_type(BacklightType::Video);
        assert_eq!(detector.backlight_type(), BacklightType::Video);
        assert_eq!(consumer.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_runtime_override_before_first_query_survives_init() {
        let id = SystemIdentity::default().with(DmiField::BoardName, "NL5xNU");
        let detector = BacklightDetector::builder().identity(id).build();
        detector.set_dmi_backlight_type(BacklightType::Video);
        assert!(detector.is_initialized());
        assert_eq!(detector.backlight_type(), BacklightType::Video);
    }

    #[test]
    fn test_runtime_override_cannot_beat_cmdline() {
        let consumer = Arc::new(Recorder::default());
        let detector = BacklightDetector::builder()
            .cmdline(CommandLineOverride::new("video"))
            .consumer(consumer.clone())
            .build();
        detector.set_dmi_backlight_type(BacklightType::Native);
        assert_eq!(detector.backlight_type(), BacklightType::Video);
        assert_eq!(consumer.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_debug_output() {
        let detector = BacklightDetector::default();
        let dbg = format!("{detector:?}");
        assert!(dbg.contains("BacklightDetector"));
        assert!(dbg.contains("quirk_rules"));
        assert!(format!("{:?}", BacklightDetector::builder()).contains("DetectorBuilder"));
    }

    #[test]
    fn test_fallbacks_count_as_autodetected() {
        let state = ResolutionState {
            initialized: true,
            ..ResolutionState::default()
        };
        let modern = state.decide(&PlatformProfile::modern());
        assert_eq!(modern, Decision::detected(BacklightType::None));

        let legacy = state.decide(&PlatformProfile::legacy());
        assert_eq!(legacy, Decision::detected(BacklightType::Vendor));

        let ec = ResolutionState {
            vendor_ec_present: true,
            ..state
        };
        assert_eq!(
            ec.decide(&PlatformProfile::modern()),
            Decision::explicit(BacklightType::VendorEmbeddedController)
        );
    }
}
