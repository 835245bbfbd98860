//! Backlight Detect: which interface controls the display backlight?
//!
//! A laptop can expose several competing brightness interfaces: the
//! generic platform-firmware video interface, vendor firmware methods, the
//! GPU driver's own (native) control, or a vendor embedded controller.
//! Exactly one of them should be registered. This crate makes that
//! decision once per boot, consistently, for every driver that asks.
//!
//! # Inputs
//!
//! | Input | Module | Overrides |
//! |-------|--------|-----------|
//! | `acpi_backlight=` boot parameter | [`cmdline`] | everything |
//! | Known-machine quirk table (DMI) | [`quirks`] | autodetection |
//! | Vendor EC brightness owner | [`vendor`] | autodetection |
//! | Video device capabilities | [`capability`] | - |
//! | Native interface announced by GPU driver | [`engine`] | - |
//! | Firmware OS generation, Chromebook EC | [`platform`] | - |
//!
//! # Quick Start
//!
//! ```
//! use backlight_detect::capability::{DeviceNode, NamespaceScanner, StaticNamespace, VideoCaps};
//! use backlight_detect::{BacklightDetector, BacklightType, PlatformProfile};
//!
//! let namespace = StaticNamespace::new([DeviceNode::video(VideoCaps::BACKLIGHT)]);
//! let detector = BacklightDetector::builder()
//!     .capabilities(NamespaceScanner::new(namespace))
//!     .platform(PlatformProfile::modern())
//!     .build();
//!
//! // Before the GPU driver loads, the generic video interface wins.
//! assert_eq!(detector.backlight_type(), BacklightType::Video);
//!
//! // The GPU driver announces native control and takes over.
//! assert!(detector.use_native());
//! ```
//!
//! # Collaborators
//!
//! Reading identity strings, walking the firmware namespace, and talking
//! to vendor firmware are platform concerns outside this crate. They are
//! traits ([`IdentityProvider`], [`DeviceNamespace`], [`FirmwareQuery`],
//! [`ExpansionBus`], [`PlatformHeuristics`]) with simple in-memory
//! implementations for tests and tools.
//!
//! # Error Handling
//!
//! Detection never fails. Collaborators report problems through
//! [`Error`], and the probes turn every failure into the conservative
//! default (`false` or "no override") after logging it with `tracing`.
//!
//! # Thread Safety
//!
//! [`BacklightDetector`] is `Send + Sync`. Share one instance between all
//! callers; initialization runs exactly once no matter how many threads
//! race on the first query.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)] // DMI, ACPI, TUXEDO etc. without backticks

pub mod backlight;
pub mod capability;
pub mod cmdline;
pub mod engine;
pub mod error;
pub mod identity;
pub mod platform;
pub mod quirks;
pub mod vendor;

// Re-export main types for convenience
pub use backlight::BacklightType;
pub use capability::{CapabilityProbe, DeviceNamespace, NamespaceScanner, VideoCaps};
pub use cmdline::CommandLineOverride;
pub use engine::{BacklightConsumer, BacklightDetector, Decision, DetectorBuilder, ResolutionState};
pub use error::{Error, Result, Subsystem};
pub use identity::{DmiField, IdentityProvider, SystemIdentity};
pub use platform::{PlatformHeuristics, PlatformProfile};
pub use quirks::{ExpansionBus, QuirkAction, QuirkDatabase, QuirkRule};
pub use vendor::{FirmwareQuery, VendorFeatureProbe, WmiEcProbe};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
