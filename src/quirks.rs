//! Hardware-identity quirk database.
//!
//! Some machines are known to need a specific backlight interface no
//! matter what autodetection would pick. Each [`QuirkRule`] is a
//! conjunction of identity predicates plus an action. Rules are evaluated
//! in declaration order and the first one that commits wins.
//!
//! A rule's action is either fixed, or gated on a secondary hardware
//! check (for example, looking for a specific VGA chip on the expansion
//! bus) when the identity strings alone are too generic to be trusted.
//!
//! # Example
//!
//! ```
//! use backlight_detect::identity::{DmiField, SystemIdentity};
//! use backlight_detect::quirks::{NoBus, QuirkDatabase};
//! use backlight_detect::BacklightType;
//!
//! let id = SystemIdentity::default()
//!     .with(DmiField::SysVendor, "LENOVO")
//!     .with(DmiField::ProductVersion, "ThinkPad T420");
//!
//! let db = QuirkDatabase::builtin();
//! assert_eq!(db.resolve(&id, &NoBus), BacklightType::Video);
//! ```

use crate::backlight::BacklightType;
use crate::identity::DmiField::{BiosVersion, BoardName, ProductName, ProductVersion, SysVendor};
use crate::identity::{DmiField, SystemIdentity};
use std::borrow::Cow;
use tracing::{debug, instrument};

/// PCI vendor id of Trident Microsystems.
pub const PCI_VENDOR_ID_TRIDENT: u16 = 0x1023;

/// PCI device id of the Trident CyberBlade XP4m32.
pub const PCI_DEVICE_ID_CYBERBLADE_XP4M32: u16 = 0x2100;

/// How a predicate compares its pattern to the identity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// The field must equal the pattern.
    Exact,
    /// The pattern must appear somewhere in the field. A prefix is the
    /// common case, e.g. a BIOS version family.
    Substring,
}

/// One identity predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMatch {
    /// The identity field to inspect.
    pub field: DmiField,
    /// Pattern to look for.
    pub pattern: &'static str,
    /// Comparison mode.
    pub kind: MatchKind,
}

impl FieldMatch {
    /// Substring predicate.
    #[must_use]
    pub const fn contains(field: DmiField, pattern: &'static str) -> Self {
        Self {
            field,
            pattern,
            kind: MatchKind::Substring,
        }
    }

    /// Exact predicate.
    #[must_use]
    pub const fn exact(field: DmiField, pattern: &'static str) -> Self {
        Self {
            field,
            pattern,
            kind: MatchKind::Exact,
        }
    }

    /// Evaluate against an identity. A missing field never matches.
    #[must_use]
    pub fn matches(&self, identity: &SystemIdentity) -> bool {
        let Some(value) = identity.get(self.field) else {
            return false;
        };
        match self.kind {
            MatchKind::Exact => value == self.pattern,
            MatchKind::Substring => value.contains(self.pattern),
        }
    }
}

/// Expansion bus used by gated quirk probes.
pub trait ExpansionBus: Send + Sync {
    /// Check whether a device with the given vendor/device id is present.
    fn device_present(&self, vendor: u16, device: u16) -> bool;
}

/// A bus with nothing on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBus;

impl ExpansionBus for NoBus {
    fn device_present(&self, _vendor: u16, _device: u16) -> bool {
        false
    }
}

/// A bus populated from a fixed list of `(vendor, device)` ids.
#[derive(Debug, Clone, Default)]
pub struct StaticBus {
    devices: Vec<(u16, u16)>,
}

impl StaticBus {
    /// Create a bus holding the given devices.
    #[must_use]
    pub fn new(devices: impl IntoIterator<Item = (u16, u16)>) -> Self {
        Self {
            devices: devices.into_iter().collect(),
        }
    }
}

impl ExpansionBus for StaticBus {
    fn device_present(&self, vendor: u16, device: u16) -> bool {
        self.devices.contains(&(vendor, device))
    }
}

/// Secondary hardware check run after a rule's identity predicates match.
pub type SecondaryProbe = fn(&dyn ExpansionBus) -> bool;

/// What a rule does once its predicates hold.
#[derive(Clone, Copy)]
pub enum QuirkAction {
    /// Force the given type.
    Fixed(BacklightType),
    /// Force the given type only if the probe confirms the hardware.
    Gated {
        /// Hardware confirmation check.
        probe: SecondaryProbe,
        /// Type applied when the probe succeeds.
        backlight: BacklightType,
    },
}

impl std::fmt::Debug for QuirkAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(ty) => f.debug_tuple("Fixed").field(ty).finish(),
            Self::Gated { backlight, .. } => f
                .debug_struct("Gated")
                .field("backlight", backlight)
                .finish_non_exhaustive(),
        }
    }
}

impl QuirkAction {
    /// The type this action forces when it commits.
    #[must_use]
    pub const fn backlight(&self) -> BacklightType {
        match self {
            Self::Fixed(ty) | Self::Gated { backlight: ty, .. } => *ty,
        }
    }
}

/// One entry in the quirk database.
#[derive(Debug, Clone, Copy)]
pub struct QuirkRule {
    /// Human-readable machine name.
    pub ident: &'static str,
    /// Predicates that must all hold.
    pub matches: &'static [FieldMatch],
    /// Action to apply.
    pub action: QuirkAction,
}

impl QuirkRule {
    /// Check the identity predicates only. A rule with no predicates never
    /// matches.
    #[must_use]
    pub fn matches_identity(&self, identity: &SystemIdentity) -> bool {
        !self.matches.is_empty() && self.matches.iter().all(|m| m.matches(identity))
    }

    /// Evaluate the rule fully, running the gated probe if there is one.
    ///
    /// Returns the forced type when the rule commits.
    #[must_use]
    pub fn evaluate(
        &self,
        identity: &SystemIdentity,
        bus: &dyn ExpansionBus,
    ) -> Option<BacklightType> {
        if !self.matches_identity(identity) {
            return None;
        }
        match self.action {
            QuirkAction::Fixed(ty) => Some(ty),
            QuirkAction::Gated { probe, backlight } => {
                if probe(bus) {
                    Some(backlight)
                } else {
                    debug!(ident = self.ident, "identity matched but hardware check failed");
                    None
                }
            }
        }
    }
}

/// Ordered, first-match-wins quirk table.
#[derive(Debug, Clone)]
pub struct QuirkDatabase {
    rules: Cow<'static, [QuirkRule]>,
}

impl Default for QuirkDatabase {
    fn default() -> Self {
        Self::builtin()
    }
}

impl QuirkDatabase {
    /// Database of known machines.
    #[must_use]
    pub const fn builtin() -> Self {
        Self {
            rules: Cow::Borrowed(BUILTIN_RULES),
        }
    }

    /// Database with caller-supplied rules, in evaluation order.
    #[must_use]
    pub fn new(rules: impl Into<Cow<'static, [QuirkRule]>>) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    /// Database with no rules.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            rules: Cow::Borrowed(&[]),
        }
    }

    /// The rules, in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[QuirkRule] {
        &self.rules
    }

    /// Find the first rule that commits for this identity.
    #[must_use]
    pub fn find(
        &self,
        identity: &SystemIdentity,
        bus: &dyn ExpansionBus,
    ) -> Option<(&QuirkRule, BacklightType)> {
        self.rules
            .iter()
            .find_map(|rule| rule.evaluate(identity, bus).map(|ty| (rule, ty)))
    }

    /// Resolve the forced type for this identity, or
    /// [`BacklightType::Undefined`] when no rule commits.
    ///
    /// An identity with no known field cannot satisfy any predicate, so the
    /// table is not walked at all.
    #[instrument(level = "debug", skip_all)]
    #[must_use]
    pub fn resolve(&self, identity: &SystemIdentity, bus: &dyn ExpansionBus) -> BacklightType {
        if identity.is_empty() {
            debug!("no identity strings available, skipping quirk table");
            return BacklightType::Undefined;
        }
        match self.find(identity, bus) {
            Some((rule, ty)) => {
                debug!(ident = rule.ident, %ty, "quirk matched");
                ty
            }
            None => BacklightType::Undefined,
        }
    }
}

/// Confirms a Toshiba Portégé R100 by looking for its Trident VGA chip.
///
/// The identity strings on that machine are generic ("Portable PC"), so
/// they are not trusted on their own.
#[must_use]
pub fn portege_r100_vga_present(bus: &dyn ExpansionBus) -> bool {
    bus.device_present(PCI_VENDOR_ID_TRIDENT, PCI_DEVICE_ID_CYBERBLADE_XP4M32)
}

const fn vendor(ident: &'static str, matches: &'static [FieldMatch]) -> QuirkRule {
    QuirkRule {
        ident,
        matches,
        action: QuirkAction::Fixed(BacklightType::Vendor),
    }
}

const fn video(ident: &'static str, matches: &'static [FieldMatch]) -> QuirkRule {
    QuirkRule {
        ident,
        matches,
        action: QuirkAction::Fixed(BacklightType::Video),
    }
}

const fn native(ident: &'static str, matches: &'static [FieldMatch]) -> QuirkRule {
    QuirkRule {
        ident,
        matches,
        action: QuirkAction::Fixed(BacklightType::Native),
    }
}

const SAMSUNG: &str = "SAMSUNG ELECTRONICS CO., LTD.";

const BUILTIN_RULES: &[QuirkRule] = &[
    // The BIOS sets a flag once the generic interface is used, which breaks
    // every backlight interface until the next reboot.
    vendor(
        "Samsung X360",
        &[
            FieldMatch::contains(SysVendor, SAMSUNG),
            FieldMatch::contains(ProductName, "X360"),
            FieldMatch::contains(BoardName, "X360"),
        ],
    ),
    vendor(
        "Asus UL30VT",
        &[
            FieldMatch::contains(SysVendor, "ASUSTeK Computer Inc."),
            FieldMatch::contains(ProductName, "UL30VT"),
        ],
    ),
    vendor(
        "Asus UL30A",
        &[
            FieldMatch::contains(SysVendor, "ASUSTeK Computer Inc."),
            FieldMatch::contains(ProductName, "UL30A"),
        ],
    ),
    vendor(
        "GIGABYTE GB-BXBT-2807",
        &[
            FieldMatch::contains(SysVendor, "GIGABYTE"),
            FieldMatch::contains(ProductName, "GB-BXBT-2807"),
        ],
    ),
    vendor(
        "Sony VPCEH3U1E",
        &[
            FieldMatch::contains(SysVendor, "Sony Corporation"),
            FieldMatch::contains(ProductName, "VPCEH3U1E"),
        ],
    ),
    native(
        "Dell Vostro 15 3535",
        &[
            FieldMatch::contains(SysVendor, "Dell Inc."),
            FieldMatch::contains(ProductName, "Vostro 15 3535"),
        ],
    ),
    // Both interfaces work but neither activates: the VGA has no driver.
    QuirkRule {
        ident: "Toshiba Portege R100",
        matches: &[
            FieldMatch::contains(SysVendor, "TOSHIBA"),
            FieldMatch::contains(ProductName, "Portable PC"),
            FieldMatch::contains(ProductVersion, "Version 1.0"),
            FieldMatch::contains(BoardName, "Portable PC"),
        ],
        action: QuirkAction::Gated {
            probe: portege_r100_vga_present,
            backlight: BacklightType::Vendor,
        },
    },
    // All-in-ones whose panel shows up as plain DP, so the GPU driver never
    // registers a native interface.
    video(
        "Apple iMac14,1",
        &[
            FieldMatch::contains(SysVendor, "Apple Inc."),
            FieldMatch::contains(ProductName, "iMac14,1"),
        ],
    ),
    video(
        "Apple iMac14,2",
        &[
            FieldMatch::contains(SysVendor, "Apple Inc."),
            FieldMatch::contains(ProductName, "iMac14,2"),
        ],
    ),
    // Older nvidia machines where the binary driver never registers.
    video(
        "ThinkPad W530",
        &[
            FieldMatch::contains(SysVendor, "LENOVO"),
            FieldMatch::contains(ProductVersion, "ThinkPad W530"),
        ],
    ),
    // Native control regresses when userspace ignores brightness keys.
    video(
        "ThinkPad T420",
        &[
            FieldMatch::contains(SysVendor, "LENOVO"),
            FieldMatch::contains(ProductVersion, "ThinkPad T420"),
        ],
    ),
    video(
        "ThinkPad T520",
        &[
            FieldMatch::contains(SysVendor, "LENOVO"),
            FieldMatch::contains(ProductVersion, "ThinkPad T520"),
        ],
    ),
    video(
        "ThinkPad X201s",
        &[
            FieldMatch::contains(SysVendor, "LENOVO"),
            FieldMatch::contains(ProductVersion, "ThinkPad X201s"),
        ],
    ),
    video(
        "ThinkPad X201T",
        &[
            FieldMatch::contains(SysVendor, "LENOVO"),
            FieldMatch::contains(ProductVersion, "ThinkPad X201T"),
        ],
    ),
    // Native control does not work on these.
    video(
        "HP ENVY 15 Notebook",
        &[
            FieldMatch::contains(SysVendor, "Hewlett-Packard"),
            FieldMatch::contains(ProductName, "HP ENVY 15 Notebook PC"),
        ],
    ),
    video(
        "SAMSUNG 870Z5E/880Z5E/680Z5E",
        &[
            FieldMatch::contains(SysVendor, SAMSUNG),
            FieldMatch::contains(ProductName, "870Z5E/880Z5E/680Z5E"),
        ],
    ),
    video(
        "SAMSUNG 370R4E/370R4V/370R5E/3570RE/370R5V",
        &[
            FieldMatch::contains(SysVendor, SAMSUNG),
            FieldMatch::contains(ProductName, "370R4E/370R4V/370R5E/3570RE/370R5V"),
        ],
    ),
    video(
        "SAMSUNG 3570R/370R/470R/450R/510R/4450RV",
        &[
            FieldMatch::contains(SysVendor, SAMSUNG),
            FieldMatch::contains(ProductName, "3570R/370R/470R/450R/510R/4450RV"),
        ],
    ),
    video(
        "SAMSUNG 670Z5E",
        &[FieldMatch::contains(SysVendor, SAMSUNG), FieldMatch::contains(ProductName, "670Z5E")],
    ),
    video(
        "SAMSUNG 730U3E/740U3E",
        &[
            FieldMatch::contains(SysVendor, SAMSUNG),
            FieldMatch::contains(ProductName, "730U3E/740U3E"),
        ],
    ),
    video(
        "SAMSUNG 900X3C/900X3D/900X3E/900X4C/900X4D",
        &[
            FieldMatch::contains(SysVendor, SAMSUNG),
            FieldMatch::contains(ProductName, "900X3C/900X3D/900X3E/900X4C/900X4D"),
        ],
    ),
    video(
        "Dell XPS14 L421X",
        &[
            FieldMatch::contains(SysVendor, "Dell Inc."),
            FieldMatch::contains(ProductName, "XPS L421X"),
        ],
    ),
    video(
        "Dell XPS15 L521X",
        &[
            FieldMatch::contains(SysVendor, "Dell Inc."),
            FieldMatch::contains(ProductName, "XPS L521X"),
        ],
    ),
    video(
        "SAMSUNG 530U4E/540U4E",
        &[
            FieldMatch::contains(SysVendor, SAMSUNG),
            FieldMatch::contains(ProductName, "530U4E/540U4E"),
        ],
    ),
    video(
        "HP 635 Notebook",
        &[
            FieldMatch::contains(SysVendor, "Hewlett-Packard"),
            FieldMatch::contains(ProductName, "HP 635 Notebook PC"),
        ],
    ),
    // Pre-Windows 8 firmware that still needs native control.
    native(
        "Lenovo IdeaPad S405",
        &[
            FieldMatch::contains(SysVendor, "LENOVO"),
            FieldMatch::contains(BoardName, "Lenovo IdeaPad S405"),
        ],
    ),
    native(
        "Lenovo IdeaPad Z470",
        &[
            FieldMatch::contains(SysVendor, "LENOVO"),
            FieldMatch::contains(ProductVersion, "IdeaPad Z470"),
        ],
    ),
    native(
        "Lenovo IdeaPad Z570",
        &[FieldMatch::contains(SysVendor, "LENOVO"), FieldMatch::contains(ProductName, "102434U")],
    ),
    native(
        "Lenovo E41-25",
        &[FieldMatch::contains(SysVendor, "LENOVO"), FieldMatch::contains(ProductName, "81FS")],
    ),
    native(
        "Lenovo E41-45",
        &[FieldMatch::contains(SysVendor, "LENOVO"), FieldMatch::contains(ProductName, "82BK")],
    ),
    native(
        "Lenovo ThinkPad X131e (3371 AMD)",
        &[FieldMatch::contains(SysVendor, "LENOVO"), FieldMatch::contains(ProductName, "3371")],
    ),
    native(
        "Apple iMac11,3",
        &[
            FieldMatch::contains(SysVendor, "Apple Inc."),
            FieldMatch::contains(ProductName, "iMac11,3"),
        ],
    ),
    native(
        "Apple iMac12,1",
        &[
            FieldMatch::contains(SysVendor, "Apple Inc."),
            FieldMatch::contains(ProductName, "iMac12,1"),
        ],
    ),
    native(
        "Apple iMac12,2",
        &[
            FieldMatch::contains(SysVendor, "Apple Inc."),
            FieldMatch::contains(ProductName, "iMac12,2"),
        ],
    ),
    native(
        "Apple MacBookPro12,1",
        &[
            FieldMatch::contains(SysVendor, "Apple Inc."),
            FieldMatch::contains(ProductName, "MacBookPro12,1"),
        ],
    ),
    native(
        "Dell Inspiron N4010",
        &[
            FieldMatch::contains(SysVendor, "Dell Inc."),
            FieldMatch::contains(ProductName, "Inspiron N4010"),
        ],
    ),
    native(
        "Dell Vostro V131",
        &[
            FieldMatch::contains(SysVendor, "Dell Inc."),
            FieldMatch::contains(ProductName, "Vostro V131"),
        ],
    ),
    native(
        "Dell XPS 17 L702X",
        &[
            FieldMatch::contains(SysVendor, "Dell Inc."),
            FieldMatch::contains(ProductName, "Dell System XPS L702X"),
        ],
    ),
    native(
        "Dell Precision 7510",
        &[
            FieldMatch::contains(SysVendor, "Dell Inc."),
            FieldMatch::contains(ProductName, "Precision 7510"),
        ],
    ),
    native(
        "Dell Studio 1569",
        &[
            FieldMatch::contains(SysVendor, "Dell Inc."),
            FieldMatch::contains(ProductName, "Studio 1569"),
        ],
    ),
    native(
        "Acer Aspire 3830TG",
        &[
            FieldMatch::contains(SysVendor, "Acer"),
            FieldMatch::contains(ProductName, "Aspire 3830TG"),
        ],
    ),
    native(
        "Acer Aspire 5738z",
        &[
            FieldMatch::contains(SysVendor, "Acer"),
            FieldMatch::contains(ProductName, "Aspire 5738"),
            FieldMatch::contains(BoardName, "JV50"),
        ],
    ),
    native(
        "Acer TravelMate 5735Z",
        &[
            FieldMatch::contains(SysVendor, "Acer"),
            FieldMatch::contains(ProductName, "TravelMate 5735Z"),
            FieldMatch::contains(BoardName, "BA51_MV"),
        ],
    ),
    native(
        "ASUSTeK GA401",
        &[
            FieldMatch::contains(SysVendor, "ASUSTeK COMPUTER INC."),
            FieldMatch::contains(ProductName, "GA401"),
        ],
    ),
    native(
        "ASUSTeK GA502",
        &[
            FieldMatch::contains(SysVendor, "ASUSTeK COMPUTER INC."),
            FieldMatch::contains(ProductName, "GA502"),
        ],
    ),
    native(
        "ASUSTeK GA503",
        &[
            FieldMatch::contains(SysVendor, "ASUSTeK COMPUTER INC."),
            FieldMatch::contains(ProductName, "GA503"),
        ],
    ),
    // Registering the generic interface and then dropping it during boot
    // leaves a dangling firmware brightness request on these boards.
    native("Clevo NL5xRU", &[FieldMatch::contains(BoardName, "NL5xRU")]),
    native(
        "Clevo NL5xRU",
        &[FieldMatch::contains(SysVendor, "TUXEDO"), FieldMatch::contains(BoardName, "AURA1501")],
    ),
    native(
        "Clevo NL5xRU",
        &[
            FieldMatch::contains(SysVendor, "TUXEDO"),
            FieldMatch::contains(BoardName, "EDUBOOK1502"),
        ],
    ),
    native("Clevo NL5xNU", &[FieldMatch::contains(BoardName, "NL5xNU")]),
    native("TongFang PF5PU1G", &[FieldMatch::contains(BoardName, "PF5PU1G")]),
    native("TongFang PF4NU1F", &[FieldMatch::contains(BoardName, "PF4NU1F")]),
    native(
        "TongFang PF4NU1F",
        &[FieldMatch::contains(SysVendor, "TUXEDO"), FieldMatch::contains(BoardName, "PULSE1401")],
    ),
    native("TongFang PF5NU1G", &[FieldMatch::contains(BoardName, "PF5NU1G")]),
    native(
        "TongFang PF5NU1G",
        &[FieldMatch::contains(SysVendor, "TUXEDO"), FieldMatch::contains(BoardName, "PULSE1501")],
    ),
    native("TongFang PF5LUXG", &[FieldMatch::contains(BoardName, "PF5LUXG")]),
    // x86 tablets with an external backlight controller: neither native
    // nor generic control works.
    vendor(
        "Lenovo Yoga Book X90F/X90L",
        &[
            FieldMatch::exact(SysVendor, "Intel Corporation"),
            FieldMatch::exact(ProductName, "CHERRYVIEW D1 PLATFORM"),
            FieldMatch::exact(ProductVersion, "YETI-11"),
        ],
    ),
    vendor(
        "Lenovo Yoga Tablet 2 830F/L or 1050F/L",
        &[
            FieldMatch::contains(SysVendor, "Intel Corp."),
            FieldMatch::contains(ProductName, "VALLEYVIEW C0 PLATFORM"),
            FieldMatch::contains(BoardName, "BYT-T FFD8"),
            // BIOS version family prefix
            FieldMatch::contains(BiosVersion, "BLADE_21"),
        ],
    ),
    vendor(
        "Lenovo Yoga Tab 3 Pro YT3-X90F",
        &[
            FieldMatch::contains(SysVendor, "Intel Corporation"),
            FieldMatch::contains(ProductName, "CHERRYVIEW D1 PLATFORM"),
            FieldMatch::contains(ProductVersion, "Blade3-10A-001"),
        ],
    ),
    vendor(
        "Xiaomi Mi Pad 2",
        &[
            FieldMatch::contains(SysVendor, "Xiaomi Inc"),
            FieldMatch::contains(ProductName, "Mipad2"),
        ],
    ),
];
