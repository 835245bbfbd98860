//! Platform identity (DMI) fields.
//!
//! How the strings are read from firmware is up to the caller: anything
//! implementing [`IdentityProvider`] will do. The engine captures a
//! [`SystemIdentity`] snapshot once during initialization and never
//! consults the provider again.

use std::fmt;

/// Identity fields that quirk rules can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmiField {
    /// System vendor, e.g. `"LENOVO"`.
    SysVendor,
    /// Product name, e.g. `"81FS"`.
    ProductName,
    /// Product version, e.g. `"ThinkPad T420"`.
    ProductVersion,
    /// Mainboard name.
    BoardName,
    /// Firmware (BIOS) version string.
    BiosVersion,
}

impl DmiField {
    /// All fields, in capture order.
    pub const ALL: [Self; 5] = [
        Self::SysVendor,
        Self::ProductName,
        Self::ProductVersion,
        Self::BoardName,
        Self::BiosVersion,
    ];
}

impl fmt::Display for DmiField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SysVendor => write!(f, "sys_vendor"),
            Self::ProductName => write!(f, "product_name"),
            Self::ProductVersion => write!(f, "product_version"),
            Self::BoardName => write!(f, "board_name"),
            Self::BiosVersion => write!(f, "bios_version"),
        }
    }
}

/// Source of platform identity strings.
pub trait IdentityProvider: Send + Sync {
    /// Read one field. `None` when the firmware does not provide it.
    fn field(&self, field: DmiField) -> Option<String>;
}

/// Immutable snapshot of the platform identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemIdentity {
    /// System vendor.
    pub vendor: Option<String>,
    /// Product name.
    pub product_name: Option<String>,
    /// Product version.
    pub product_version: Option<String>,
    /// Board name.
    pub board_name: Option<String>,
    /// BIOS version.
    pub bios_version: Option<String>,
}

impl SystemIdentity {
    /// Read every field from a provider.
    #[must_use]
    pub fn capture(provider: &dyn IdentityProvider) -> Self {
        Self {
            vendor: provider.field(DmiField::SysVendor),
            product_name: provider.field(DmiField::ProductName),
            product_version: provider.field(DmiField::ProductVersion),
            board_name: provider.field(DmiField::BoardName),
            bios_version: provider.field(DmiField::BiosVersion),
        }
    }

    /// Builder-style setter for one field.
    #[must_use]
    pub fn with(mut self, field: DmiField, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match field {
            DmiField::SysVendor => self.vendor = value,
            DmiField::ProductName => self.product_name = value,
            DmiField::ProductVersion => self.product_version = value,
            DmiField::BoardName => self.board_name = value,
            DmiField::BiosVersion => self.bios_version = value,
        }
        self
    }

    /// Look up one field.
    #[must_use]
    pub fn get(&self, field: DmiField) -> Option<&str> {
        match field {
            DmiField::SysVendor => self.vendor.as_deref(),
            DmiField::ProductName => self.product_name.as_deref(),
            DmiField::ProductVersion => self.product_version.as_deref(),
            DmiField::BoardName => self.board_name.as_deref(),
            DmiField::BiosVersion => self.bios_version.as_deref(),
        }
    }

    /// Check whether no field is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        DmiField::ALL.iter().all(|f| self.get(*f).is_none())
    }
}

/// A fixed snapshot serves as its own provider.
impl IdentityProvider for SystemIdentity {
    fn field(&self, field: DmiField) -> Option<String> {
        self.get(field).map(str::to_owned)
    }
}
