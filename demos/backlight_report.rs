//! Backlight Report Demo
//!
//! Reads this machine's DMI strings and boot command line, runs the
//! detector, and prints which interface would control the backlight.
//! Namespace and vendor firmware access are not available from userspace,
//! so those inputs are left empty.
//!
//! Run with: cargo run --example `backlight_report`
//! Set `RUST_LOG=backlight_detect=debug` to see the decision trace.

use backlight_detect::vendor::{WMI_BRIGHTNESS_GUID, WMI_BRIGHTNESS_METHOD_SOURCE};
use backlight_detect::{
    BacklightDetector, CommandLineOverride, DmiField, IdentityProvider, PlatformProfile,
    QuirkDatabase, SystemIdentity,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// DMI strings exported under `/sys/class/dmi/id`.
struct SysfsDmi {
    root: PathBuf,
}

impl IdentityProvider for SysfsDmi {
    fn field(&self, field: DmiField) -> Option<String> {
        let value = fs::read_to_string(self.root.join(field.to_string())).ok()?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dmi = SysfsDmi {
        root: PathBuf::from("/sys/class/dmi/id"),
    };
    let cmdline = fs::read_to_string("/proc/cmdline").unwrap_or_default();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║          BACKLIGHT DETECT - Interface Report               ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!("Version: {}", backlight_detect::VERSION);
    println!("Quirk rules: {}", QuirkDatabase::builtin().rules().len());
    println!(
        "Vendor EC interface: {WMI_BRIGHTNESS_GUID} (method {WMI_BRIGHTNESS_METHOD_SOURCE})"
    );
    println!();

    for field in DmiField::ALL {
        let value = dmi.field(field).unwrap_or_else(|| "<unknown>".to_string());
        println!("  {:<16} {}", field.to_string(), value);
    }
    println!();

    let detector = BacklightDetector::builder()
        .cmdline(CommandLineOverride::from_kernel_cmdline(&cmdline))
        .identity(dmi)
        .platform(PlatformProfile::modern())
        .build();

    let before = detector.decide(false);
    println!(
        "Before GPU driver: {:<14} (autodetected: {})",
        before.backlight, before.auto_detected
    );

    let after = detector.decide(true);
    println!(
        "After GPU driver:  {:<14} (autodetected: {})",
        after.backlight, after.auto_detected
    );
    if detector.identity().is_some_and(SystemIdentity::is_empty) {
        println!("No DMI strings readable, quirk table was skipped.");
    }
    println!();
    println!("State: {:?}", detector.state());
}
