//! Video capability probing over the firmware device namespace.
//!
//! The namespace itself is abstract: a [`DeviceNamespace`] hands every
//! node it visits to a callback, either as a [`DeviceNode`] or as the
//! error it hit while evaluating that node. [`NamespaceScanner`] walks the
//! whole tree (there can be several video devices) and ORs the capability
//! bits of every generic video device backed by real graphics hardware.
//!
//! Node errors are skipped. A failed walk reports no capabilities.

use crate::error::Result;
use bitflags::bitflags;
use tracing::{debug, instrument, warn};

/// Hardware id of the generic video device class.
pub const VIDEO_DEVICE_HID: &str = "LNXVIDEO";

/// Hardware ids of the Chromebook embedded controller.
pub const CHROME_EC_HIDS: [&str; 2] = ["GOOG0004", "GOOG000C"];

bitflags! {
    /// Features advertised by a generic video device.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VideoCaps: u32 {
        /// Display output switching methods.
        const OUTPUT_SWITCHING = 0x0001;
        /// Device posting.
        const DEVICE_POSTING = 0x0002;
        /// Video ROM retrieval.
        const ROM_AVAILABLE = 0x0004;
        /// Brightness control methods.
        const BACKLIGHT = 0x0008;
    }
}

/// One node of the device namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceNode {
    /// Hardware id, when the node has one.
    pub hardware_id: Option<String>,
    /// Whether a physical graphics device is bound to this node.
    pub physical_device: bool,
    /// Capabilities the node's firmware methods advertise.
    pub caps: VideoCaps,
}

impl DeviceNode {
    /// Node with the given hardware id and nothing else.
    #[must_use]
    pub fn new(hardware_id: impl Into<String>) -> Self {
        Self {
            hardware_id: Some(hardware_id.into()),
            ..Self::default()
        }
    }

    /// A generic video device bound to a physical graphics device.
    #[must_use]
    pub fn video(caps: VideoCaps) -> Self {
        Self {
            hardware_id: Some(VIDEO_DEVICE_HID.to_string()),
            physical_device: true,
            caps,
        }
    }

    /// Check whether this node identifies as `hid`.
    #[must_use]
    pub fn has_id(&self, hid: &str) -> bool {
        self.hardware_id.as_deref() == Some(hid)
    }

    /// Check whether this node counts towards video capabilities.
    #[must_use]
    pub fn is_video_device(&self) -> bool {
        self.has_id(VIDEO_DEVICE_HID) && self.physical_device
    }
}

/// A walkable device namespace.
pub trait DeviceNamespace: Send + Sync {
    /// Visit every node. Per-node failures go to `visit` as `Err`; an `Err`
    /// return means the walk itself could not be performed.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace cannot be walked at all.
    fn walk(&self, visit: &mut dyn FnMut(Result<DeviceNode>)) -> Result<()>;
}

/// Reports whether the generic video interface can control brightness.
pub trait CapabilityProbe: Send + Sync {
    /// Run the scan. Never fails.
    fn scan(&self) -> bool;
}

/// [`CapabilityProbe`] backed by a [`DeviceNamespace`] walk.
#[derive(Debug, Clone, Default)]
pub struct NamespaceScanner<N> {
    namespace: N,
}

impl<N: DeviceNamespace> NamespaceScanner<N> {
    /// Wrap a namespace.
    #[must_use]
    pub const fn new(namespace: N) -> Self {
        Self { namespace }
    }

    /// OR of the capabilities of every video device.
    #[instrument(level = "debug", skip(self))]
    #[must_use]
    pub fn video_caps(&self) -> VideoCaps {
        let mut caps = VideoCaps::empty();
        let mut skipped = 0usize;
        let walked = self.namespace.walk(&mut |node| match node {
            Ok(node) if node.is_video_device() => {
                debug!(caps = ?node.caps, "video device found");
                caps |= node.caps;
            }
            Ok(_) => {}
            Err(err) => {
                skipped += 1;
                debug!(%err, "skipping namespace node");
            }
        });
        if let Err(err) = walked {
            warn!(%err, "device namespace walk failed, assuming no video capabilities");
            return VideoCaps::empty();
        }
        if skipped > 0 {
            warn!(skipped, "some namespace nodes could not be evaluated");
        }
        caps
    }
}

impl<N: DeviceNamespace> CapabilityProbe for NamespaceScanner<N> {
    fn scan(&self) -> bool {
        self.video_caps().contains(VideoCaps::BACKLIGHT)
    }
}

/// Check whether any node in the namespace carries one of `hids`.
///
/// Best effort like the capability scan: node errors are skipped and a
/// failed walk yields `false`.
#[must_use]
pub fn namespace_has_device(namespace: &dyn DeviceNamespace, hids: &[&str]) -> bool {
    let mut found = false;
    let walked = namespace.walk(&mut |node| {
        if let Ok(node) = node {
            found |= hids.iter().any(|hid| node.has_id(hid));
        }
    });
    walked.is_ok() && found
}

/// Namespace built from a fixed list of nodes.
#[derive(Debug, Clone, Default)]
pub struct StaticNamespace {
    nodes: Vec<Result<DeviceNode>>,
}

impl StaticNamespace {
    /// Namespace with the given nodes, all evaluating successfully.
    #[must_use]
    pub fn new(nodes: impl IntoIterator<Item = DeviceNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(Ok).collect(),
        }
    }

    /// Namespace whose nodes may fail individually.
    #[must_use]
    pub fn with_results(nodes: impl IntoIterator<Item = Result<DeviceNode>>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
        }
    }
}

impl DeviceNamespace for StaticNamespace {
    fn walk(&self, visit: &mut dyn FnMut(Result<DeviceNode>)) -> Result<()> {
        for node in &self.nodes {
            visit(node.clone());
        }
        Ok(())
    }
}

impl<N: DeviceNamespace + ?Sized> DeviceNamespace for std::sync::Arc<N> {
    fn walk(&self, visit: &mut dyn FnMut(Result<DeviceNode>)) -> Result<()> {
        (**self).walk(visit)
    }
}
