// ── Topology collaborator ──
//
// Device and port discovery lives outside this crate. The service only
// reads the current view, synchronously, and optionally consumes pushed
// change notifications.

use crate::model::{AttachmentPoint, Device, DeviceId, Port};

/// Live view of devices and ports.
///
/// Implementations answer from their own cache; none of these calls may
/// block on I/O.
pub trait TopologyService: Send + Sync {
    fn device(&self, id: &DeviceId) -> Option<Device>;

    fn port(&self, attachment_point: &AttachmentPoint) -> Option<Port>;

    fn devices(&self) -> Vec<Device>;

    fn ports(&self, device_id: &DeviceId) -> Vec<Port>;
}

/// Topology change pushed to the service's event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyEvent {
    DeviceRemoved(DeviceId),
    PortRemoved(AttachmentPoint),
    PortUpdated {
        attachment_point: AttachmentPoint,
        enabled: bool,
    },
    PortAdded(AttachmentPoint),
}

impl TopologyEvent {
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::DeviceRemoved(id) => id,
            Self::PortRemoved(ap) | Self::PortAdded(ap) => ap.device_id(),
            Self::PortUpdated {
                attachment_point, ..
            } => attachment_point.device_id(),
        }
    }
}
