// ── Provisioning domain model ──
//
// Value types shared by every component: where a subscriber is attached,
// what service it was sold, what the dataplane should carry for it, and
// what the service announces to observers.

pub mod attachment;
pub mod event;
pub mod flow;
pub mod profile;
pub mod record;
pub mod topology;
pub mod vlan;

// ── Re-exports ──────────────────────────────────────────────────────

pub use attachment::{AttachmentPoint, DeviceId, SubscriberIdentity};
pub use event::{AccessDeviceEvent, AccessDeviceEventKind};
pub use flow::{FlowDirection, FlowObjective};
pub use profile::{BandwidthProfileRef, BandwidthProfiles, MacAddress, SubscriberProfile};
pub use record::{ProvisioningRecord, RecordOrigin};
pub use topology::{Annotations, Device, DeviceType, Port, PortType};
pub use vlan::{VlanId, VlanPair};
