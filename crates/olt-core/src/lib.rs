// olt-core: subscriber provisioning for access devices (OLTs).
//
// Turns a subscriber's attachment point plus its directory profile into
// dataplane flows, keeps the authoritative table of what is provisioned
// where, and tells observers about every transition.

pub mod config;
pub mod convert;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod flow;
pub mod model;
pub mod reconcile;
pub mod resolver;
pub mod service;
pub mod store;
pub mod stream;
pub mod topology;
pub mod validator;

#[cfg(test)]
mod test_support;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ServiceConfig;
pub use directory::{ProfileDirectory, StaticProfileDirectory};
pub use dispatcher::{AccessDeviceListener, EventDispatcher, SubscriptionHandle};
pub use error::{
    BackendError, CoreError, DirectoryError, FlowError, ListenerError, ModelError, ResolveError,
    StoreError, ValidationError,
};
pub use flow::{FlowBackend, FlowProvisioner};
pub use reconcile::ResyncReport;
pub use resolver::{ResolvedSubscriber, SubscriberProfileResolver};
pub use service::{AccessDeviceService, ProvisionOutcome, RemoveOutcome};
pub use store::{ProvisioningStateStore, RecordOutcome};
pub use stream::{RecordFilter, RecordSnapshot, RecordStream};
pub use topology::{TopologyEvent, TopologyService};
pub use validator::{AttachmentPointValidator, ValidatedPort};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AccessDeviceEvent, AccessDeviceEventKind, Annotations, AttachmentPoint, BandwidthProfileRef,
    BandwidthProfiles, Device, DeviceId, DeviceType, FlowDirection, FlowObjective, MacAddress,
    Port, PortType, ProvisioningRecord, RecordOrigin, SubscriberIdentity, SubscriberProfile,
    VlanId, VlanPair,
};
