use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::AttachmentPoint;
use super::profile::SubscriberProfile;
use super::vlan::VlanPair;

/// How a record came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordOrigin {
    /// Created by a provisioning request.
    Provisioned,
    /// Rebuilt from flows already present in the dataplane at start-up.
    Resynced,
}

/// The authoritative entry for one provisioned attachment point.
///
/// `vlans` never changes for the lifetime of the record; re-provisioning
/// with a different pair is refused by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRecord {
    pub attachment_point: AttachmentPoint,
    pub vlans: VlanPair,
    pub profile: SubscriberProfile,
    pub provisioned_at: DateTime<Utc>,
    pub origin: RecordOrigin,
}

impl ProvisioningRecord {
    pub fn new(
        attachment_point: AttachmentPoint,
        vlans: VlanPair,
        profile: SubscriberProfile,
    ) -> Self {
        Self {
            attachment_point,
            vlans,
            profile,
            provisioned_at: Utc::now(),
            origin: RecordOrigin::Provisioned,
        }
    }

    #[must_use]
    pub fn resynced(mut self) -> Self {
        self.origin = RecordOrigin::Resynced;
        self
    }
}
