// ── Record filters ──
//
// Narrow a provisioning table snapshot to the records an observer or a
// reconciliation pass cares about.

use std::sync::Arc;

use super::RecordSnapshot;
use crate::model::{DeviceId, ProvisioningRecord, RecordOrigin, SubscriberIdentity};

/// Selects records from a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RecordFilter {
    #[default]
    All,
    /// Every record on one access device.
    Device(DeviceId),
    /// The record whose cached profile belongs to a subscriber.
    Subscriber(SubscriberIdentity),
    /// Records created by provisioning, or rebuilt at start-up.
    Origin(RecordOrigin),
}

impl RecordFilter {
    pub fn matches(&self, record: &ProvisioningRecord) -> bool {
        match self {
            Self::All => true,
            Self::Device(id) => record.attachment_point.device_id() == id,
            Self::Subscriber(identity) => record.profile.id == identity.as_str(),
            Self::Origin(origin) => record.origin == *origin,
        }
    }

    /// The matching part of `snapshot`, still in attachment order.
    pub fn apply(&self, snapshot: &RecordSnapshot) -> RecordSnapshot {
        if *self == Self::All {
            return Arc::clone(snapshot);
        }
        Arc::new(
            snapshot
                .iter()
                .filter(|r| self.matches(r))
                .cloned()
                .collect(),
        )
    }
}
