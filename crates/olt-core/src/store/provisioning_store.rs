// ── Provisioning state store ──
//
// Concurrent map of provisioned attachment points with push-based change
// notification via `watch` channels. Every mutation bumps a version
// counter and rebuilds the snapshot that subscribers receive.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::error::StoreError;
use crate::model::{
    AttachmentPoint, DeviceId, ProvisioningRecord, SubscriberIdentity, SubscriberProfile, VlanPair,
};
use crate::stream::{RecordFilter, RecordSnapshot, RecordStream};

/// Result of a successful [`ProvisioningStateStore::record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Created(Arc<ProvisioningRecord>),
    /// An identical record already existed; nothing changed.
    Unchanged(Arc<ProvisioningRecord>),
}

impl RecordOutcome {
    pub fn record(&self) -> &Arc<ProvisioningRecord> {
        match self {
            Self::Created(r) | Self::Unchanged(r) => r,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

pub struct ProvisioningStateStore {
    records: DashMap<AttachmentPoint, Arc<ProvisioningRecord>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot ordered by attachment point, rebuilt on mutation.
    snapshot: watch::Sender<RecordSnapshot>,
}

impl Default for ProvisioningStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisioningStateStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            records: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Record a provisioned attachment point.
    ///
    /// Identical VLAN pair: no-op. Different pair: `Conflict`, and the
    /// existing record is left untouched.
    pub fn record(
        &self,
        attachment_point: AttachmentPoint,
        profile: SubscriberProfile,
        vlans: VlanPair,
    ) -> Result<RecordOutcome, StoreError> {
        self.insert(ProvisioningRecord::new(attachment_point, vlans, profile))
    }

    /// Insert a fully built record (used by start-up resync), with the same
    /// conflict rules as [`record`](Self::record).
    pub fn insert(&self, record: ProvisioningRecord) -> Result<RecordOutcome, StoreError> {
        let outcome = match self.records.entry(record.attachment_point.clone()) {
            Entry::Occupied(existing) => {
                if existing.get().vlans != record.vlans {
                    return Err(StoreError::Conflict {
                        attachment_point: record.attachment_point,
                        existing: existing.get().vlans,
                        requested: record.vlans,
                    });
                }
                RecordOutcome::Unchanged(Arc::clone(existing.get()))
            }
            Entry::Vacant(slot) => {
                let record = Arc::new(record);
                slot.insert(Arc::clone(&record));
                RecordOutcome::Created(record)
            }
        };

        // The entry guard is released above; rebuilding iterates every shard.
        if outcome.is_created() {
            self.publish();
        }
        Ok(outcome)
    }

    /// Remove a record. Idempotent: absent keys return `None`.
    pub fn remove(&self, attachment_point: &AttachmentPoint) -> Option<Arc<ProvisioningRecord>> {
        let removed = self.records.remove(attachment_point).map(|(_, v)| v);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    /// Remove every record on a device, returning them in attachment order.
    pub fn remove_device(&self, device_id: &DeviceId) -> Vec<Arc<ProvisioningRecord>> {
        let keys: Vec<AttachmentPoint> = self
            .records
            .iter()
            .filter(|r| r.key().device_id() == device_id)
            .map(|r| r.key().clone())
            .collect();

        let mut removed: Vec<_> = keys
            .iter()
            .filter_map(|k| self.records.remove(k).map(|(_, v)| v))
            .collect();
        if !removed.is_empty() {
            removed.sort_by(|a, b| a.attachment_point.cmp(&b.attachment_point));
            self.publish();
        }
        removed
    }

    pub fn lookup(&self, attachment_point: &AttachmentPoint) -> Option<Arc<ProvisioningRecord>> {
        self.records.get(attachment_point).map(|r| Arc::clone(r.value()))
    }

    /// Current snapshot (cheap `Arc` clone). Later mutations never change it.
    pub fn list_all(&self) -> RecordSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Records matching `filter` in the current snapshot.
    pub fn select(&self, filter: &RecordFilter) -> RecordSnapshot {
        filter.apply(&self.list_all())
    }

    /// Record whose cached profile belongs to `identity`.
    pub fn find_by_subscriber(
        &self,
        identity: &SubscriberIdentity,
    ) -> Option<Arc<ProvisioningRecord>> {
        self.select(&RecordFilter::Subscriber(identity.clone()))
            .first()
            .cloned()
    }

    /// Follow the records `filter` selects.
    pub fn subscribe(&self, filter: RecordFilter) -> RecordStream {
        RecordStream::new(self.snapshot.subscribe(), filter)
    }

    /// Monotonic mutation counter.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Rebuild the snapshot from the map.
    ///
    /// The map is read inside `send_modify`, which holds the channel's write
    /// lock, so concurrent rebuilds are serialized and the last one observes
    /// every mutation that finished before it. Callers must not hold a map
    /// guard here.
    fn publish(&self) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| {
            let mut values: Vec<Arc<ProvisioningRecord>> =
                self.records.iter().map(|r| Arc::clone(r.value())).collect();
            values.sort_by(|a, b| a.attachment_point.cmp(&b.attachment_point));
            *snap = Arc::new(values);
        });
        self.version.send_modify(|v| *v += 1);
    }
}
