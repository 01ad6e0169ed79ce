// ── Provisioning state ──
//
// The store is the only shared mutable state of the service. Per-key
// locks serialize operations on one attachment point without blocking
// the others.

mod keyed_locks;
mod provisioning_store;

pub(crate) use keyed_locks::KeyedLocks;
pub use provisioning_store::{ProvisioningStateStore, RecordOutcome};
