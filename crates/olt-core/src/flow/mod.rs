// ── Dataplane flow programming ──
//
// The backend is whatever actually pushes rules to the device (a driver,
// a flow-rule service, a test double). The provisioner in front of it adds
// idempotency, rollback and a per-attachment-point ledger.

mod provisioner;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::model::{AttachmentPoint, FlowObjective};

pub use provisioner::FlowProvisioner;

/// Dataplane rule installation.
///
/// Failures are opaque; the provisioner decides how to compensate.
#[async_trait]
pub trait FlowBackend: Send + Sync {
    async fn install(&self, objective: &FlowObjective) -> Result<(), BackendError>;

    async fn remove(&self, objective: &FlowObjective) -> Result<(), BackendError>;

    /// Remove every subscriber flow on `attachment_point`, returning how
    /// many were removed.
    async fn remove_all(&self, attachment_point: &AttachmentPoint) -> Result<usize, BackendError>;

    /// Everything currently installed, as reported by the dataplane.
    async fn installed(&self) -> Result<Vec<FlowObjective>, BackendError>;
}
