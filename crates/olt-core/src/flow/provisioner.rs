// ── Flow provisioner ──
//
// Turns a provisioning decision into backend calls. Callers serialize
// per attachment point (see `KeyedLocks`), so ledger entries are never
// raced; the DashMap only guards against cross-key interference.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, error, info, warn};

use super::FlowBackend;
use crate::error::FlowError;
use crate::model::{
    AttachmentPoint, BandwidthProfiles, FlowDirection, FlowObjective, VlanPair,
};

pub struct FlowProvisioner {
    backend: Arc<dyn FlowBackend>,
    /// Objectives this process installed (or adopted), in install order.
    ledger: DashMap<AttachmentPoint, Vec<FlowObjective>>,
}

impl FlowProvisioner {
    pub fn new(backend: Arc<dyn FlowBackend>) -> Self {
        Self {
            backend,
            ledger: DashMap::new(),
        }
    }

    /// The upstream and downstream objectives for one subscriber.
    pub fn objectives(
        attachment_point: &AttachmentPoint,
        vlans: VlanPair,
        bandwidth: &BandwidthProfiles,
    ) -> Vec<FlowObjective> {
        vec![
            FlowObjective {
                attachment_point: attachment_point.clone(),
                direction: FlowDirection::Upstream,
                vlans,
                bandwidth_profile: bandwidth.upstream.clone(),
            },
            FlowObjective {
                attachment_point: attachment_point.clone(),
                direction: FlowDirection::Downstream,
                vlans,
                bandwidth_profile: bandwidth.downstream.clone(),
            },
        ]
    }

    /// Install the subscriber's flows.
    ///
    /// Returns `Ok(false)` without touching the backend when the identical
    /// objectives are already in the ledger. On partial failure every
    /// objective installed by this call is removed again before the error
    /// is returned.
    pub async fn install(
        &self,
        attachment_point: &AttachmentPoint,
        vlans: VlanPair,
        bandwidth: &BandwidthProfiles,
    ) -> Result<bool, FlowError> {
        let objectives = Self::objectives(attachment_point, vlans, bandwidth);

        if let Some(existing) = self.ledger.get(attachment_point) {
            if *existing == objectives {
                debug!(%attachment_point, "flows already installed");
                return Ok(false);
            }
            return Err(FlowError::Occupied {
                attachment_point: attachment_point.clone(),
            });
        }

        let mut applied: Vec<&FlowObjective> = Vec::with_capacity(objectives.len());
        for objective in &objectives {
            if let Err(source) = self.backend.install(objective).await {
                warn!(
                    %attachment_point,
                    direction = %objective.direction,
                    error = %source,
                    "flow install failed, rolling back"
                );
                self.roll_back(&applied).await;
                return Err(FlowError::Install {
                    attachment_point: attachment_point.clone(),
                    direction: objective.direction,
                    source,
                });
            }
            applied.push(objective);
        }

        debug!(%attachment_point, %vlans, "flows installed");
        self.ledger.insert(attachment_point.clone(), objectives);
        Ok(true)
    }

    async fn roll_back(&self, applied: &[&FlowObjective]) {
        for objective in applied.iter().rev() {
            if let Err(e) = self.backend.remove(objective).await {
                error!(
                    attachment_point = %objective.attachment_point,
                    direction = %objective.direction,
                    error = %e,
                    "rollback failed, dataplane holds an orphaned flow"
                );
            }
        }
    }

    /// Remove the subscriber's flows, returning how many were removed.
    ///
    /// Without a ledger entry the backend is asked to sweep the attachment
    /// point; finding nothing there is not an error. When a removal fails
    /// the objectives still installed stay in the ledger.
    pub async fn uninstall(&self, attachment_point: &AttachmentPoint) -> Result<usize, FlowError> {
        let Some((_, mut objectives)) = self.ledger.remove(attachment_point) else {
            let swept = self
                .backend
                .remove_all(attachment_point)
                .await
                .map_err(|source| FlowError::Remove {
                    attachment_point: attachment_point.clone(),
                    source,
                })?;
            if swept == 0 {
                info!(%attachment_point, "no flows found to remove");
            } else {
                debug!(%attachment_point, swept, "swept untracked flows");
            }
            return Ok(swept);
        };

        let mut removed = 0;
        while let Some(objective) = objectives.pop() {
            if let Err(source) = self.backend.remove(&objective).await {
                objectives.push(objective);
                self.ledger.insert(attachment_point.clone(), objectives);
                return Err(FlowError::Remove {
                    attachment_point: attachment_point.clone(),
                    source,
                });
            }
            removed += 1;
        }

        debug!(%attachment_point, removed, "flows removed");
        Ok(removed)
    }

    /// Drop the ledger entry without touching the backend (the device is gone).
    pub fn forget(&self, attachment_point: &AttachmentPoint) -> Option<Vec<FlowObjective>> {
        self.ledger.remove(attachment_point).map(|(_, v)| v)
    }

    /// Seed the ledger with objectives found already installed.
    pub fn adopt(&self, attachment_point: AttachmentPoint, objectives: Vec<FlowObjective>) {
        self.ledger.insert(attachment_point, objectives);
    }

    /// Ledger entry for one attachment point.
    pub fn installed(&self, attachment_point: &AttachmentPoint) -> Option<Vec<FlowObjective>> {
        self.ledger.get(attachment_point).map(|r| r.value().clone())
    }

    /// Ask the backend what the dataplane currently holds.
    pub async fn installed_state(&self) -> Result<Vec<FlowObjective>, FlowError> {
        self.backend
            .installed()
            .await
            .map_err(|source| FlowError::Query { source })
    }

    /// Remove one objective the ledger does not know about.
    pub async fn remove_untracked(&self, objective: &FlowObjective) -> Result<(), FlowError> {
        self.backend
            .remove(objective)
            .await
            .map_err(|source| FlowError::Remove {
                attachment_point: objective.attachment_point.clone(),
                source,
            })
    }
}
