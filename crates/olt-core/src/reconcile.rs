// ── Reconciliation ──
//
// Keeps the provisioning table honest against topology and the dataplane:
// purges records whose port or device vanished, reacts to pushed topology
// events, and rebuilds the table from installed flows at start-up.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CoreError, DirectoryError, ResolveError, ValidationError};
use crate::flow::FlowProvisioner;
use crate::model::{AccessDeviceEvent, AttachmentPoint, FlowObjective, ProvisioningRecord};
use crate::service::AccessDeviceService;
use crate::stream::RecordFilter;
use crate::topology::TopologyEvent;

/// What [`AccessDeviceService::resync_from_dataplane`] found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncReport {
    /// Attachment points whose record was rebuilt from installed flows.
    pub restored: usize,
    /// Installed flows removed because nothing justified them any more.
    pub swept: usize,
    /// Attachment points whose flows were kept without a record because
    /// the directory could not confirm them.
    pub deferred: usize,
}

impl AccessDeviceService {
    // ── Lifecycle ────────────────────────────────────────────────

    /// Rebuild state from the dataplane, then spawn the background tasks:
    /// periodic reconciliation (unless the interval is 0) and, when
    /// `topology_events` is given, the topology event loop.
    pub async fn start(
        &self,
        topology_events: Option<mpsc::Receiver<TopologyEvent>>,
    ) -> Result<ResyncReport, CoreError> {
        let report = self.resync_from_dataplane().await?;

        let mut handles = self.inner.task_handles.lock().await;

        let interval_secs = self.inner.config.reconcile_interval_secs;
        if interval_secs > 0 {
            let service = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(reconcile_task(service, interval_secs, cancel)));
        }

        if let Some(rx) = topology_events {
            let service = self.clone();
            handles.push(tokio::spawn(topology_event_task(service, rx)));
        }

        info!(
            restored = report.restored,
            swept = report.swept,
            deferred = report.deferred,
            "access device service started"
        );
        Ok(report)
    }

    /// Cancel and join the background tasks, then drain event delivery.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        drop(handles);

        self.inner.dispatcher.shutdown().await;
        debug!("access device service stopped");
    }

    // ── Topology ─────────────────────────────────────────────────

    /// Apply one topology change.
    pub async fn handle_topology_event(&self, event: TopologyEvent) {
        debug!(?event, "topology event");
        match event {
            TopologyEvent::DeviceRemoved(device_id) => {
                let affected = self.inner.store.select(&RecordFilter::Device(device_id));
                for record in affected.iter() {
                    self.purge_if_invalid(&record.attachment_point).await;
                }
            }
            TopologyEvent::PortRemoved(ap)
            | TopologyEvent::PortUpdated {
                attachment_point: ap,
                enabled: false,
            } => {
                self.purge_if_invalid(&ap).await;
            }
            TopologyEvent::PortAdded(ap)
            | TopologyEvent::PortUpdated {
                attachment_point: ap,
                enabled: true,
            } => {
                if self.inner.config.provision_on_port_up && self.inner.store.lookup(&ap).is_none()
                {
                    match self.provision_subscriber(&ap).await {
                        Ok(true) => {}
                        Ok(false) => debug!(attachment_point = %ap, "port up, not provisioned"),
                        Err(e) => warn!(
                            attachment_point = %ap,
                            error = %e,
                            "port up provisioning failed"
                        ),
                    }
                }
            }
        }
    }

    /// Purge every record whose attachment point no longer validates.
    /// Returns how many were purged.
    pub async fn reconcile(&self) -> usize {
        let snapshot = self.inner.store.list_all();
        let mut purged = 0;
        for record in snapshot.iter() {
            if self.purge_if_invalid(&record.attachment_point).await {
                purged += 1;
            }
        }
        if purged > 0 {
            info!(purged, "reconciliation purged stale records");
        }
        purged
    }

    /// Re-validate under the key lock and drop the record if the port or
    /// device is gone or disabled. Flows are removed when the device is
    /// still reachable, otherwise only forgotten.
    async fn purge_if_invalid(&self, attachment_point: &AttachmentPoint) -> bool {
        let inner = &self.inner;
        let _guard = inner.locks.lock(attachment_point).await;

        if inner.store.lookup(attachment_point).is_none() {
            return false;
        }
        let reason = match inner.validator.validate(attachment_point) {
            Ok(_) => return false,
            Err(e) => e,
        };

        if matches!(reason, ValidationError::DeviceNotFound { .. }) {
            inner.flows.forget(attachment_point);
        } else if let Err(e) = inner.flows.uninstall(attachment_point).await {
            warn!(%attachment_point, error = %e, "could not remove flows of stale record");
            inner.flows.forget(attachment_point);
        }

        let Some(record) = inner.store.remove(attachment_point) else {
            return false;
        };
        info!(%attachment_point, reason = %reason, "purged stale record");
        inner.dispatcher.publish(AccessDeviceEvent::removed(
            attachment_point.clone(),
            Some(record.profile.clone()),
        ));
        true
    }

    // ── Dataplane ────────────────────────────────────────────────

    /// Rebuild records and the flow ledger from what the dataplane already
    /// holds.
    ///
    /// Attachment points that still validate and resolve to the same VLAN
    /// pair are restored. Flows are swept only on a definitive answer: the
    /// port is gone or disabled, the subscriber has no usable profile, or
    /// the profile asks for different flows. When the directory cannot be
    /// reached the flows stay installed and are adopted into the ledger, so
    /// a later provision of that port records them without reinstalling.
    pub async fn resync_from_dataplane(&self) -> Result<ResyncReport, CoreError> {
        let inner = &self.inner;
        let installed = inner.flows.installed_state().await?;

        let mut by_ap: BTreeMap<AttachmentPoint, Vec<FlowObjective>> = BTreeMap::new();
        for objective in installed {
            by_ap
                .entry(objective.attachment_point.clone())
                .or_default()
                .push(objective);
        }

        let mut report = ResyncReport::default();
        for (ap, mut objectives) in by_ap {
            let _guard = inner.locks.lock(&ap).await;
            if inner.store.lookup(&ap).is_some() {
                continue;
            }

            objectives.sort_by_key(|o| o.direction);
            match self.verdict(&ap, &objectives).await {
                Verdict::Restore(record) => match inner.store.insert(record.resynced()) {
                    Ok(_) => {
                        inner.flows.adopt(ap.clone(), objectives);
                        report.restored += 1;
                        debug!(attachment_point = %ap, "restored record from dataplane");
                    }
                    Err(e) => {
                        warn!(attachment_point = %ap, error = %e, "cannot restore record");
                        report.deferred += 1;
                    }
                },
                Verdict::Defer(error) => {
                    warn!(
                        attachment_point = %ap,
                        error = %error,
                        "directory unavailable, keeping installed flows"
                    );
                    inner.flows.adopt(ap.clone(), objectives);
                    report.deferred += 1;
                }
                Verdict::Sweep(reason) => {
                    info!(attachment_point = %ap, %reason, "sweeping orphaned flows");
                    for objective in &objectives {
                        match inner.flows.remove_untracked(objective).await {
                            Ok(()) => report.swept += 1,
                            Err(e) => warn!(
                                attachment_point = %ap,
                                error = %e,
                                "could not sweep orphaned flow"
                            ),
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    /// Decide what to do with the flows found on one attachment point.
    async fn verdict(
        &self,
        attachment_point: &AttachmentPoint,
        objectives: &[FlowObjective],
    ) -> Verdict {
        let inner = &self.inner;
        let validated = match inner.validator.validate(attachment_point) {
            Ok(v) => v,
            Err(e) => return Verdict::Sweep(e.to_string()),
        };
        let resolved = match inner.resolver.resolve(&validated).await {
            Ok(r) => r,
            Err(ResolveError::Directory(e)) => return Verdict::Defer(e),
            Err(e) => return Verdict::Sweep(e.to_string()),
        };

        let bandwidth = resolved
            .profile
            .bandwidth_profiles(&inner.default_bandwidth);
        let expected = FlowProvisioner::objectives(attachment_point, resolved.vlans, &bandwidth);
        if expected != objectives {
            return Verdict::Sweep(format!("installed flows do not match {}", resolved.vlans));
        }
        Verdict::Restore(ProvisioningRecord::new(
            attachment_point.clone(),
            resolved.vlans,
            resolved.profile,
        ))
    }
}

enum Verdict {
    Restore(ProvisioningRecord),
    /// No definitive answer yet; leave the dataplane alone.
    Defer(DirectoryError),
    Sweep(String),
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodically purge stale records.
async fn reconcile_task(
    service: AccessDeviceService,
    interval_secs: u64,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                service.reconcile().await;
            }
        }
    }
}

/// Apply pushed topology events until the sender goes away.
async fn topology_event_task(service: AccessDeviceService, mut rx: mpsc::Receiver<TopologyEvent>) {
    let cancel = service.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                service.handle_topology_event(event).await;
            }
        }
    }
}
