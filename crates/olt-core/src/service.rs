// ── Access device service ──
//
// Orchestrating façade: validate -> resolve -> install flows -> record ->
// publish. Teardown runs the last three in reverse. Every mutation of one
// attachment point happens under that point's key lock, on a task of its
// own, so dropping the caller's future never aborts dataplane changes
// halfway through.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::directory::ProfileDirectory;
use crate::dispatcher::{AccessDeviceListener, EventDispatcher, SubscriptionHandle};
use crate::error::CoreError;
use crate::flow::{FlowBackend, FlowProvisioner};
use crate::model::{
    AccessDeviceEvent, AttachmentPoint, BandwidthProfileRef, DeviceId, Port, ProvisioningRecord,
    SubscriberIdentity, SubscriberProfile, VlanPair,
};
use crate::resolver::SubscriberProfileResolver;
use crate::store::{KeyedLocks, ProvisioningStateStore};
use crate::stream::{RecordFilter, RecordStream};
use crate::topology::TopologyService;
use crate::validator::AttachmentPointValidator;

/// Result of a successful [`AccessDeviceService::provision`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Provisioned(Arc<ProvisioningRecord>),
    /// An identical record already existed; no flow operation was issued.
    AlreadyProvisioned(Arc<ProvisioningRecord>),
}

impl ProvisionOutcome {
    pub fn record(&self) -> &Arc<ProvisioningRecord> {
        match self {
            Self::Provisioned(r) | Self::AlreadyProvisioned(r) => r,
        }
    }
}

/// Result of a successful [`AccessDeviceService::remove`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(Arc<ProvisioningRecord>),
    /// No record existed; `swept` untracked flows were removed anyway.
    NotProvisioned { swept: usize },
}

/// Provisioning failure plus whatever profile was resolved before it.
struct Failure {
    error: CoreError,
    profile: Option<SubscriberProfile>,
}

impl Failure {
    fn bare(err: impl Into<CoreError>) -> Self {
        Self {
            error: err.into(),
            profile: None,
        }
    }
}

/// Map ordinary refusals onto `Ok(false)`.
fn refusal_as_false(result: Result<bool, CoreError>) -> Result<bool, CoreError> {
    match result {
        Err(e) if e.is_refusal() => Ok(false),
        other => other,
    }
}

// ── AccessDeviceService ─────────────────────────────────────────────

/// The subscriber provisioning service.
///
/// Cheaply cloneable via `Arc<ServiceInner>`. Collaborators are injected
/// at construction; [`start()`](Self::start) spawns the background
/// reconciliation tasks.
#[derive(Clone)]
pub struct AccessDeviceService {
    pub(crate) inner: Arc<ServiceInner>,
}

pub(crate) struct ServiceInner {
    pub(crate) config: ServiceConfig,
    pub(crate) validator: AttachmentPointValidator,
    pub(crate) resolver: SubscriberProfileResolver,
    pub(crate) flows: FlowProvisioner,
    pub(crate) store: ProvisioningStateStore,
    pub(crate) dispatcher: EventDispatcher,
    pub(crate) locks: KeyedLocks<AttachmentPoint>,
    pub(crate) default_bandwidth: BandwidthProfileRef,
    pub(crate) cancel: CancellationToken,
    pub(crate) task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl AccessDeviceService {
    pub fn new(
        config: ServiceConfig,
        topology: Arc<dyn TopologyService>,
        directory: Arc<dyn ProfileDirectory>,
        backend: Arc<dyn FlowBackend>,
    ) -> Self {
        let resolver =
            SubscriberProfileResolver::new(directory, config.subscriber_key_annotation.clone());
        let default_bandwidth = BandwidthProfileRef::new(config.default_bandwidth_profile.clone());

        Self {
            inner: Arc::new(ServiceInner {
                config,
                validator: AttachmentPointValidator::new(topology),
                resolver,
                flows: FlowProvisioner::new(backend),
                store: ProvisioningStateStore::new(),
                dispatcher: EventDispatcher::new(),
                locks: KeyedLocks::new(),
                default_bandwidth,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &ProvisioningStateStore {
        &self.inner.store
    }

    // ── Provisioning ─────────────────────────────────────────────

    /// Provision the subscriber attached at `attachment_point`.
    ///
    /// Refusals are returned as errors (and published as
    /// `PROVISION_FAILED`); see [`provision_subscriber`](Self::provision_subscriber)
    /// for the boolean form.
    pub async fn provision(
        &self,
        attachment_point: &AttachmentPoint,
    ) -> Result<ProvisionOutcome, CoreError> {
        let this = self.clone();
        let ap = attachment_point.clone();
        tokio::spawn(async move { this.provision_locked(&ap).await })
            .await
            .map_err(|e| CoreError::Internal(format!("provisioning task failed: {e}")))?
    }

    /// `Ok(true)` on success (including an identical existing record),
    /// `Ok(false)` on any refusal, `Err` only for malformed input.
    pub async fn provision_subscriber(
        &self,
        attachment_point: &AttachmentPoint,
    ) -> Result<bool, CoreError> {
        refusal_as_false(self.provision(attachment_point).await.map(|_| true))
    }

    /// Provision a subscriber by identity, locating its port through the
    /// directory and topology.
    pub async fn provision_subscriber_by_id(
        &self,
        identity: &SubscriberIdentity,
    ) -> Result<bool, CoreError> {
        let located = self
            .inner
            .resolver
            .locate(identity, self.access_ports())
            .await;
        match located {
            Ok(ap) => self.provision_subscriber(&ap).await,
            Err(e) => {
                warn!(%identity, error = %e, "cannot provision subscriber");
                Ok(false)
            }
        }
    }

    async fn provision_locked(
        &self,
        attachment_point: &AttachmentPoint,
    ) -> Result<ProvisionOutcome, CoreError> {
        let _guard = self.inner.locks.lock(attachment_point).await;

        match self.try_provision(attachment_point).await {
            Ok(outcome) => {
                if let ProvisionOutcome::Provisioned(record) = &outcome {
                    info!(%attachment_point, vlans = %record.vlans, "subscriber provisioned");
                    self.inner.dispatcher.publish(AccessDeviceEvent::provisioned(
                        attachment_point.clone(),
                        record.profile.clone(),
                    ));
                } else {
                    debug!(%attachment_point, "subscriber already provisioned");
                }
                Ok(outcome)
            }
            Err(Failure { error, profile }) => {
                warn!(%attachment_point, error = %error, "provisioning refused");
                if error.is_refusal() {
                    self.inner.dispatcher.publish(AccessDeviceEvent::provision_failed(
                        attachment_point.clone(),
                        profile,
                        error.to_string(),
                    ));
                }
                Err(error)
            }
        }
    }

    async fn try_provision(
        &self,
        attachment_point: &AttachmentPoint,
    ) -> Result<ProvisionOutcome, Failure> {
        let inner = &self.inner;

        let validated = inner
            .validator
            .validate(attachment_point)
            .map_err(Failure::bare)?;
        let resolved = inner
            .resolver
            .resolve(&validated)
            .await
            .map_err(Failure::bare)?;
        let refuse = |error: CoreError| Failure {
            error,
            profile: Some(resolved.profile.clone()),
        };

        if let Some(existing) = inner.store.lookup(attachment_point) {
            if existing.vlans == resolved.vlans {
                return Ok(ProvisionOutcome::AlreadyProvisioned(existing));
            }
            return Err(refuse(CoreError::Conflict {
                attachment_point: attachment_point.clone(),
                existing: existing.vlans,
                requested: resolved.vlans,
            }));
        }

        let bandwidth = resolved
            .profile
            .bandwidth_profiles(&inner.default_bandwidth);
        inner
            .flows
            .install(attachment_point, resolved.vlans, &bandwidth)
            .await
            .map_err(|e| refuse(e.into()))?;

        match inner
            .store
            .record(attachment_point.clone(), resolved.profile.clone(), resolved.vlans)
        {
            Ok(outcome) => Ok(ProvisionOutcome::Provisioned(Arc::clone(outcome.record()))),
            Err(e) => {
                // Unreachable under the key lock; keep flows and table consistent anyway.
                if let Err(undo) = inner.flows.uninstall(attachment_point).await {
                    warn!(
                        %attachment_point,
                        error = %undo,
                        "could not undo flows after store conflict"
                    );
                }
                Err(refuse(e.into()))
            }
        }
    }

    // ── Removal ──────────────────────────────────────────────────

    /// Remove the subscriber at `attachment_point`.
    ///
    /// Flow removal is attempted even when no record exists. On flow
    /// removal failure the record is kept, so the table still describes
    /// what the dataplane holds.
    pub async fn remove(
        &self,
        attachment_point: &AttachmentPoint,
    ) -> Result<RemoveOutcome, CoreError> {
        let this = self.clone();
        let ap = attachment_point.clone();
        tokio::spawn(async move { this.remove_locked(&ap, false).await })
            .await
            .map_err(|e| CoreError::Internal(format!("removal task failed: {e}")))?
    }

    /// `Ok(true)` when nothing is provisioned afterwards (including when
    /// nothing was), `Ok(false)` when flow removal failed.
    pub async fn remove_subscriber(
        &self,
        attachment_point: &AttachmentPoint,
    ) -> Result<bool, CoreError> {
        refusal_as_false(self.remove(attachment_point).await.map(|_| true))
    }

    /// Like [`remove_subscriber`](Self::remove_subscriber), but drops the
    /// record and publishes `REMOVED` even when flow removal fails. The
    /// dataplane may then hold flows the table no longer describes.
    pub async fn force_remove_subscriber(
        &self,
        attachment_point: &AttachmentPoint,
    ) -> Result<bool, CoreError> {
        let this = self.clone();
        let ap = attachment_point.clone();
        let result = tokio::spawn(async move { this.remove_locked(&ap, true).await })
            .await
            .map_err(|e| CoreError::Internal(format!("removal task failed: {e}")))?;
        refusal_as_false(result.map(|_| true))
    }

    /// Remove by identity: the table is consulted first (no topology
    /// needed), then directory and topology.
    pub async fn remove_subscriber_by_id(
        &self,
        identity: &SubscriberIdentity,
    ) -> Result<bool, CoreError> {
        if let Some(record) = self.inner.store.find_by_subscriber(identity) {
            return self.remove_subscriber(&record.attachment_point).await;
        }

        let located = self
            .inner
            .resolver
            .locate(identity, self.access_ports())
            .await;
        match located {
            Ok(ap) => self.remove_subscriber(&ap).await,
            Err(e) => {
                debug!(%identity, error = %e, "subscriber not provisioned, nothing to remove");
                Ok(true)
            }
        }
    }

    async fn remove_locked(
        &self,
        attachment_point: &AttachmentPoint,
        force: bool,
    ) -> Result<RemoveOutcome, CoreError> {
        attachment_point
            .check_well_formed()
            .map_err(|reason| CoreError::MalformedAttachmentPoint {
                attachment_point: attachment_point.clone(),
                reason,
            })?;

        let _guard = self.inner.locks.lock(attachment_point).await;

        let swept = match self.inner.flows.uninstall(attachment_point).await {
            Ok(n) => n,
            Err(e) if force => {
                warn!(%attachment_point, error = %e, "flow removal failed, removing record anyway");
                0
            }
            Err(e) => {
                warn!(%attachment_point, error = %e, "flow removal failed, record kept");
                return Err(e.into());
            }
        };

        match self.inner.store.remove(attachment_point) {
            Some(record) => {
                info!(%attachment_point, vlans = %record.vlans, "subscriber removed");
                self.inner.dispatcher.publish(AccessDeviceEvent::removed(
                    attachment_point.clone(),
                    Some(record.profile.clone()),
                ));
                Ok(RemoveOutcome::Removed(record))
            }
            None => Ok(RemoveOutcome::NotProvisioned { swept }),
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Validate and resolve without provisioning.
    pub async fn get_subscriber(
        &self,
        attachment_point: &AttachmentPoint,
    ) -> Result<SubscriberProfile, CoreError> {
        let validated = self.inner.validator.validate(attachment_point)?;
        let resolved = self.inner.resolver.resolve(&validated).await?;
        Ok(resolved.profile)
    }

    /// Every provisioned attachment point with its VLAN pair.
    pub fn get_subscribers(&self) -> Vec<(AttachmentPoint, VlanPair)> {
        self.inner
            .store
            .list_all()
            .iter()
            .map(|r| (r.attachment_point.clone(), r.vlans))
            .collect()
    }

    /// Owned copy of every provisioned attachment point's cached profile.
    pub fn get_prog_subs(&self) -> BTreeMap<AttachmentPoint, SubscriberProfile> {
        self.inner
            .store
            .list_all()
            .iter()
            .map(|r| (r.attachment_point.clone(), r.profile.clone()))
            .collect()
    }

    /// Devices whose protocol annotation marks them as access devices.
    pub fn fetch_olts(&self) -> Vec<DeviceId> {
        let protocol = &self.inner.config.access_device_protocol;
        let mut olts: Vec<DeviceId> = self
            .inner
            .validator
            .topology()
            .devices()
            .into_iter()
            .filter(|d| d.speaks(protocol))
            .map(|d| d.id)
            .collect();
        olts.sort();
        olts
    }

    /// Every port of every access device, in attachment order.
    pub(crate) fn access_ports(&self) -> Vec<(AttachmentPoint, Port)> {
        let topology = self.inner.validator.topology();
        let mut ports: Vec<(AttachmentPoint, Port)> = self
            .fetch_olts()
            .into_iter()
            .flat_map(|id| {
                topology
                    .ports(&id)
                    .into_iter()
                    .map(move |p| (AttachmentPoint::new(id.clone(), p.number), p))
            })
            .collect();
        ports.sort_by(|a, b| a.0.cmp(&b.0));
        ports
    }

    // ── Observers ────────────────────────────────────────────────

    pub fn subscribe(&self, listener: Arc<dyn AccessDeviceListener>) -> SubscriptionHandle {
        self.inner.dispatcher.subscribe(listener)
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.inner.dispatcher.unsubscribe(handle)
    }

    /// Follow the whole provisioning table.
    pub fn records(&self) -> RecordStream {
        self.inner.store.subscribe(RecordFilter::All)
    }

    /// Follow the records of one OLT.
    pub fn device_records(&self, device_id: &DeviceId) -> RecordStream {
        self.inner
            .store
            .subscribe(RecordFilter::Device(device_id.clone()))
    }
}
