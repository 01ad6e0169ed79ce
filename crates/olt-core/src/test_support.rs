// Shared fixtures for unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::BackendError;
use crate::flow::FlowBackend;
use crate::model::{
    Annotations, AttachmentPoint, Device, DeviceId, DeviceType, FlowDirection, FlowObjective,
    Port, PortType, SubscriberProfile, VlanId, VlanPair,
};
use crate::model::topology::{PORT_NAME, PROTOCOL};
use crate::topology::TopologyService;

pub(crate) const OLT: &str = "of:00000000000000aa";
pub(crate) const SERIAL: &str = "BRCM12345678";

pub(crate) fn vlans(c_tag: u16, s_tag: u16) -> VlanPair {
    VlanPair::new(VlanId::new(c_tag).unwrap(), VlanId::new(s_tag).unwrap())
}

pub(crate) fn profile(id: &str, c_tag: u16, s_tag: u16) -> SubscriberProfile {
    SubscriberProfile {
        id: id.to_owned(),
        c_tag: Some(VlanId::new(c_tag).unwrap()),
        s_tag: Some(VlanId::new(s_tag).unwrap()),
        nas_port_id: Some("PON 1/1".into()),
        circuit_id: Some("CIR-PON 1/1".into()),
        ..SubscriberProfile::default()
    }
}

// ── Topology ────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct MockTopology {
    devices: DashMap<DeviceId, Device>,
    ports: DashMap<AttachmentPoint, Port>,
}

impl MockTopology {
    pub(crate) fn add_device(&self, id: &str, protocol: &str) {
        self.devices.insert(
            DeviceId::new(id),
            Device {
                id: DeviceId::new(id),
                device_type: DeviceType::Switch,
                annotations: Annotations::new().with(PROTOCOL, protocol),
            },
        );
    }

    /// Add an enabled port, keyed by `serial` when given.
    pub(crate) fn add_port(&self, device: &str, number: u32, serial: Option<&str>) {
        let annotations = match serial {
            Some(s) => Annotations::new().with(PORT_NAME, s),
            None => Annotations::new(),
        };
        self.ports.insert(
            AttachmentPoint::new(device, number),
            Port {
                number,
                enabled: true,
                speed_mbps: 1000,
                port_type: PortType::Fiber,
                annotations,
            },
        );
    }

    pub(crate) fn set_enabled(&self, attachment_point: &AttachmentPoint, enabled: bool) {
        if let Some(mut port) = self.ports.get_mut(attachment_point) {
            port.enabled = enabled;
        }
    }
}

impl TopologyService for MockTopology {
    fn device(&self, id: &DeviceId) -> Option<Device> {
        self.devices.get(id).map(|d| d.value().clone())
    }

    fn port(&self, attachment_point: &AttachmentPoint) -> Option<Port> {
        self.ports.get(attachment_point).map(|p| p.value().clone())
    }

    fn devices(&self) -> Vec<Device> {
        self.devices.iter().map(|d| d.value().clone()).collect()
    }

    fn ports(&self, device_id: &DeviceId) -> Vec<Port> {
        self.ports
            .iter()
            .filter(|p| p.key().device_id() == device_id)
            .map(|p| p.value().clone())
            .collect()
    }
}

// ── Flow backend ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BackendCall {
    Install(FlowObjective),
    Remove(FlowObjective),
    RemoveAll(AttachmentPoint),
}

#[derive(Default)]
pub(crate) struct RecordingBackend {
    installed: Mutex<Vec<FlowObjective>>,
    calls: Mutex<Vec<BackendCall>>,
    fail_install: Mutex<Option<FlowDirection>>,
    fail_removes: AtomicBool,
}

impl RecordingBackend {
    pub(crate) fn fail_install(&self, direction: FlowDirection) {
        *self.fail_install.lock().unwrap() = Some(direction);
    }

    pub(crate) fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn installed_for(&self, attachment_point: &AttachmentPoint) -> Vec<FlowObjective> {
        self.installed
            .lock()
            .unwrap()
            .iter()
            .filter(|o| &o.attachment_point == attachment_point)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FlowBackend for RecordingBackend {
    async fn install(&self, objective: &FlowObjective) -> Result<(), BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push(BackendCall::Install(objective.clone()));
        if *self.fail_install.lock().unwrap() == Some(objective.direction) {
            return Err(BackendError::new("install rejected"));
        }
        self.installed.lock().unwrap().push(objective.clone());
        Ok(())
    }

    async fn remove(&self, objective: &FlowObjective) -> Result<(), BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push(BackendCall::Remove(objective.clone()));
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(BackendError::new("remove rejected"));
        }
        self.installed.lock().unwrap().retain(|o| o != objective);
        Ok(())
    }

    async fn remove_all(&self, attachment_point: &AttachmentPoint) -> Result<usize, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push(BackendCall::RemoveAll(attachment_point.clone()));
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(BackendError::new("remove rejected"));
        }
        let mut installed = self.installed.lock().unwrap();
        let before = installed.len();
        installed.retain(|o| &o.attachment_point != attachment_point);
        Ok(before - installed.len())
    }

    async fn installed(&self) -> Result<Vec<FlowObjective>, BackendError> {
        Ok(self.installed.lock().unwrap().clone())
    }
}
