#![allow(dead_code, clippy::unwrap_used)]
// Shared collaborators for the olt-core integration suites.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing_subscriber::fmt::MakeWriter;

use olt_core::{
    AccessDeviceEvent, AccessDeviceListener, AccessDeviceService, Annotations, AttachmentPoint,
    BackendError, Device, DeviceId, DeviceType, DirectoryError, FlowBackend, FlowDirection,
    FlowObjective, ListenerError, Port, PortType, ProfileDirectory, ServiceConfig,
    StaticProfileDirectory, SubscriberProfile, TopologyService, VlanId, VlanPair,
};

pub const OLT: &str = "of:00000000000000aa";
pub const SERIAL: &str = "BRCM12345678";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ap(port: u32) -> AttachmentPoint {
    AttachmentPoint::new(OLT, port)
}

pub fn vlans(c_tag: u16, s_tag: u16) -> VlanPair {
    VlanPair::new(VlanId::new(c_tag).unwrap(), VlanId::new(s_tag).unwrap())
}

pub fn profile(id: &str, c_tag: u16, s_tag: u16) -> SubscriberProfile {
    SubscriberProfile {
        id: id.to_owned(),
        c_tag: Some(VlanId::new(c_tag).unwrap()),
        s_tag: Some(VlanId::new(s_tag).unwrap()),
        nas_port_id: Some("PON 1/1".into()),
        circuit_id: Some("CIR-PON 1/1".into()),
        ..SubscriberProfile::default()
    }
}

/// Poll `check` until it holds, for at most a second.
pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// In-memory log sink for asserting on emitted records.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ── Topology ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockTopology {
    devices: DashMap<DeviceId, Device>,
    ports: DashMap<AttachmentPoint, Port>,
    panic_on_port: AtomicBool,
    panicked: AtomicBool,
}

impl MockTopology {
    pub fn add_device(&self, id: &str, protocol: &str) {
        self.devices.insert(
            DeviceId::new(id),
            Device {
                id: DeviceId::new(id),
                device_type: DeviceType::Switch,
                annotations: Annotations::new().with("protocol", protocol),
            },
        );
    }

    pub fn add_port(&self, device: &str, number: u32, serial: Option<&str>) {
        let annotations = match serial {
            Some(s) => Annotations::new().with("portName", s),
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

    pub fn set_enabled(&self, attachment_point: &AttachmentPoint, enabled: bool) {
        if let Some(mut port) = self.ports.get_mut(attachment_point) {
            port.enabled = enabled;
        }
    }

    pub fn remove_port(&self, attachment_point: &AttachmentPoint) {
        self.ports.remove(attachment_point);
    }

    /// Make the next port lookup panic, as a broken topology source would.
    pub fn panic_on_port_lookup(&self) {
        self.panic_on_port.store(true, Ordering::SeqCst);
    }

    pub fn has_panicked(&self) -> bool {
        self.panicked.load(Ordering::SeqCst)
    }

    pub fn remove_device(&self, id: &str) {
        let id = DeviceId::new(id);
        self.devices.remove(&id);
        self.ports.retain(|ap, _| ap.device_id() != &id);
    }
}

impl TopologyService for MockTopology {
    fn device(&self, id: &DeviceId) -> Option<Device> {
        self.devices.get(id).map(|d| d.value().clone())
    }

    fn port(&self, attachment_point: &AttachmentPoint) -> Option<Port> {
        if self.panic_on_port.swap(false, Ordering::SeqCst) {
            self.panicked.store(true, Ordering::SeqCst);
            panic!("topology source failed");
        }
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

// ── Directory ───────────────────────────────────────────────────────

/// Static profiles behind a transport that can be taken down.
#[derive(Default)]
pub struct SwitchableDirectory {
    profiles: StaticProfileDirectory,
    down: AtomicBool,
}

impl SwitchableDirectory {
    pub fn insert(&self, profile: SubscriberProfile) {
        self.profiles.insert(profile);
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileDirectory for SwitchableDirectory {
    async fn get(&self, key: &str) -> Result<Option<SubscriberProfile>, DirectoryError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable {
                reason: "connection refused".into(),
            });
        }
        self.profiles.get(key).await
    }
}

// ── Flow backend ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Install(FlowObjective),
    Remove(FlowObjective),
    RemoveAll(AttachmentPoint),
}

#[derive(Default)]
pub struct RecordingBackend {
    installed: Mutex<Vec<FlowObjective>>,
    calls: Mutex<Vec<BackendCall>>,
    fail_install: Mutex<Option<FlowDirection>>,
    fail_removes: AtomicBool,
    delay: Mutex<Duration>,
}

impl RecordingBackend {
    pub fn fail_install(&self, direction: FlowDirection) {
        *self.fail_install.lock().unwrap() = Some(direction);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Make every call take `delay` before acting.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Pretend these flows were installed before this process started.
    pub fn preload(&self, objectives: Vec<FlowObjective>) {
        self.installed.lock().unwrap().extend(objectives);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn installs(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::Install(_)))
            .count()
    }

    pub fn installed_for(&self, attachment_point: &AttachmentPoint) -> Vec<FlowObjective> {
        self.installed
            .lock()
            .unwrap()
            .iter()
            .filter(|o| &o.attachment_point == attachment_point)
            .cloned()
            .collect()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl FlowBackend for RecordingBackend {
    async fn install(&self, objective: &FlowObjective) -> Result<(), BackendError> {
        self.pause().await;
        self.record(BackendCall::Install(objective.clone()));
        if *self.fail_install.lock().unwrap() == Some(objective.direction) {
            return Err(BackendError::new("install rejected by device"));
        }
        self.installed.lock().unwrap().push(objective.clone());
        Ok(())
    }

    async fn remove(&self, objective: &FlowObjective) -> Result<(), BackendError> {
        self.pause().await;
        self.record(BackendCall::Remove(objective.clone()));
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(BackendError::new("remove rejected by device"));
        }
        self.installed.lock().unwrap().retain(|o| o != objective);
        Ok(())
    }

    async fn remove_all(&self, attachment_point: &AttachmentPoint) -> Result<usize, BackendError> {
        self.pause().await;
        self.record(BackendCall::RemoveAll(attachment_point.clone()));
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(BackendError::new("remove rejected by device"));
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

// ── Listeners ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct CollectingListener {
    events: Mutex<Vec<AccessDeviceEvent>>,
}

impl CollectingListener {
    pub fn events(&self) -> Vec<AccessDeviceEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AccessDeviceListener for CollectingListener {
    fn event(&self, event: &AccessDeviceEvent) -> Result<(), ListenerError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct FailingListener;

impl AccessDeviceListener for FailingListener {
    fn event(&self, _event: &AccessDeviceEvent) -> Result<(), ListenerError> {
        Err(ListenerError("listener rejected event".into()))
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub struct Harness {
    pub service: AccessDeviceService,
    pub topology: Arc<MockTopology>,
    pub directory: Arc<SwitchableDirectory>,
    pub backend: Arc<RecordingBackend>,
    pub listener: Arc<CollectingListener>,
}

impl Harness {
    /// One OLT with subscriber `SERIAL` (999/111) on port 2; port 1 absent.
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        init_tracing();

        let topology = Arc::new(MockTopology::default());
        topology.add_device(OLT, "OLT");
        topology.add_port(OLT, 2, Some(SERIAL));

        let directory = Arc::new(SwitchableDirectory::default());
        directory.insert(profile(SERIAL, 999, 111));

        let backend = Arc::new(RecordingBackend::default());
        let service = AccessDeviceService::new(
            config,
            topology.clone(),
            directory.clone(),
            backend.clone(),
        );

        let listener = Arc::new(CollectingListener::default());
        service.subscribe(listener.clone());

        Self {
            service,
            topology,
            directory,
            backend,
            listener,
        }
    }

    /// Stop the service and return every event delivered to the listener.
    pub async fn finish(self) -> Vec<AccessDeviceEvent> {
        self.service.shutdown().await;
        self.listener.events()
    }
}
