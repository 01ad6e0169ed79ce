// ── Runtime service configuration ──
//
// Plain settings for `AccessDeviceService`. The core never reads config
// files; `olt-config` (or any embedder) builds this and hands it in.

use crate::model::topology::PORT_NAME;

/// Configuration for one provisioning service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Port annotation whose value is the subscriber's directory key.
    pub subscriber_key_annotation: String,
    /// Value of a device's `protocol` annotation that marks it as an
    /// access device.
    pub access_device_protocol: String,
    /// Bandwidth profile used when a subscriber profile names none.
    pub default_bandwidth_profile: String,
    /// How often to sweep records against topology (seconds). 0 = never.
    pub reconcile_interval_secs: u64,
    /// Provision automatically when a port comes up or is added.
    pub provision_on_port_up: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            subscriber_key_annotation: PORT_NAME.into(),
            access_device_protocol: "OLT".into(),
            default_bandwidth_profile: "Default".into(),
            reconcile_interval_secs: 300,
            provision_on_port_up: false,
        }
    }
}
