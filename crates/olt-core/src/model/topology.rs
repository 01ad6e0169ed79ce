// Read-only views of the devices and ports reported by topology.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::attachment::DeviceId;

/// Annotation carrying the subscriber key (ONU serial) on an access port.
pub const PORT_NAME: &str = "portName";

/// Annotation carrying the management protocol of a device.
pub const PROTOCOL: &str = "protocol";

/// Free-form key/value metadata attached to a device or port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations(BTreeMap<String, String>);

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Coarse device classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[non_exhaustive]
pub enum DeviceType {
    Switch,
    Router,
    Olt,
    Onu,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub device_type: DeviceType,
    pub annotations: Annotations,
}

impl Device {
    /// Access devices announce themselves through the protocol annotation.
    pub fn speaks(&self, protocol: &str) -> bool {
        self.annotations
            .value(PROTOCOL)
            .is_some_and(|p| p.eq_ignore_ascii_case(protocol))
    }
}

/// Physical medium of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[non_exhaustive]
pub enum PortType {
    Copper,
    Fiber,
    Virtual,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub number: u32,
    pub enabled: bool,
    pub speed_mbps: u64,
    pub port_type: PortType,
    pub annotations: Annotations,
}
