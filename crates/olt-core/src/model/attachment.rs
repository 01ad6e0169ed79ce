// ── Attachment identity types ──
//
// An attachment point names one physical port on one access device. It is
// the primary key of the provisioning table and the unit of mutual
// exclusion, so it must be cheap to clone, hash and order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// First port number of the reserved logical range (controller, flood,
/// local, ...). Such ports never carry a subscriber.
pub const RESERVED_PORT_BASE: u32 = 0xFFFF_FF00;

// ── DeviceId ────────────────────────────────────────────────────────

/// Topology identifier of a device, e.g. `of:00000000000000aa`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── AttachmentPoint ─────────────────────────────────────────────────

/// A (device, port) pair, rendered as `"<device>/<port>"`.
///
/// Ordering is by device id, then numerically by port, which is the order
/// every snapshot of the provisioning table is returned in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttachmentPoint {
    device_id: DeviceId,
    port: u32,
}

impl AttachmentPoint {
    /// Build an attachment point without checking that it is well formed.
    /// See [`check_well_formed`](Self::check_well_formed).
    pub fn new(device_id: impl Into<DeviceId>, port: u32) -> Self {
        Self {
            device_id: device_id.into(),
            port,
        }
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn port(&self) -> u32 {
        self.port
    }

    /// Structural check that needs no topology: the device id is non-empty
    /// and the port is a physical port number.
    pub fn check_well_formed(&self) -> Result<(), &'static str> {
        if self.device_id.as_str().is_empty() {
            return Err("device id is empty");
        }
        if self.port == 0 {
            return Err("port 0 is not a physical port");
        }
        if self.port >= RESERVED_PORT_BASE {
            return Err("port is in the reserved logical range");
        }
        Ok(())
    }
}

impl fmt::Display for AttachmentPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.port)
    }
}

impl FromStr for AttachmentPoint {
    type Err = ModelError;

    /// Parse `"<device>/<port>"`. Device ids may themselves contain `/`,
    /// so the split happens on the last one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| ModelError::MalformedAttachmentPoint {
            input: s.to_owned(),
            reason,
        };

        let (device, port) = s.rsplit_once('/').ok_or_else(|| malformed("missing '/'"))?;
        let port: u32 = port
            .parse()
            .map_err(|_| malformed("port is not a decimal number"))?;

        let ap = Self::new(device, port);
        ap.check_well_formed().map_err(malformed)?;
        Ok(ap)
    }
}

impl TryFrom<String> for AttachmentPoint {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AttachmentPoint> for String {
    fn from(ap: AttachmentPoint) -> Self {
        ap.to_string()
    }
}

// ── SubscriberIdentity ──────────────────────────────────────────────

/// Logical identifier of a subscriber line (the directory key, typically
/// the ONU serial number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberIdentity(String);

impl SubscriberIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriberIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SubscriberIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}
