// ── Attachment point validation ──
//
// Confirms against live topology that an attachment point can carry a
// subscriber right now. Nothing is cached: each call reads topology.

use std::sync::Arc;

use tracing::debug;

use crate::error::ValidationError;
use crate::model::{AttachmentPoint, Device, MacAddress, Port};
use crate::topology::TopologyService;

/// Annotation some vendors use to publish the ONU's MAC on the port.
const HARDWARE_ID_ANNOTATION: &str = "hardwareIdentifier";

/// An attachment point that existed and was enabled when checked, with
/// the topology metadata seen at that moment.
#[derive(Debug, Clone)]
pub struct ValidatedPort {
    pub attachment_point: AttachmentPoint,
    pub device: Device,
    pub port: Port,
}

impl ValidatedPort {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.port.annotations.value(key)
    }

    pub fn hardware_identifier(&self) -> Option<MacAddress> {
        self.annotation(HARDWARE_ID_ANNOTATION).map(MacAddress::new)
    }
}

pub struct AttachmentPointValidator {
    topology: Arc<dyn TopologyService>,
}

impl AttachmentPointValidator {
    pub fn new(topology: Arc<dyn TopologyService>) -> Self {
        Self { topology }
    }

    /// Checks run in order: well-formedness, device, port, enabled.
    pub fn validate(
        &self,
        attachment_point: &AttachmentPoint,
    ) -> Result<ValidatedPort, ValidationError> {
        attachment_point
            .check_well_formed()
            .map_err(|reason| ValidationError::Malformed {
                attachment_point: attachment_point.clone(),
                reason,
            })?;

        let device_id = attachment_point.device_id();
        let device = self
            .topology
            .device(device_id)
            .ok_or_else(|| ValidationError::DeviceNotFound {
                device_id: device_id.clone(),
            })?;

        let Some(port) = self.topology.port(attachment_point) else {
            debug!(%attachment_point, "topology has no such port");
            return Err(ValidationError::PortNotFound {
                attachment_point: attachment_point.clone(),
            });
        };

        if !port.enabled {
            return Err(ValidationError::PortDisabled {
                attachment_point: attachment_point.clone(),
            });
        }

        Ok(ValidatedPort {
            attachment_point: attachment_point.clone(),
            device,
            port,
        })
    }

    pub(crate) fn topology(&self) -> &Arc<dyn TopologyService> {
        &self.topology
    }
}
