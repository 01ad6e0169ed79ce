// ── Lifecycle events ──
//
// Emitted once per provisioning state transition and delivered to every
// registered listener.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use super::attachment::AttachmentPoint;
use super::profile::SubscriberProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessDeviceEventKind {
    Provisioned,
    Removed,
    ProvisionFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDeviceEvent {
    pub id: Uuid,
    pub kind: AccessDeviceEventKind,
    pub attachment_point: AttachmentPoint,
    pub profile: Option<SubscriberProfile>,
    /// Rendered failure, only set for `ProvisionFailed`.
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AccessDeviceEvent {
    fn new(
        kind: AccessDeviceEventKind,
        attachment_point: AttachmentPoint,
        profile: Option<SubscriberProfile>,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            attachment_point,
            profile,
            reason,
            timestamp: Utc::now(),
        }
    }

    pub fn provisioned(attachment_point: AttachmentPoint, profile: SubscriberProfile) -> Self {
        Self::new(
            AccessDeviceEventKind::Provisioned,
            attachment_point,
            Some(profile),
            None,
        )
    }

    pub fn removed(attachment_point: AttachmentPoint, profile: Option<SubscriberProfile>) -> Self {
        Self::new(AccessDeviceEventKind::Removed, attachment_point, profile, None)
    }

    pub fn provision_failed(
        attachment_point: AttachmentPoint,
        profile: Option<SubscriberProfile>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            AccessDeviceEventKind::ProvisionFailed,
            attachment_point,
            profile,
            Some(reason.into()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_renders_in_wire_form() {
        assert_eq!(AccessDeviceEventKind::Provisioned.to_string(), "PROVISIONED");
        assert_eq!(AccessDeviceEventKind::ProvisionFailed.to_string(), "PROVISION_FAILED");
    }

    #[test]
    fn failure_events_carry_reason() {
        let event = AccessDeviceEvent::provision_failed(
            AttachmentPoint::new("of:00000000000000aa", 1),
            None,
            "Invalid attachment point",
        );
        assert_eq!(event.kind, AccessDeviceEventKind::ProvisionFailed);
        assert_eq!(event.reason.as_deref(), Some("Invalid attachment point"));
    }
}
