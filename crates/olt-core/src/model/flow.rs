use serde::{Deserialize, Serialize};
use strum::Display;

use super::attachment::AttachmentPoint;
use super::profile::BandwidthProfileRef;
use super::vlan::VlanPair;

/// Traffic direction of a flow objective, relative to the subscriber.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum FlowDirection {
    Upstream,
    Downstream,
}

/// One dataplane rule request. A provisioned subscriber owns exactly two,
/// upstream first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowObjective {
    pub attachment_point: AttachmentPoint,
    pub direction: FlowDirection,
    pub vlans: VlanPair,
    pub bandwidth_profile: BandwidthProfileRef,
}
