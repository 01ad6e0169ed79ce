// Wire types served by a SADIS directory.
//
// Field names follow the directory's camelCase JSON. Every service field
// is optional on the wire; deciding which ones are mandatory belongs to
// the consumer.

use serde::{Deserialize, Serialize};

/// One subscriber entry, as returned by `GET /subscribers/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberEntry {
    /// Directory key (typically the ONU serial number).
    pub id: String,

    /// Inner (customer) VLAN tag.
    #[serde(default)]
    pub c_tag: Option<u16>,

    /// Outer (service) VLAN tag.
    #[serde(default)]
    pub s_tag: Option<u16>,

    #[serde(default)]
    pub nas_port_id: Option<String>,

    #[serde(default)]
    pub circuit_id: Option<String>,

    #[serde(default)]
    pub remote_id: Option<String>,

    /// Subscriber MAC address in `aa:bb:cc:dd:ee:ff` form.
    #[serde(default)]
    pub hardware_identifier: Option<String>,

    #[serde(default)]
    pub ip_address: Option<String>,

    #[serde(default)]
    pub upstream_bandwidth_profile: Option<String>,

    #[serde(default)]
    pub downstream_bandwidth_profile: Option<String>,

    /// Technology profile the ONU is configured with (informational).
    #[serde(default)]
    pub technology_profile_id: Option<u32>,
}
