// ── Directory-to-domain conversions ──
//
// Bridges `olt_sadis` wire types into `olt_core::model` types and lets a
// `SadisClient` serve as the service's profile directory.

use std::net::IpAddr;

use async_trait::async_trait;
use tracing::warn;

use olt_sadis::{SadisClient, SubscriberEntry};

use crate::directory::ProfileDirectory;
use crate::error::DirectoryError;
use crate::model::{BandwidthProfileRef, MacAddress, SubscriberProfile, VlanId};

// ── Helpers ────────────────────────────────────────────────────────

fn parse_vlan(id: &str, field: &str, raw: Option<u16>) -> Result<Option<VlanId>, DirectoryError> {
    raw.map(VlanId::new)
        .transpose()
        .map_err(|e| DirectoryError::InvalidEntry {
            key: id.to_owned(),
            reason: format!("{field}: {e}"),
        })
}

// ── Profile ────────────────────────────────────────────────────────

impl TryFrom<SubscriberEntry> for SubscriberProfile {
    type Error = DirectoryError;

    /// Out-of-range tags make the entry unusable. An unparseable IP address
    /// is informational only and is dropped.
    fn try_from(entry: SubscriberEntry) -> Result<Self, Self::Error> {
        let c_tag = parse_vlan(&entry.id, "cTag", entry.c_tag)?;
        let s_tag = parse_vlan(&entry.id, "sTag", entry.s_tag)?;

        let ip_address = entry.ip_address.as_deref().and_then(|raw| {
            raw.parse::<IpAddr>()
                .map_err(|_| warn!(key = %entry.id, ip = raw, "ignoring unparseable IP address"))
                .ok()
        });

        Ok(Self {
            c_tag,
            s_tag,
            nas_port_id: entry.nas_port_id,
            circuit_id: entry.circuit_id,
            remote_id: entry.remote_id,
            hardware_identifier: entry.hardware_identifier.map(MacAddress::new),
            ip_address,
            upstream_bandwidth_profile: entry
                .upstream_bandwidth_profile
                .map(BandwidthProfileRef::new),
            downstream_bandwidth_profile: entry
                .downstream_bandwidth_profile
                .map(BandwidthProfileRef::new),
            id: entry.id,
        })
    }
}

// ── Errors ─────────────────────────────────────────────────────────

impl From<olt_sadis::Error> for DirectoryError {
    fn from(err: olt_sadis::Error) -> Self {
        DirectoryError::Unavailable {
            reason: err.to_string(),
        }
    }
}

// ── Directory ──────────────────────────────────────────────────────

#[async_trait]
impl ProfileDirectory for SadisClient {
    async fn get(&self, key: &str) -> Result<Option<SubscriberProfile>, DirectoryError> {
        match self.subscriber(key).await {
            Ok(Some(entry)) => SubscriberProfile::try_from(entry).map(Some),
            Ok(None) => Ok(None),
            Err(olt_sadis::Error::Deserialization { message, .. }) => {
                Err(DirectoryError::InvalidEntry {
                    key: key.to_owned(),
                    reason: message,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
