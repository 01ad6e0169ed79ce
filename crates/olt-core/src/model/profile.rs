// ── Subscriber service profile ──
//
// The directory's view of what a subscriber line was sold. Every field
// except the id is optional because directory entries are routinely
// incomplete; the resolver decides which gaps are fatal.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::vlan::{VlanId, VlanPair};

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    /// Accepts colon- or dash-separated input in any case.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase().replace('-', ":"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

// ── Bandwidth profiles ──────────────────────────────────────────────

/// Name of a bandwidth profile known to the dataplane (meter template).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandwidthProfileRef(String);

impl BandwidthProfileRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BandwidthProfileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Effective per-direction bandwidth profiles for one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandwidthProfiles {
    pub upstream: BandwidthProfileRef,
    pub downstream: BandwidthProfileRef,
}

// ── SubscriberProfile ───────────────────────────────────────────────

/// A subscriber's service profile as served by the profile directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberProfile {
    pub id: String,
    pub c_tag: Option<VlanId>,
    pub s_tag: Option<VlanId>,
    pub nas_port_id: Option<String>,
    pub circuit_id: Option<String>,
    pub remote_id: Option<String>,
    pub hardware_identifier: Option<MacAddress>,
    pub ip_address: Option<IpAddr>,
    pub upstream_bandwidth_profile: Option<BandwidthProfileRef>,
    pub downstream_bandwidth_profile: Option<BandwidthProfileRef>,
}

impl SubscriberProfile {
    /// The tag pair, when both tags are present.
    pub fn vlan_pair(&self) -> Option<VlanPair> {
        Some(VlanPair::new(self.c_tag?, self.s_tag?))
    }

    /// First mandatory field that is absent, in checking order.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.c_tag.is_none() {
            Some("c_tag")
        } else if self.s_tag.is_none() {
            Some("s_tag")
        } else if self.nas_port_id.is_none() {
            Some("nas_port_id")
        } else if self.circuit_id.is_none() {
            Some("circuit_id")
        } else {
            None
        }
    }

    /// Downstream falls back to upstream, and both fall back to `default`.
    pub fn bandwidth_profiles(&self, default: &BandwidthProfileRef) -> BandwidthProfiles {
        let upstream = self
            .upstream_bandwidth_profile
            .clone()
            .unwrap_or_else(|| default.clone());
        let downstream = self
            .downstream_bandwidth_profile
            .clone()
            .unwrap_or_else(|| upstream.clone());
        BandwidthProfiles {
            upstream,
            downstream,
        }
    }
}
