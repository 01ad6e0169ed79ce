use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// An assignable 802.1Q VLAN id (1..=4094).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 4094;

    pub fn new(id: u16) -> Result<Self, ModelError> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Ok(Self(id))
        } else {
            Err(ModelError::InvalidVlan(id))
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = ModelError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(id: VlanId) -> Self {
        id.0
    }
}

/// The stacked tag pair a subscriber's traffic carries: inner customer
/// tag and outer service tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VlanPair {
    pub c_tag: VlanId,
    pub s_tag: VlanId,
}

impl VlanPair {
    pub fn new(c_tag: VlanId, s_tag: VlanId) -> Self {
        Self { c_tag, s_tag }
    }
}

impl fmt::Display for VlanPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c-tag {} / s-tag {}", self.c_tag, self.s_tag)
    }
}
