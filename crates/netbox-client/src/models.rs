//! NetBox API models
//!
//! These models match the NetBox REST API serializers, reduced to the
//! fields the IPAM provider reads.
//! See: netbox/netbox/ipam/api/serializers_/ip.py

use serde::{Deserialize, Serialize};

/// NetBox API response wrapper (for paginated responses)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Nested VRF reference, as NetBox embeds it on IPAM objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedVrf {
    pub name: String,
}

/// Prefix model matching NetBox PrefixSerializer (reduced)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prefix {
    pub id: u64,
    #[serde(default)]
    pub display: String,
    pub prefix: String, // e.g., "192.168.1.0/24"
    #[serde(default)]
    pub vrf: Option<NestedVrf>,
}

/// IP Range model matching NetBox IPRangeSerializer (reduced)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpRange {
    pub id: u64,
    #[serde(default)]
    pub display: String,
    pub start_address: String, // e.g., "192.168.1.10/24"
    pub end_address: String,   // e.g., "192.168.1.20/24"
    #[serde(default)]
    pub vrf: Option<NestedVrf>,
}

/// One row of the ip-address listing (reduced)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpAddressRecord {
    pub address: String, // e.g., "192.168.1.1/24"
    #[serde(default)]
    pub vrf: Option<NestedVrf>,
}

impl Prefix {
    /// VRF name, empty when the prefix sits in the global VRF.
    pub fn vrf_name(&self) -> &str {
        self.vrf.as_ref().map_or("", |v| v.name.as_str())
    }
}

impl IpRange {
    /// VRF name, empty when the range sits in the global VRF.
    pub fn vrf_name(&self) -> &str {
        self.vrf.as_ref().map_or("", |v| v.name.as_str())
    }
}

impl IpAddressRecord {
    /// VRF name, empty when the address sits in the global VRF.
    pub fn vrf_name(&self) -> &str {
        self.vrf.as_ref().map_or("", |v| v.name.as_str())
    }
}
