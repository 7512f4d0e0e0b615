//! Pool identity and descriptor types.

use crate::range::AddressRange;
use std::fmt;
use std::net::IpAddr;

/// Which NetBox object backs a pool, and therefore which lookup resolves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Pool backed by a NetBox prefix
    Prefix,
    /// Pool backed by a NetBox ip-range
    IpRange,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKind::Prefix => write!(f, "Prefix"),
            PoolKind::IpRange => write!(f, "IPRange"),
        }
    }
}

/// Identity of a pool as requested by a caller.
///
/// Two keys with identical fields resolve to the same cached pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    /// Pool flavor
    pub kind: PoolKind,
    /// Prefix notation, or the start address of an ip-range
    pub cidr: String,
    /// Requested VRF; empty matches any VRF
    pub vrf: String,
    /// Owning tenant; part of the identity only
    pub tenant: String,
}

impl PoolKey {
    /// Create a key
    pub fn new(
        kind: PoolKind,
        cidr: impl Into<String>,
        vrf: impl Into<String>,
        tenant: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            cidr: cidr.into(),
            vrf: vrf.into(),
            tenant: tenant.into(),
        }
    }

    /// Canonical cache key, exact on all four fields.
    pub(crate) fn cache_key(&self) -> String {
        format!("{}/{}/{}/{}", self.kind, self.cidr, self.vrf, self.tenant)
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cache_key())
    }
}

/// A pool as resolved from NetBox.
///
/// Everything but the in-use counter is fixed at resolution time. The
/// counter belongs to whoever runs a statistics pass over the descriptor;
/// the cached copy inside the resolver stays untouched.
#[derive(Debug, Clone)]
pub struct NetboxPool {
    /// NetBox object id
    pub id: u64,
    /// NetBox display name
    pub display: String,
    /// Pool flavor
    pub kind: PoolKind,
    /// VRF the pool lives in; empty for the global VRF
    pub vrf: String,
    /// Addresses covered by the pool
    pub range: AddressRange,
    pub(crate) in_use: u64,
}

impl NetboxPool {
    /// Whether `addr` falls inside the pool's range
    pub fn contains(&self, addr: IpAddr) -> bool {
        self.range.contains(addr)
    }

    /// Total addresses covered by the pool
    pub fn total(&self) -> u64 {
        self.range.count()
    }

    /// Addresses counted as allocated by the last statistics pass
    pub fn in_use(&self) -> u64 {
        self.in_use
    }

    /// Addresses not yet allocated
    pub fn available(&self) -> u64 {
        self.total().saturating_sub(self.in_use)
    }
}

impl fmt::Display for NetboxPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}): total {}, inuse: {}, available: {}",
            self.kind,
            self.display,
            self.id,
            self.total(),
            self.in_use(),
            self.available()
        )
    }
}
