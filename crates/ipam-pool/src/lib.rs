//! Pool resolution and usage statistics for the NetBox IPAM provider.
//!
//! This crate is the algorithmic core behind the IPPool controller:
//!
//! - [`AddressRange`] represents a contiguous span of IP addresses, built
//!   from a CIDR prefix or an explicit start/end pair.
//! - [`NetboxPool`] is the resolved description of one pool, including the
//!   in-use counter filled in by [`gather_statistics`].
//! - [`PoolResolver`] deduplicates concurrent pool lookups against NetBox
//!   through a single serialized fetch loop and caches the results for the
//!   process lifetime.
//! - [`gather_statistics`] walks the paginated NetBox ip-address table and
//!   attributes every allocated address to the pools that contain it.

pub mod error;
pub mod pool;
pub mod range;
pub mod resolver;
pub mod stats;

#[cfg(test)]
mod resolver_test;
#[cfg(test)]
mod stats_test;

pub use error::PoolError;
pub use pool::{NetboxPool, PoolKey, PoolKind};
pub use range::{AddressError, AddressFamily, AddressRange, parse_address};
pub use resolver::PoolResolver;
pub use stats::gather_statistics;
