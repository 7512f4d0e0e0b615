//! NetBox IPAM CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the NetBox IPAM provider.

pub mod ip_pool;
pub mod references;

pub use ip_pool::*;
pub use references::*;
