//! NetBox IPAM REST API Client
//!
//! A Rust client library for the slice of the NetBox REST API the IPAM
//! provider consumes: prefix lookup, ip-range lookup and the paginated
//! ip-address listing.
//!
//! # Example
//!
//! ```no_run
//! use netbox_client::{NetBoxClient, NetBoxIpamClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = NetBoxClient::new(
//!     "http://netbox:80".to_string(),
//!     "your-api-token".to_string(),
//! )?;
//!
//! // Look up a prefix by its CIDR notation
//! let prefixes = client.query_prefixes("10.0.0.0/24").await?;
//!
//! // Walk the allocated addresses, one page at a time
//! let page = client.list_ip_addresses(100, 0).await?;
//! println!("{} of {} addresses", page.results.len(), page.count);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod netbox_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::NetBoxClient;
pub use error::NetBoxError;
pub use models::*;
pub use netbox_trait::NetBoxIpamClient;
#[cfg(feature = "test-util")]
pub use mock::MockNetBoxClient;
