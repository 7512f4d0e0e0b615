//! NetBoxIpamClient trait for mocking
//!
//! This trait abstracts the NetBoxClient to enable mocking in unit tests.
//! The concrete NetBoxClient implements this trait, and tests can use mock
//! implementations.

use crate::error::NetBoxError;
use crate::models::*;

/// Trait over the NetBox IPAM read operations the provider consumes
///
/// All async methods must be `Send` to work with Tokio's work-stealing
/// runtime.
#[async_trait::async_trait]
pub trait NetBoxIpamClient: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Validate the API token
    async fn validate_token(&self) -> Result<(), NetBoxError>;

    /// Query prefixes whose notation matches `prefix` (all prefixes when
    /// empty). VRF filtering happens client-side on the reduced result.
    async fn query_prefixes(&self, prefix: &str) -> Result<Vec<Prefix>, NetBoxError>;

    /// Query ip-ranges whose start address matches `start_address` (all
    /// ranges when empty).
    async fn query_ip_ranges(&self, start_address: &str) -> Result<Vec<IpRange>, NetBoxError>;

    /// List one page of the ip-address table. Callers advance `offset` by
    /// `limit` until a page comes back empty.
    async fn list_ip_addresses(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<PaginatedResponse<IpAddressRecord>, NetBoxError>;
}
