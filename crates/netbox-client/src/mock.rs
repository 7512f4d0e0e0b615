//! Mock NetBoxIpamClient for unit testing
//!
//! This module provides a mock implementation of NetBoxIpamClient that can
//! be used in unit tests without requiring a running NetBox instance.
//!
//! The mock stores resources in memory, counts invocations per endpoint
//! (so single-flight behavior can be asserted), and can be switched into a
//! stalled or failing mode for cancellation and transport-error scenarios.

use crate::error::NetBoxError;
use crate::models::*;
use crate::netbox_trait::NetBoxIpamClient;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock NetBox client for testing
#[derive(Clone)]
pub struct MockNetBoxClient {
    base_url: String,
    // In-memory storage for resources
    prefixes: Arc<Mutex<Vec<Prefix>>>,
    ip_ranges: Arc<Mutex<Vec<IpRange>>>,
    ip_addresses: Arc<Mutex<Vec<IpAddressRecord>>>,
    // Invocation counters
    prefix_queries: Arc<AtomicUsize>,
    range_queries: Arc<AtomicUsize>,
    address_pages: Arc<AtomicUsize>,
    // Behavior switches
    stalled: Arc<AtomicBool>,
    fail_addresses: Arc<AtomicBool>,
}

impl std::fmt::Debug for MockNetBoxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockNetBoxClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl MockNetBoxClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            prefixes: Arc::new(Mutex::new(Vec::new())),
            ip_ranges: Arc::new(Mutex::new(Vec::new())),
            ip_addresses: Arc::new(Mutex::new(Vec::new())),
            prefix_queries: Arc::new(AtomicUsize::new(0)),
            range_queries: Arc::new(AtomicUsize::new(0)),
            address_pages: Arc::new(AtomicUsize::new(0)),
            stalled: Arc::new(AtomicBool::new(false)),
            fail_addresses: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add a prefix to the mock store (for test setup)
    pub fn add_prefix(&self, prefix: Prefix) {
        self.prefixes.lock().unwrap().push(prefix);
    }

    /// Add an ip-range to the mock store (for test setup)
    pub fn add_ip_range(&self, range: IpRange) {
        self.ip_ranges.lock().unwrap().push(range);
    }

    /// Add an allocated address to the mock store (for test setup)
    pub fn add_ip_address(&self, record: IpAddressRecord) {
        self.ip_addresses.lock().unwrap().push(record);
    }

    /// Number of prefix queries served so far
    pub fn prefix_queries(&self) -> usize {
        self.prefix_queries.load(Ordering::SeqCst)
    }

    /// Number of ip-range queries served so far
    pub fn range_queries(&self) -> usize {
        self.range_queries.load(Ordering::SeqCst)
    }

    /// Number of ip-address pages served so far
    pub fn address_pages(&self) -> usize {
        self.address_pages.load(Ordering::SeqCst)
    }

    /// Make every query hang forever (cancellation scenarios)
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    /// Make the ip-address listing fail with an API error
    pub fn set_fail_addresses(&self, fail: bool) {
        self.fail_addresses.store(fail, Ordering::SeqCst);
    }

    async fn maybe_stall(&self) {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait::async_trait]
impl NetBoxIpamClient for MockNetBoxClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_token(&self) -> Result<(), NetBoxError> {
        Ok(())
    }

    async fn query_prefixes(&self, prefix: &str) -> Result<Vec<Prefix>, NetBoxError> {
        self.prefix_queries.fetch_add(1, Ordering::SeqCst);
        self.maybe_stall().await;

        let prefixes = self.prefixes.lock().unwrap();
        Ok(prefixes
            .iter()
            .filter(|p| prefix.is_empty() || p.prefix == prefix)
            .cloned()
            .collect())
    }

    async fn query_ip_ranges(&self, start_address: &str) -> Result<Vec<IpRange>, NetBoxError> {
        self.range_queries.fetch_add(1, Ordering::SeqCst);
        self.maybe_stall().await;

        let ranges = self.ip_ranges.lock().unwrap();
        Ok(ranges
            .iter()
            .filter(|r| start_address.is_empty() || r.start_address == start_address)
            .cloned()
            .collect())
    }

    async fn list_ip_addresses(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<PaginatedResponse<IpAddressRecord>, NetBoxError> {
        self.address_pages.fetch_add(1, Ordering::SeqCst);
        self.maybe_stall().await;

        if self.fail_addresses.load(Ordering::SeqCst) {
            return Err(NetBoxError::Api(
                "GET /api/ipam/ip-addresses/ failed: 500 - mock failure".to_string(),
            ));
        }

        let addresses = self.ip_addresses.lock().unwrap();
        let start = (offset as usize).min(addresses.len());
        let end = (start + limit as usize).min(addresses.len());

        Ok(PaginatedResponse {
            count: addresses.len() as u64,
            next: None,
            previous: None,
            results: addresses[start..end].to_vec(),
        })
    }
}
