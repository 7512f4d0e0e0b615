//! NetBox API client
//!
//! Implements the NetBox REST API client for IPAM read operations.
//! Based on NetBox API structure: /api/ipam/prefixes/, /api/ipam/ip-ranges/
//! and /api/ipam/ip-addresses/

use crate::error::NetBoxError;
use crate::models::*;
use crate::netbox_trait::NetBoxIpamClient;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// NetBox API client
pub struct NetBoxClient {
    client: Client,
    base_url: String,
    token: String,
}

impl NetBoxClient {
    /// Create a new NetBox client
    ///
    /// # Arguments
    /// * `base_url` - NetBox base URL (e.g., "http://netbox:80")
    /// * `token` - API token for authentication
    pub fn new(base_url: String, token: String) -> Result<Self, NetBoxError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(NetBoxError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a paginated endpoint, returning one page.
    async fn get_page<T: for<'de> serde::Deserialize<'de>>(
        &self,
        path: &str,
        filters: &[(&str, &str)],
    ) -> Result<PaginatedResponse<T>, NetBoxError> {
        let mut url = format!("{}{}", self.base_url, path);

        if !filters.is_empty() {
            let query: Vec<String> = filters
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            url = format!("{}?{}", url, query.join("&"));
        }

        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(NetBoxError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NetBoxError::Api(format!(
                "GET {} failed: {} - {}",
                path, status, body
            )));
        }

        // Try to deserialize, but capture the response body for better error messages
        let response_text = response.text().await?;
        let page: PaginatedResponse<T> = serde_json::from_str(&response_text).map_err(|e| {
            NetBoxError::Api(format!(
                "error decoding response body: {} - Response (first 500 chars): {}",
                e,
                response_text.chars().take(500).collect::<String>()
            ))
        })?;

        Ok(page)
    }
}

#[async_trait::async_trait]
impl NetBoxIpamClient for NetBoxClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Validate the API token by making a simple authenticated request.
    ///
    /// This tests connectivity and token validity before proceeding with
    /// operations, using the lightweight NetBox status endpoint.
    async fn validate_token(&self) -> Result<(), NetBoxError> {
        let url = format!("{}/api/status/", self.base_url);
        debug!("Validating NetBox token and connectivity");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(NetBoxError::Http)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == 401 || status == 403 {
            return Err(NetBoxError::Authentication(format!(
                "Invalid token: {} - {}",
                status, body
            )));
        }

        if !status.is_success() {
            return Err(NetBoxError::Api(format!(
                "Failed to validate token: {} - {}",
                status, body
            )));
        }

        debug!("Token validated successfully");
        Ok(())
    }

    async fn query_prefixes(&self, prefix: &str) -> Result<Vec<Prefix>, NetBoxError> {
        debug!("Querying prefixes matching '{}'", prefix);
        let mut filters: Vec<(&str, &str)> = Vec::new();
        if !prefix.is_empty() {
            filters.push(("prefix", prefix));
        }
        let page = self
            .get_page::<Prefix>("/api/ipam/prefixes/", &filters)
            .await?;
        Ok(page.results)
    }

    async fn query_ip_ranges(&self, start_address: &str) -> Result<Vec<IpRange>, NetBoxError> {
        debug!("Querying ip-ranges starting at '{}'", start_address);
        let mut filters: Vec<(&str, &str)> = Vec::new();
        if !start_address.is_empty() {
            filters.push(("start_address", start_address));
        }
        let page = self
            .get_page::<IpRange>("/api/ipam/ip-ranges/", &filters)
            .await?;
        Ok(page.results)
    }

    async fn list_ip_addresses(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<PaginatedResponse<IpAddressRecord>, NetBoxError> {
        debug!("Listing ip-addresses limit={} offset={}", limit, offset);
        let limit = limit.to_string();
        let offset = offset.to_string();
        self.get_page::<IpAddressRecord>(
            "/api/ipam/ip-addresses/",
            &[("limit", limit.as_str()), ("offset", offset.as_str())],
        )
        .await
    }
}
