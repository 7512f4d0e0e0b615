//! Integration tests for NetBox client
//!
//! These tests require a running NetBox instance.
//! Set NETBOX_URL and NETBOX_TOKEN environment variables to run.

use netbox_client::{NetBoxClient, NetBoxIpamClient};

fn live_client() -> NetBoxClient {
    let url = std::env::var("NETBOX_URL").unwrap_or_else(|_| "http://localhost:8001".to_string());
    let token = std::env::var("NETBOX_TOKEN").expect("NETBOX_TOKEN environment variable must be set");
    NetBoxClient::new(url, token).expect("Failed to create client")
}

#[tokio::test]
#[ignore] // Requires running NetBox instance
async fn test_client_connectivity() {
    let client = live_client();
    client.validate_token().await.expect("Failed to validate token");
}

#[tokio::test]
#[ignore]
async fn test_query_prefixes() {
    let client = live_client();

    // Query all prefixes
    let prefixes = client.query_prefixes("").await.expect("Failed to query prefixes");

    println!("Found {} prefixes", prefixes.len());
}

#[tokio::test]
#[ignore]
async fn test_query_ip_ranges() {
    let client = live_client();

    let ranges = client.query_ip_ranges("").await.expect("Failed to query ip-ranges");

    println!("Found {} ip-ranges", ranges.len());
}

#[tokio::test]
#[ignore]
async fn test_list_ip_addresses_paginates() {
    let client = live_client();

    let mut offset = 0;
    let mut total = 0;
    loop {
        let page = client
            .list_ip_addresses(100, offset)
            .await
            .expect("Failed to list ip-addresses");
        if page.results.is_empty() {
            break;
        }
        total += page.results.len();
        offset += 100;
    }

    println!("Walked {} ip-addresses", total);
}
