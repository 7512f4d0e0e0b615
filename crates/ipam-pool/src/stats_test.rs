//! Unit tests for the usage aggregator

#[cfg(test)]
mod tests {
    use crate::error::PoolError;
    use crate::pool::{NetboxPool, PoolKind};
    use crate::range::AddressRange;
    use crate::stats::gather_statistics;
    use netbox_client::{IpAddressRecord, MockNetBoxClient, NestedVrf};

    fn pool_from_cidr(id: u64, cidr: &str, vrf: &str) -> NetboxPool {
        NetboxPool {
            id,
            display: cidr.to_string(),
            kind: PoolKind::Prefix,
            vrf: vrf.to_string(),
            range: AddressRange::from_cidr(cidr).unwrap(),
            in_use: 0,
        }
    }

    fn record(address: &str, vrf: Option<&str>) -> IpAddressRecord {
        IpAddressRecord {
            address: address.to_string(),
            vrf: vrf.map(|name| NestedVrf {
                name: name.to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_counts_only_contained_addresses() {
        let client = MockNetBoxClient::new("http://netbox");
        client.add_ip_address(record("10.0.0.5/24", None));
        client.add_ip_address(record("10.0.1.5/24", None));

        let mut pools = vec![pool_from_cidr(1, "10.0.0.0/24", "")];
        gather_statistics(&client, &mut pools).await.unwrap();

        assert_eq!(pools[0].in_use(), 1);
        assert_eq!(pools[0].total(), 256);
        assert_eq!(pools[0].available(), 255);
        // One data page plus the empty page that ends the walk.
        assert_eq!(client.address_pages(), 2);
    }

    #[tokio::test]
    async fn test_pagination_walks_all_pages() {
        let client = MockNetBoxClient::new("http://netbox");
        for i in 0..150u32 {
            client.add_ip_address(record(&format!("10.0.0.{}/16", i), None));
        }

        let mut pools = vec![pool_from_cidr(1, "10.0.0.0/16", "")];
        gather_statistics(&client, &mut pools).await.unwrap();

        assert_eq!(pools[0].in_use(), 150);
        // 100 + 50 + empty terminator.
        assert_eq!(client.address_pages(), 3);
    }

    #[tokio::test]
    async fn test_counters_reset_between_passes() {
        let client = MockNetBoxClient::new("http://netbox");
        client.add_ip_address(record("10.0.0.5/24", None));

        let mut pools = vec![pool_from_cidr(1, "10.0.0.0/24", "")];
        gather_statistics(&client, &mut pools).await.unwrap();
        gather_statistics(&client, &mut pools).await.unwrap();

        assert_eq!(pools[0].in_use(), 1);
    }

    #[tokio::test]
    async fn test_vrf_must_match() {
        let client = MockNetBoxClient::new("http://netbox");
        client.add_ip_address(record("10.0.0.5/24", Some("blue")));
        client.add_ip_address(record("10.0.0.6/24", None));
        client.add_ip_address(record("10.0.0.7/24", Some("green")));

        let mut pools = vec![
            pool_from_cidr(1, "10.0.0.0/24", "blue"),
            pool_from_cidr(2, "10.0.0.0/24", ""),
        ];
        gather_statistics(&client, &mut pools).await.unwrap();

        assert_eq!(pools[0].in_use(), 1);
        assert_eq!(pools[1].in_use(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_pools_both_count() {
        let client = MockNetBoxClient::new("http://netbox");
        client.add_ip_address(record("10.0.0.5/24", None));

        let mut pools = vec![
            pool_from_cidr(1, "10.0.0.0/24", ""),
            pool_from_cidr(2, "10.0.0.0/16", ""),
        ];
        gather_statistics(&client, &mut pools).await.unwrap();

        // No cross-pool dedup; disjointness is the caller's job.
        assert_eq!(pools[0].in_use(), 1);
        assert_eq!(pools[1].in_use(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_record_skipped() {
        let client = MockNetBoxClient::new("http://netbox");
        client.add_ip_address(record("garbage", None));
        client.add_ip_address(record("10.0.0.5/24", None));

        let mut pools = vec![pool_from_cidr(1, "10.0.0.0/24", "")];
        gather_statistics(&client, &mut pools).await.unwrap();

        assert_eq!(pools[0].in_use(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_aborts_pass() {
        let client = MockNetBoxClient::new("http://netbox");
        client.set_fail_addresses(true);

        let mut pools = vec![pool_from_cidr(1, "10.0.0.0/24", "")];
        pools[0].in_use = 5;

        let err = gather_statistics(&client, &mut pools).await.unwrap_err();
        assert!(matches!(err, PoolError::NetBox(_)));

        // The pass reset the counter before failing; no rollback happens,
        // so the partial value must be treated as unreliable.
        assert_eq!(pools[0].in_use(), 0);
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let client = MockNetBoxClient::new("http://netbox");

        let mut pools = vec![pool_from_cidr(1, "10.0.0.0/24", "")];
        gather_statistics(&client, &mut pools).await.unwrap();

        assert_eq!(pools[0].in_use(), 0);
        assert_eq!(client.address_pages(), 1);
    }
}
