//! Unit tests for the pool resolver

#[cfg(test)]
mod tests {
    use crate::error::PoolError;
    use crate::pool::{PoolKey, PoolKind};
    use crate::range::AddressError;
    use crate::resolver::PoolResolver;
    use netbox_client::{IpRange, MockNetBoxClient, NestedVrf, Prefix};
    use std::sync::Arc;
    use std::time::Duration;

    fn prefix(id: u64, notation: &str, vrf: Option<&str>) -> Prefix {
        Prefix {
            id,
            display: notation.to_string(),
            prefix: notation.to_string(),
            vrf: vrf.map(|name| NestedVrf {
                name: name.to_string(),
            }),
        }
    }

    fn ip_range(id: u64, start: &str, end: &str, vrf: Option<&str>) -> IpRange {
        IpRange {
            id,
            display: format!("{}-{}", start, end),
            start_address: start.to_string(),
            end_address: end.to_string(),
            vrf: vrf.map(|name| NestedVrf {
                name: name.to_string(),
            }),
        }
    }

    fn prefix_key(cidr: &str, vrf: &str) -> PoolKey {
        PoolKey::new(PoolKind::Prefix, cidr, vrf, "")
    }

    #[tokio::test]
    async fn test_concurrent_same_key_fetches_once() {
        let client = Arc::new(MockNetBoxClient::new("http://netbox"));
        client.add_prefix(prefix(1, "10.0.0.0/24", None));

        let resolver = PoolResolver::new(client.clone());
        let key = prefix_key("10.0.0.0/24", "");

        let mut handles = Vec::new();
        for _ in 0..50 {
            let resolver = resolver.clone();
            let key = key.clone();
            handles.push(tokio::spawn(
                async move { resolver.fetch_pool_info(&key).await },
            ));
        }

        for handle in handles {
            let pool = handle.await.unwrap().unwrap();
            assert_eq!(pool.id, 1);
            assert_eq!(pool.total(), 256);
        }

        assert_eq!(client.prefix_queries(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_distinct_keys_resolve_independently() {
        let client = Arc::new(MockNetBoxClient::new("http://netbox"));
        client.add_prefix(prefix(1, "10.0.0.0/24", None));
        client.add_prefix(prefix(2, "10.1.0.0/24", None));

        let resolver = PoolResolver::new(client.clone());

        let first = {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                resolver
                    .fetch_pool_info(&prefix_key("10.0.0.0/24", ""))
                    .await
            })
        };
        let second = {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                resolver
                    .fetch_pool_info(&prefix_key("10.1.0.0/24", ""))
                    .await
            })
        };

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(client.prefix_queries(), 2);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_fetch() {
        let client = Arc::new(MockNetBoxClient::new("http://netbox"));
        client.add_prefix(prefix(1, "10.0.0.0/24", None));

        let resolver = PoolResolver::new(client.clone());
        let key = prefix_key("10.0.0.0/24", "");

        resolver.fetch_pool_info(&key).await.unwrap();
        resolver.fetch_pool_info(&key).await.unwrap();

        assert_eq!(client.prefix_queries(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let client = Arc::new(MockNetBoxClient::new("http://netbox"));
        client.add_prefix(prefix(1, "10.0.0.0/24", None));

        let resolver = PoolResolver::new(client.clone());
        let key = prefix_key("10.0.0.0/24", "");

        resolver.fetch_pool_info(&key).await.unwrap();
        assert!(resolver.invalidate(&key).await);
        assert!(!resolver.invalidate(&key).await);

        resolver.fetch_pool_info(&key).await.unwrap();
        assert_eq!(client.prefix_queries(), 2);
    }

    #[tokio::test]
    async fn test_ambiguous_match_not_cached() {
        let client = Arc::new(MockNetBoxClient::new("http://netbox"));
        client.add_prefix(prefix(1, "10.0.0.0/24", Some("blue")));
        client.add_prefix(prefix(2, "10.0.0.0/24", Some("green")));

        let resolver = PoolResolver::new(client.clone());
        // Empty VRF matches any, so both records survive the filter.
        let key = prefix_key("10.0.0.0/24", "");

        let err = resolver.fetch_pool_info(&key).await.unwrap_err();
        assert!(matches!(err, PoolError::MultipleMatches { .. }));
        assert_eq!(client.prefix_queries(), 1);

        // Failure was not cached; the next call fetches again.
        let err = resolver.fetch_pool_info(&key).await.unwrap_err();
        assert!(matches!(err, PoolError::MultipleMatches { .. }));
        assert_eq!(client.prefix_queries(), 2);
    }

    #[tokio::test]
    async fn test_vrf_filter_disambiguates() {
        let client = Arc::new(MockNetBoxClient::new("http://netbox"));
        client.add_prefix(prefix(1, "10.0.0.0/24", Some("blue")));
        client.add_prefix(prefix(2, "10.0.0.0/24", Some("green")));

        let resolver = PoolResolver::new(client.clone());

        let pool = resolver
            .fetch_pool_info(&prefix_key("10.0.0.0/24", "blue"))
            .await
            .unwrap();
        assert_eq!(pool.id, 1);
        assert_eq!(pool.vrf, "blue");

        let err = resolver
            .fetch_pool_info(&prefix_key("10.0.0.0/24", "red"))
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::NoMatch { .. }));
    }

    #[tokio::test]
    async fn test_no_match_for_unknown_prefix() {
        let client = Arc::new(MockNetBoxClient::new("http://netbox"));
        let resolver = PoolResolver::new(client);

        let err = resolver
            .fetch_pool_info(&prefix_key("192.168.0.0/24", ""))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PoolError::NoMatch { kind: "prefix", .. }
        ));
    }

    #[tokio::test]
    async fn test_ip_range_pool_resolution() {
        let client = Arc::new(MockNetBoxClient::new("http://netbox"));
        client.add_ip_range(ip_range(7, "10.0.1.10/24", "10.0.1.20/24", None));

        let resolver = PoolResolver::new(client.clone());
        let key = PoolKey::new(PoolKind::IpRange, "10.0.1.10/24", "", "");

        let pool = resolver.fetch_pool_info(&key).await.unwrap();
        assert_eq!(pool.id, 7);
        assert_eq!(pool.kind, PoolKind::IpRange);
        assert_eq!(pool.total(), 11);
        assert_eq!(client.range_queries(), 1);
        assert_eq!(client.prefix_queries(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_remote_prefix_not_cached() {
        let client = Arc::new(MockNetBoxClient::new("http://netbox"));
        client.add_prefix(prefix(9, "garbage", None));

        let resolver = PoolResolver::new(client.clone());
        let key = prefix_key("garbage", "");

        let err = resolver.fetch_pool_info(&key).await.unwrap_err();
        assert!(matches!(err, PoolError::Address(AddressError::Parse(_))));

        resolver.fetch_pool_info(&key).await.unwrap_err();
        assert_eq!(client.prefix_queries(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_unblocks_caller_promptly() {
        let client = Arc::new(MockNetBoxClient::new("http://netbox"));
        client.add_prefix(prefix(1, "10.0.0.0/24", None));
        client.set_stalled(true);

        let resolver = PoolResolver::new(client);
        let key = prefix_key("10.0.0.0/24", "");

        let result = tokio::time::timeout(
            Duration::from_millis(100),
            resolver.fetch_pool_info(&key),
        )
        .await;

        assert!(result.is_err(), "expected the wait to be abandoned");
    }
}
