//! Single-flight pool resolution cache.
//!
//! All pool lookups funnel through one loop task that owns the cache and
//! is the only place remote fetches happen. Callers first probe the cache
//! directly (safe, since entries are never replaced once written), then
//! queue a request and wait for the loop's reply. Because the loop handles
//! one request at a time and re-checks the cache before fetching, two
//! concurrent requests for the same key can never both reach NetBox.
//!
//! The loop also serializes fetches for *different* keys. That is a
//! deliberate simplicity trade-off at the expected scale (a handful of
//! pools, infrequent reconciliation); if it ever becomes a bottleneck the
//! loop can be sharded by key hash without changing the per-key guarantee.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::PoolError;
use crate::pool::{NetboxPool, PoolKey, PoolKind};
use crate::range::AddressRange;
use netbox_client::NetBoxIpamClient;

/// Queue depth for pending resolution requests. Senders block (not fail)
/// once the loop falls this far behind.
const REQUEST_QUEUE: usize = 32;

struct FetchRequest {
    key: PoolKey,
    reply: oneshot::Sender<Result<NetboxPool, PoolError>>,
}

/// Deduplicating, caching resolver of [`PoolKey`]s to [`NetboxPool`]s.
///
/// Cache entries live for the lifetime of the resolver; there is no TTL.
/// [`PoolResolver::invalidate`] is the manual eviction hook. Dropping the
/// resolver (all clones of it) stops the loop task.
#[derive(Debug, Clone)]
pub struct PoolResolver {
    cache: Arc<RwLock<HashMap<String, NetboxPool>>>,
    requests: mpsc::Sender<FetchRequest>,
}

impl PoolResolver {
    /// Create a resolver backed by `client` and start its loop task.
    pub fn new(client: Arc<dyn NetBoxIpamClient>) -> Self {
        let cache = Arc::new(RwLock::new(HashMap::new()));
        let (requests, rx) = mpsc::channel(REQUEST_QUEUE);

        tokio::spawn(run_loop(client, Arc::clone(&cache), rx));

        Self { cache, requests }
    }

    /// Resolve `key` to its pool, fetching from NetBox at most once per
    /// distinct key.
    ///
    /// Returns a snapshot; the caller owns it and may run a statistics
    /// pass over it without affecting other callers. Lookup failures
    /// (no match, ambiguous match, transport errors) are not cached, so
    /// the next call retries the fetch.
    ///
    /// Dropping the returned future abandons only this caller's wait: a
    /// fetch the loop already started completes and still populates the
    /// cache for queued waiters. Bound the wait with
    /// `tokio::time::timeout` to get a deadline.
    pub async fn fetch_pool_info(&self, key: &PoolKey) -> Result<NetboxPool, PoolError> {
        // Fast path. Entries are never replaced, so a hit needs no
        // round-trip through the loop.
        if let Some(pool) = self.cache.read().await.get(&key.cache_key()) {
            return Ok(pool.clone());
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(FetchRequest {
                key: key.clone(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| PoolError::ResolverClosed)?;

        reply_rx.await.map_err(|_| PoolError::ResolverClosed)?
    }

    /// Drop the cache entry for `key`, forcing the next lookup to fetch
    /// again. Returns whether an entry existed.
    pub async fn invalidate(&self, key: &PoolKey) -> bool {
        self.cache.write().await.remove(&key.cache_key()).is_some()
    }
}

async fn run_loop(
    client: Arc<dyn NetBoxIpamClient>,
    cache: Arc<RwLock<HashMap<String, NetboxPool>>>,
    mut requests: mpsc::Receiver<FetchRequest>,
) {
    while let Some(request) = requests.recv().await {
        // Caller gave up while queued; don't fetch on its behalf.
        if request.reply.is_closed() {
            continue;
        }

        let cache_key = request.key.cache_key();

        // Re-check under the loop: an earlier request for the same key may
        // have populated the entry while this one sat in the queue.
        let cached = cache.read().await.get(&cache_key).cloned();
        let result = match cached {
            Some(pool) => Ok(pool),
            None => match fetch_pool(client.as_ref(), &request.key).await {
                Ok(pool) => {
                    debug!("resolved pool {}: {}", request.key, pool);
                    cache.write().await.insert(cache_key, pool.clone());
                    Ok(pool)
                }
                Err(e) => {
                    warn!("failed to resolve pool {}: {}", request.key, e);
                    Err(e)
                }
            },
        };

        // The caller may have been cancelled while we fetched; the cache
        // keeps a successful result for the next request either way.
        let _ = request.reply.send(result);
    }

    debug!("pool resolver loop stopped");
}

async fn fetch_pool(
    client: &dyn NetBoxIpamClient,
    key: &PoolKey,
) -> Result<NetboxPool, PoolError> {
    match key.kind {
        PoolKind::Prefix => fetch_prefix_pool(client, &key.cidr, &key.vrf).await,
        PoolKind::IpRange => fetch_ip_range_pool(client, &key.cidr, &key.vrf).await,
    }
}

async fn fetch_prefix_pool(
    client: &dyn NetBoxIpamClient,
    prefix: &str,
    requested_vrf: &str,
) -> Result<NetboxPool, PoolError> {
    let results = client.query_prefixes(prefix).await?;

    // An empty requested VRF matches any VRF.
    let mut matches: Vec<_> = results
        .into_iter()
        .filter(|p| requested_vrf.is_empty() || p.vrf_name() == requested_vrf)
        .collect();

    if matches.is_empty() {
        return Err(PoolError::NoMatch {
            kind: "prefix",
            filter: prefix.to_string(),
        });
    }
    if matches.len() != 1 {
        return Err(PoolError::MultipleMatches {
            kind: "prefix",
            filter: prefix.to_string(),
        });
    }

    let result = matches.remove(0);
    let range = AddressRange::from_cidr(&result.prefix)?;
    let vrf = result.vrf_name().to_string();

    Ok(NetboxPool {
        id: result.id,
        display: result.display,
        kind: PoolKind::Prefix,
        vrf,
        range,
        in_use: 0,
    })
}

async fn fetch_ip_range_pool(
    client: &dyn NetBoxIpamClient,
    start_address: &str,
    requested_vrf: &str,
) -> Result<NetboxPool, PoolError> {
    let results = client.query_ip_ranges(start_address).await?;

    let mut matches: Vec<_> = results
        .into_iter()
        .filter(|r| requested_vrf.is_empty() || r.vrf_name() == requested_vrf)
        .collect();

    if matches.is_empty() {
        return Err(PoolError::NoMatch {
            kind: "ip-range",
            filter: start_address.to_string(),
        });
    }
    if matches.len() != 1 {
        return Err(PoolError::MultipleMatches {
            kind: "ip-range",
            filter: start_address.to_string(),
        });
    }

    let result = matches.remove(0);
    let range = AddressRange::from_bounds(&result.start_address, &result.end_address)?;
    let vrf = result.vrf_name().to_string();

    Ok(NetboxPool {
        id: result.id,
        display: result.display,
        kind: PoolKind::IpRange,
        vrf,
        range,
        in_use: 0,
    })
}
