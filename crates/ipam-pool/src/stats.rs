//! Usage statistics over the NetBox ip-address table.

use crate::error::PoolError;
use crate::pool::NetboxPool;
use crate::range::parse_address;
use netbox_client::NetBoxIpamClient;
use tracing::warn;

/// Page size for the ip-address listing.
const LIMIT: u32 = 100;

/// Count how many allocated addresses fall inside each of `pools`.
///
/// Walks the full paginated ip-address listing, attributing every record
/// to each pool whose VRF matches and whose range contains the address.
/// Overlapping pools each count the address; keeping pools disjoint is the
/// caller's responsibility.
///
/// Records whose address does not parse are logged and skipped. A
/// transport or API failure aborts the pass; counters touched by the
/// partial pass are left as-is and must not be acted on.
pub async fn gather_statistics(
    client: &dyn NetBoxIpamClient,
    pools: &mut [NetboxPool],
) -> Result<(), PoolError> {
    for pool in pools.iter_mut() {
        pool.in_use = 0;
    }

    let mut offset = 0u32;
    loop {
        let page = client.list_ip_addresses(LIMIT, offset).await?;
        // An empty page signals the end of the table, full last page or not.
        if page.results.is_empty() {
            break;
        }

        for record in &page.results {
            let address = match parse_address(&record.address) {
                Ok(address) => address,
                Err(e) => {
                    warn!("could not parse ip-address '{}': {}", record.address, e);
                    continue;
                }
            };

            let vrf = record.vrf_name();
            for pool in pools.iter_mut() {
                if vrf == pool.vrf && pool.contains(address) {
                    pool.in_use += 1;
                }
            }
        }

        offset += LIMIT;
    }

    Ok(())
}
