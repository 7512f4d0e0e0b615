//! Pool resolution errors

use crate::range::AddressError;
use netbox_client::NetBoxError;
use thiserror::Error;

/// Errors produced while resolving pools or gathering usage statistics
#[derive(Debug, Error)]
pub enum PoolError {
    /// Address or range could not be parsed/constructed
    #[error(transparent)]
    Address(#[from] AddressError),

    /// The NetBox filter matched no record
    #[error("no {kind} matches '{filter}'")]
    NoMatch {
        /// Object kind queried ("prefix" or "ip-range")
        kind: &'static str,
        /// The filter value that matched nothing
        filter: String,
    },

    /// The NetBox filter matched more than one record
    #[error("multiple {kind}s match '{filter}', there must be only one match")]
    MultipleMatches {
        /// Object kind queried ("prefix" or "ip-range")
        kind: &'static str,
        /// The ambiguous filter value
        filter: String,
    },

    /// Transport or API failure talking to NetBox
    #[error("NetBox error: {0}")]
    NetBox(#[from] NetBoxError),

    /// The resolver loop is no longer running
    #[error("pool resolver is shut down")]
    ResolverClosed,
}
