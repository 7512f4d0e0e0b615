//! IPPool CRD
//!
//! Defines an IP address pool backed by a NetBox prefix or ip-range.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::references::SecretReference;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ipam.microscaler.io",
    version = "v1alpha1",
    kind = "IPPool",
    namespaced,
    status = "IPPoolStatus",
    printcolumn = r#"{"name":"Total","type":"integer","jsonPath":".status.ipAddresses.total"}"#,
    printcolumn = r#"{"name":"Used","type":"integer","jsonPath":".status.ipAddresses.used"}"#,
    printcolumn = r#"{"name":"Free","type":"integer","jsonPath":".status.ipAddresses.free"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IPPoolSpec {
    /// Type of the pool. Either a NetBox prefix or a NetBox ip-range.
    #[serde(rename = "type")]
    pub pool_type: PoolType,

    /// Depending on the type, the prefix itself or the start address of the
    /// ip-range, in CIDR notation.
    pub cidr: String,

    /// VRF the pool belongs to. Empty means the global VRF.
    #[serde(default)]
    pub vrf: String,

    /// NetBox tenant owning the pool (optional).
    #[serde(default)]
    pub tenant: String,

    /// Gateway address inside the pool. Excluded from the usable count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    /// Reference to a Secret holding the NetBox `url` and `apiToken` keys.
    /// If no namespace is given, the pool's namespace is used.
    pub credentials_ref: SecretReference,
}

/// Pool flavor, deciding which NetBox lookup resolves the pool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum PoolType {
    /// Pool covers a whole NetBox prefix.
    Prefix,

    /// Pool covers an explicit NetBox ip-range.
    IPRange,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct IPPoolStatus {
    /// Counts of total, used and free addresses in the pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_addresses: Option<IPPoolStatusAddresses>,

    /// NetBox object id the pool resolved to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netbox_id: Option<u64>,

    /// NetBox display name the pool resolved to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netbox_display: Option<String>,
}

/// Address counts reported on the pool status.
///
/// Counts larger than u64 can hold (very large IPv6 pools) saturate at
/// `u64::MAX` rather than wrapping.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IPPoolStatusAddresses {
    /// Total number of addresses configured for the pool.
    pub total: u64,

    /// Count of allocated addresses in the pool.
    pub used: u64,

    /// Count of unallocated addresses in the pool.
    pub free: u64,
}

/// Spec validation failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The cidr field is empty or not parseable for the declared type.
    #[error("invalid cidr '{0}': {1}")]
    InvalidCidr(String, String),

    /// The gateway field is not a parseable address.
    #[error("invalid gateway '{0}'")]
    InvalidGateway(String),

    /// The credentials reference has no name.
    #[error("credentialsRef must name a Secret")]
    MissingCredentialsRef,
}

impl IPPoolSpec {
    /// Validate the spec fields that the admission layer would otherwise
    /// reject. Called by the reconciler before touching NetBox.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cidr.is_empty() {
            return Err(ValidationError::InvalidCidr(
                self.cidr.clone(),
                "cidr must not be empty".to_string(),
            ));
        }

        match self.pool_type {
            PoolType::Prefix => {
                self.cidr.parse::<ipnet::IpNet>().map_err(|e| {
                    ValidationError::InvalidCidr(self.cidr.clone(), e.to_string())
                })?;
            }
            PoolType::IPRange => {
                // Range pools carry the start address, with or without a
                // mask suffix.
                let addr = self.cidr.split('/').next().unwrap_or_default();
                addr.parse::<std::net::IpAddr>().map_err(|e| {
                    ValidationError::InvalidCidr(self.cidr.clone(), e.to_string())
                })?;
            }
        }

        if let Some(gateway) = &self.gateway {
            let addr = gateway.split('/').next().unwrap_or_default();
            addr.parse::<std::net::IpAddr>()
                .map_err(|_| ValidationError::InvalidGateway(gateway.clone()))?;
        }

        if self.credentials_ref.name.is_empty() {
            return Err(ValidationError::MissingCredentialsRef);
        }

        Ok(())
    }
}
