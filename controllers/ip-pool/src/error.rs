//! Controller-specific error types.
//!
//! This module defines error types specific to the IPPool controller that
//! are not covered by upstream library errors.

use ipam_pool::PoolError;
use kube::Error as KubeError;
use netbox_client::NetBoxError;
use thiserror::Error;

/// Errors that can occur in the IPPool Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// NetBox API error
    #[error("NetBox error: {0}")]
    NetBox(#[from] NetBoxError),

    /// Pool resolution or statistics error
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Credentials Secret not found
    #[error("credentials Secret not found: {0}")]
    SecretNotFound(String),

    /// Credentials Secret exists but lacks a required key
    #[error("credentials Secret is missing required key '{0}'")]
    MissingCredentials(&'static str),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
