//! Kubernetes object references used by the IPAM CRDs.
//!
//! Mirrors the core/v1 `SecretReference` shape with a schemars-friendly
//! local type, since the k8s-openapi structs do not derive `JsonSchema`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to a Secret in the cluster.
///
/// When `namespace` is omitted, the namespace of the referencing resource
/// is used.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    /// Name of the referenced Secret.
    pub name: String,

    /// Namespace of the referenced Secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl SecretReference {
    /// Create a reference to a Secret in the same namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Create a reference to a Secret in a specific namespace.
    pub fn with_namespace(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }
}
