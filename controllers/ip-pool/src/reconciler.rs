//! Reconciliation logic for IPPool CRDs.
//!
//! This module resolves each pool against NetBox through the shared
//! [`PoolResolver`], runs the usage statistics pass, and writes the
//! resulting total/used/free counts back to the pool status. It also owns
//! the finalizer bookkeeping on the pool and its credentials Secret.

use crate::error::ControllerError;
use crds::{IPPool, IPPoolStatus, IPPoolStatusAddresses, PoolType};
use ipam_pool::{NetboxPool, PoolKey, PoolKind, PoolResolver, gather_statistics, parse_address};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use netbox_client::{NetBoxClient, NetBoxError, NetBoxIpamClient};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Finalizer placed on reconciled pools.
pub const POOL_FINALIZER: &str = "ipam.microscaler.io/ippool";
/// Finalizer placed on credentials Secrets while a pool uses them.
pub const SECRET_FINALIZER: &str = "ipam.microscaler.io/secret";

const URL_KEY: &str = "url";
const API_TOKEN_KEY: &str = "apiToken";

const API_VERSION: &str = "ipam.microscaler.io/v1alpha1";
const KIND: &str = "IPPool";

/// Builds a NetBox client for a url/token pair. Injectable so tests can
/// substitute the mock client.
pub type NetboxFactory =
    Box<dyn Fn(&str, &str) -> Result<Arc<dyn NetBoxIpamClient>, NetBoxError> + Send + Sync>;

/// The default factory, producing real HTTP clients.
pub fn default_netbox_factory() -> NetboxFactory {
    Box::new(|url, token| {
        let client = NetBoxClient::new(url.to_string(), token.to_string())?;
        Ok(Arc::new(client) as Arc<dyn NetBoxIpamClient>)
    })
}

/// Resolver and client pair for one set of NetBox credentials.
#[derive(Clone)]
struct PoolContext {
    client: Arc<dyn NetBoxIpamClient>,
    resolver: PoolResolver,
}

/// Reconciles IPPool resources.
pub struct Reconciler {
    kube_client: Client,
    ip_pool_api: Api<IPPool>,
    netbox_factory: NetboxFactory,
    // One context per NetBox endpoint/credentials pair. Pool metadata is
    // cached inside each resolver for the process lifetime.
    contexts: Mutex<HashMap<String, PoolContext>>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(kube_client: Client, ip_pool_api: Api<IPPool>, netbox_factory: NetboxFactory) -> Self {
        Self {
            kube_client,
            ip_pool_api,
            netbox_factory,
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Reconciles an IPPool resource.
    ///
    /// This method:
    /// 1. Handles deletion (secret release + finalizer removal)
    /// 2. Ensures the pool finalizer is present
    /// 3. Resolves the pool from NetBox and gathers usage statistics
    /// 4. Updates the IPPool status with total/used/free counts
    pub async fn reconcile_ip_pool(&self, pool: &IPPool) -> Result<(), ControllerError> {
        let name = pool
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidConfig("IPPool missing name".to_string()))?;
        let namespace = pool.metadata.namespace.as_deref().unwrap_or("default");

        info!("Reconciling IPPool {}/{}", namespace, name);

        if pool.metadata.deletion_timestamp.is_some() {
            return self.reconcile_delete(pool, name, namespace).await;
        }

        // Add the finalizer first and let the resulting watch event drive
        // the rest, closing the race between init and delete.
        if !has_finalizer(pool.metadata.finalizers.as_deref(), POOL_FINALIZER) {
            return self.add_pool_finalizer(pool, name).await;
        }

        self.reconcile_normal(pool, name, namespace).await
    }

    async fn reconcile_normal(
        &self,
        pool: &IPPool,
        name: &str,
        namespace: &str,
    ) -> Result<(), ControllerError> {
        pool.spec
            .validate()
            .map_err(|e| ControllerError::InvalidConfig(e.to_string()))?;

        let secret = self.get_credentials_secret(pool, namespace).await?;
        self.ensure_secret_ownership(pool, &secret, namespace).await?;

        let (url, token) = netbox_credentials(&secret)?;
        let context = self.pool_context(&url, &token).await?;

        let key = PoolKey::new(
            pool_kind(pool.spec.pool_type),
            pool.spec.cidr.as_str(),
            pool.spec.vrf.as_str(),
            pool.spec.tenant.as_str(),
        );

        let mut descriptor = context.resolver.fetch_pool_info(&key).await?;
        gather_statistics(context.client.as_ref(), std::slice::from_mut(&mut descriptor)).await?;

        let addresses = compute_addresses(&descriptor, pool.spec.gateway.as_deref())?;
        let new_status = IPPoolStatus {
            ip_addresses: Some(addresses),
            netbox_id: Some(descriptor.id),
            netbox_display: Some(descriptor.display.clone()),
        };

        if !status_needs_update(pool.status.as_ref(), &new_status) {
            debug!("IPPool {}/{} status is up-to-date, skipping update", namespace, name);
            return Ok(());
        }

        let status_patch = json!({ "status": new_status });
        let pp = PatchParams::default();
        match self
            .ip_pool_api
            .patch_status(name, &pp, &Patch::Merge(&status_patch))
            .await
        {
            Ok(_) => {
                info!(
                    "Updated IPPool {}/{} status: {}",
                    namespace, name, descriptor
                );
                Ok(())
            }
            Err(e) => {
                let error_msg = format!("Failed to update IPPool status: {}", e);
                error!("{}", error_msg);
                Err(ControllerError::Kube(e))
            }
        }
    }

    async fn reconcile_delete(
        &self,
        pool: &IPPool,
        name: &str,
        namespace: &str,
    ) -> Result<(), ControllerError> {
        info!("Deleting IPPool {}/{}", namespace, name);

        // Unwind the secret bookkeeping; a secret that is already gone is
        // nothing to clean up.
        match self.get_credentials_secret(pool, namespace).await {
            Ok(secret) => self.release_secret(pool, &secret, namespace).await?,
            Err(ControllerError::SecretNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        if has_finalizer(pool.metadata.finalizers.as_deref(), POOL_FINALIZER) {
            let finalizers: Vec<&str> = pool
                .metadata
                .finalizers
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(String::as_str)
                .filter(|f| *f != POOL_FINALIZER)
                .collect();
            let patch = json!({ "metadata": { "finalizers": finalizers } });
            self.ip_pool_api
                .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?;
        }

        Ok(())
    }

    async fn add_pool_finalizer(&self, pool: &IPPool, name: &str) -> Result<(), ControllerError> {
        let mut finalizers = pool.metadata.finalizers.clone().unwrap_or_default();
        finalizers.push(POOL_FINALIZER.to_string());
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        self.ip_pool_api
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    /// Fetch the Secret named by the pool's credentialsRef, defaulting to
    /// the pool's namespace.
    async fn get_credentials_secret(
        &self,
        pool: &IPPool,
        namespace: &str,
    ) -> Result<Secret, ControllerError> {
        let cred_ref = &pool.spec.credentials_ref;
        let secret_namespace = cred_ref.namespace.as_deref().unwrap_or(namespace);
        let secret_api: Api<Secret> = Api::namespaced(self.kube_client.clone(), secret_namespace);

        match secret_api.get(&cred_ref.name).await {
            Ok(secret) => Ok(secret),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(ControllerError::SecretNotFound(
                format!("{}/{}", secret_namespace, cred_ref.name),
            )),
            Err(e) => Err(ControllerError::Kube(e)),
        }
    }

    /// Mark the Secret as in use: our finalizer plus an owner reference to
    /// the pool, so it is not deleted away underneath us.
    async fn ensure_secret_ownership(
        &self,
        pool: &IPPool,
        secret: &Secret,
        namespace: &str,
    ) -> Result<(), ControllerError> {
        let secret_name = secret
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidConfig("Secret missing name".to_string()))?;
        let secret_namespace = secret.metadata.namespace.as_deref().unwrap_or(namespace);

        let mut finalizers = secret.metadata.finalizers.clone().unwrap_or_default();
        let mut owners = secret.metadata.owner_references.clone().unwrap_or_default();
        let mut changed = false;

        if !finalizers.iter().any(|f| f == SECRET_FINALIZER) {
            finalizers.push(SECRET_FINALIZER.to_string());
            changed = true;
        }

        // Owner references cannot cross namespaces.
        if secret_namespace == namespace {
            let owner = owner_reference(pool)?;
            if !owners
                .iter()
                .any(|o| o.kind == owner.kind && o.name == owner.name && o.uid == owner.uid)
            {
                owners.push(owner);
                changed = true;
            }
        }

        if !changed {
            return Ok(());
        }

        let secret_api: Api<Secret> = Api::namespaced(self.kube_client.clone(), secret_namespace);
        let patch = json!({
            "metadata": {
                "finalizers": finalizers,
                "ownerReferences": owners,
            }
        });
        secret_api
            .patch(secret_name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        Ok(())
    }

    /// Remove the pool from the Secret's owner references; drop our
    /// finalizer once no owning pool remains.
    async fn release_secret(
        &self,
        pool: &IPPool,
        secret: &Secret,
        namespace: &str,
    ) -> Result<(), ControllerError> {
        let secret_name = secret
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidConfig("Secret missing name".to_string()))?;
        let secret_namespace = secret.metadata.namespace.as_deref().unwrap_or(namespace);

        let pool_uid = pool.metadata.uid.as_deref().unwrap_or_default();
        let mut owners = secret.metadata.owner_references.clone().unwrap_or_default();
        owners.retain(|o| !(o.kind == KIND && o.uid == pool_uid));

        let mut finalizers = secret.metadata.finalizers.clone().unwrap_or_default();
        if owners.is_empty() {
            debug!(
                "Removing finalizer {} from Secret {}/{}",
                SECRET_FINALIZER, secret_namespace, secret_name
            );
            finalizers.retain(|f| f != SECRET_FINALIZER);
        }

        let secret_api: Api<Secret> = Api::namespaced(self.kube_client.clone(), secret_namespace);
        let patch = json!({
            "metadata": {
                "finalizers": finalizers,
                "ownerReferences": owners,
            }
        });
        secret_api
            .patch(secret_name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        Ok(())
    }

    /// Get or create the client/resolver pair for a credentials pair.
    async fn pool_context(&self, url: &str, token: &str) -> Result<PoolContext, ControllerError> {
        let context_key = format!("{}\n{}", url, token);
        let mut contexts = self.contexts.lock().await;

        if let Some(context) = contexts.get(&context_key) {
            return Ok(context.clone());
        }

        let client = (self.netbox_factory)(url, token)?;

        // Probe connectivity and token validity once; a failing context is
        // not cached, so the next reconcile retries with fresh credentials.
        client.validate_token().await?;

        let context = PoolContext {
            resolver: PoolResolver::new(Arc::clone(&client)),
            client,
        };
        contexts.insert(context_key, context.clone());
        Ok(context)
    }
}

/// Map the CRD pool type onto the resolver's pool kind.
pub(crate) fn pool_kind(pool_type: PoolType) -> PoolKind {
    match pool_type {
        PoolType::Prefix => PoolKind::Prefix,
        PoolType::IPRange => PoolKind::IpRange,
    }
}

/// Extract the NetBox `url` and `apiToken` from the credentials Secret.
/// Missing or empty values are rejected here rather than surfacing later
/// as opaque HTTP failures.
pub(crate) fn netbox_credentials(secret: &Secret) -> Result<(String, String), ControllerError> {
    let url = secret_data(secret, URL_KEY);
    if url.is_empty() {
        return Err(ControllerError::MissingCredentials(URL_KEY));
    }
    let token = secret_data(secret, API_TOKEN_KEY);
    if token.is_empty() {
        return Err(ControllerError::MissingCredentials(API_TOKEN_KEY));
    }
    Ok((url, token))
}

fn secret_data(secret: &Secret, key: &str) -> String {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|value| String::from_utf8_lossy(&value.0).into_owned())
        .unwrap_or_default()
}

/// Derive the status counts from a resolved descriptor. A gateway address
/// inside the range stays in the total but never counts as usable, so the
/// free count shrinks by one.
pub(crate) fn compute_addresses(
    descriptor: &NetboxPool,
    gateway: Option<&str>,
) -> Result<IPPoolStatusAddresses, ControllerError> {
    let mut total = descriptor.total();

    if let Some(gateway) = gateway {
        let gateway_addr = parse_address(gateway).map_err(|e| {
            ControllerError::InvalidConfig(format!("failed to parse pool gateway: {}", e))
        })?;
        if descriptor.contains(gateway_addr) {
            total -= 1;
        }
    }

    let used = descriptor.in_use();
    Ok(IPPoolStatusAddresses {
        total,
        used,
        free: total.saturating_sub(used),
    })
}

/// Whether the observed status differs from what we would write.
pub(crate) fn status_needs_update(current: Option<&IPPoolStatus>, new: &IPPoolStatus) -> bool {
    match current {
        Some(status) => {
            status.ip_addresses != new.ip_addresses
                || status.netbox_id != new.netbox_id
                || status.netbox_display != new.netbox_display
        }
        None => true,
    }
}

fn has_finalizer(finalizers: Option<&[String]>, finalizer: &str) -> bool {
    finalizers
        .unwrap_or_default()
        .iter()
        .any(|f| f == finalizer)
}

fn owner_reference(pool: &IPPool) -> Result<OwnerReference, ControllerError> {
    let name = pool
        .metadata
        .name
        .clone()
        .ok_or_else(|| ControllerError::InvalidConfig("IPPool missing name".to_string()))?;
    let uid = pool
        .metadata
        .uid
        .clone()
        .ok_or_else(|| ControllerError::InvalidConfig("IPPool missing uid".to_string()))?;

    Ok(OwnerReference {
        api_version: API_VERSION.to_string(),
        kind: KIND.to_string(),
        name,
        uid,
        block_owner_deletion: None,
        controller: None,
    })
}
