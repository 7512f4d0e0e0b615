//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the reconciler
//! and the resource watcher together for the IPPool Controller.

use crate::error::ControllerError;
use crate::reconciler::{Reconciler, default_netbox_factory};
use crate::watcher::Watcher;
use crds::IPPool;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for IPPool management.
pub struct Controller {
    ip_pool_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(namespace: Option<String>) -> Result<Self, ControllerError> {
        info!("Initializing IPPool Controller");

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;

        // Create API client
        let ns = namespace.as_deref().unwrap_or("default");
        let ip_pool_api: Api<IPPool> = Api::namespaced(kube_client.clone(), ns);

        // Create reconciler; NetBox clients are built lazily per
        // credentials Secret.
        let reconciler = Reconciler::new(
            kube_client,
            ip_pool_api.clone(),
            default_netbox_factory(),
        );

        let watcher_instance = Watcher::new(Arc::new(reconciler), ip_pool_api);

        // Start watcher in a background task
        let ip_pool_watcher = tokio::spawn(async move { watcher_instance.watch_ip_pools().await });

        Ok(Self { ip_pool_watcher })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("IPPool Controller running");

        // The watcher should run forever; its exit is an error.
        self.ip_pool_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("IPPool watcher panicked: {}", e)))?
            .map_err(|e| ControllerError::Watch(format!("IPPool watcher error: {}", e)))?;

        Ok(())
    }
}
