//! Kubernetes resource watcher.
//!
//! This module handles watching IPPool resources for changes and
//! triggering reconciliation. A failed watch stream is restarted with
//! Fibonacci backoff rather than taking the controller down.

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::IPPool;
use futures::TryStreamExt;
use kube::Api;
use kube_runtime::watcher;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Watches IPPool resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    ip_pool_api: Api<IPPool>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, ip_pool_api: Api<IPPool>) -> Self {
        Self {
            reconciler,
            ip_pool_api,
        }
    }

    /// Starts watching IPPool resources, restarting the stream with
    /// backoff when it fails.
    pub async fn watch_ip_pools(&self) -> Result<(), ControllerError> {
        info!("Starting IPPool watcher");

        let mut backoff = FibonacciBackoff::new(1, 10);
        loop {
            match self.watch_stream(&mut backoff).await {
                Ok(()) => {
                    // Stream ended without error; restart immediately.
                    warn!("IPPool watch stream ended, restarting");
                }
                Err(e) => {
                    let delay = backoff.next_backoff();
                    error!(
                        "IPPool watch stream failed: {}, restarting in {}s",
                        e,
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn watch_stream(&self, backoff: &mut FibonacciBackoff) -> Result<(), ControllerError> {
        let mut stream = Box::pin(watcher(self.ip_pool_api.clone(), watcher::Config::default()));

        while let Some(event) = stream
            .try_next()
            .await
            .map_err(|e| ControllerError::Watch(format!("Watcher stream error: {}", e)))?
        {
            // A delivered event means the stream is healthy again.
            backoff.reset();

            match event {
                watcher::Event::Apply(pool) => {
                    let name = pool.metadata.name.as_deref().unwrap_or("<unknown>");
                    info!("IPPool applied: {}", name);

                    if let Err(e) = self.reconciler.reconcile_ip_pool(&pool).await {
                        error!("Failed to reconcile IPPool {}: {}", name, e);
                    }
                }
                watcher::Event::Delete(pool) => {
                    let name = pool.metadata.name.as_deref().unwrap_or("<unknown>");
                    info!("IPPool deleted: {}", name);
                }
                watcher::Event::Init => {
                    debug!("IPPool watcher initialized");
                }
                watcher::Event::InitApply(pool) => {
                    let name = pool.metadata.name.as_deref().unwrap_or("<unknown>");
                    debug!("IPPool init apply: {}", name);

                    if let Err(e) = self.reconciler.reconcile_ip_pool(&pool).await {
                        warn!("Failed to reconcile IPPool {}: {}", name, e);
                    }
                }
                watcher::Event::InitDone => {
                    info!("IPPool watcher initialization complete");
                }
            }
        }

        Ok(())
    }
}
