//! IPPool Controller
//!
//! Reconciles `IPPool` CRDs against NetBox: resolves the backing prefix or
//! ip-range, counts allocated addresses, and reports total/used/free on
//! the pool status.
//!
//! NetBox credentials are not global configuration; each pool names a
//! Secret (`url` + `apiToken` keys) through `spec.credentialsRef`.

mod backoff;
mod controller;
mod error;
mod reconciler;
mod watcher;

use crate::error::ControllerError;
use controller::Controller;
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting IPPool Controller");

    // Load configuration from environment variables
    let namespace = env::var("WATCH_NAMESPACE").ok();

    info!("Configuration:");
    info!(
        "  Namespace: {}",
        namespace.as_deref().unwrap_or("default")
    );

    // Initialize and run controller
    let controller = Controller::new(namespace).await?;
    controller.run().await?;

    Ok(())
}
