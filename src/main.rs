// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pod_labeler::config::Config;
use pod_labeler::constants::defaults::SHUTDOWN_GRACE_SECS;
use pod_labeler::controller::LabelController;
use pod_labeler::identity::ControllerIdentity;
use pod_labeler::informer::PodInformer;
use pod_labeler::reconcilers::PodReconciler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting pod label controller");

    // Load configuration
    let config = Config::from_env()?;
    let identity = ControllerIdentity::from_env()?;
    info!(
        "Configuration loaded: db={}, watch_namespace={}, threads={}, max_requeues={}, identity={}",
        config.db_name,
        config.watch_namespace.as_deref().unwrap_or("<all>"),
        config.num_threads,
        config.max_num_requeues,
        identity.key()
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let informer = PodInformer::new(client, config.watch_namespace.clone());
    let store = informer.store();
    let heartbeat_key = identity.key();
    // The handler shares the selector the watch is scoped with
    let controller = LabelController::new(config, identity, informer, |selector| {
        PodReconciler::new(store, selector.clone(), heartbeat_key)
    });

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    // Cache sync failure aborts here with a non-zero exit
    let running = controller.run(shutdown).await?;

    if !running.wait(Duration::from_secs(SHUTDOWN_GRACE_SECS)).await {
        warn!("Workers did not stop within {}s", SHUTDOWN_GRACE_SECS);
    }
    info!("Pod label controller stopped");
    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM
async fn wait_for_signal(shutdown: CancellationToken) {
    let sigterm = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = sigterm => info!("Received SIGTERM"),
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!("Failed to listen for ctrl-c: {}", e);
                return;
            }
            info!("Received SIGINT");
        }
    }
    shutdown.cancel();
}
