//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize subsystems in dependency order
//! - Resolve the live routing state before the first probe
//! - Route reloads and signals until shutdown

use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::admin::{serve_admin, AdminState};
use crate::config::{load_config, ConfigWatcher, GuardConfig};
use crate::dns::{CloudflareSwitch, DnsSwitch};
use crate::lifecycle::{wait_for_signal, Shutdown, SignalEvent};
use crate::monitor::{resolve_initial_state, Monitor, MonitorHandle, MonitorSettings};
use crate::notifier::{LogNotifier, NotificationQueue, Notifier, WebhookNotifier};
use crate::observability::{logging, metrics};
use crate::probe::build_probe;

/// Run the guard until SIGINT/SIGTERM or until the monitor fails.
pub async fn run(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&config_path)?;
    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?config_path,
        "connectivity-guard starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let probe = build_probe(&config.probe);
    let dns: Arc<dyn DnsSwitch> = Arc::new(CloudflareSwitch::new(&config.dns, &config.servers)?);
    let notifier: Arc<dyn Notifier> = match &config.notifications.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(
            url.clone(),
            Duration::from_secs(config.notifications.timeout_secs),
        )?),
        None => {
            tracing::info!("No webhook configured, notifications go to the log only");
            Arc::new(LogNotifier)
        }
    };
    let (notifications, notification_worker) =
        NotificationQueue::spawn(notifier, Duration::from_secs(config.notifications.timeout_secs));

    let settings = MonitorSettings::from_config(&config);
    let initial = resolve_initial_state(dns.as_ref(), settings.adapter_timeout).await;
    tracing::info!(
        routing_state = %initial,
        max_retries = settings.retry_policy.max_retries,
        check_interval_secs = settings.check_interval.as_secs(),
        auto_failback = settings.failover.auto_failback,
        "Initial routing state resolved"
    );

    let shutdown = Shutdown::new();
    let (monitor, handle) = Monitor::new(initial, settings, config.servers.clone(), probe, dns, notifications);
    let mut monitor_task = tokio::spawn(monitor.run(shutdown.subscribe()));

    let shared = Arc::new(ArcSwap::from_pointee(config.clone()));

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState {
            monitor: handle.clone(),
            config: shared.clone(),
        };
        Some(tokio::spawn(serve_admin(listener, state, shutdown.subscribe())))
    } else {
        None
    };

    let (watcher, mut updates) = ConfigWatcher::new(&config_path);
    let _watcher = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, reload with SIGHUP");
            None
        }
    };

    let finished_early = loop {
        tokio::select! {
            res = &mut monitor_task => break Some(res),
            signal = wait_for_signal() => match signal? {
                SignalEvent::Shutdown => break None,
                SignalEvent::Reload => match load_config(&config_path) {
                    Ok(new_config) => apply_reload(new_config, &shared, &handle).await,
                    Err(e) => tracing::error!(error = %e, "Config reload rejected, keeping current configuration"),
                },
            },
            Some(new_config) = updates.recv() => apply_reload(new_config, &shared, &handle).await,
        }
    };

    shutdown.trigger();
    let monitor_result = match finished_early {
        Some(res) => res,
        None => monitor_task.await,
    };

    if let Some(task) = admin_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API failed"),
            Err(e) => tracing::error!(error = %e, "Admin API task panicked"),
        }
    }

    drop(handle);
    notification_worker
        .drain(Duration::from_secs(config.notifications.drain_timeout_secs))
        .await;

    match monitor_result {
        Ok(Ok(())) => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Monitor stopped with an error");
            Err(e.into())
        }
        Err(e) => {
            tracing::error!(error = %e, "Monitor task panicked");
            Err(e.into())
        }
    }
}

/// Publish a reloaded configuration and push its tunables to the monitor.
async fn apply_reload(new_config: GuardConfig, shared: &ArcSwap<GuardConfig>, monitor: &MonitorHandle) {
    let restart_needed = {
        let current = shared.load();
        current.servers.primary_address != new_config.servers.primary_address
            || current.servers.backup_address != new_config.servers.backup_address
            || current.dns.zone_id != new_config.dns.zone_id
            || current.dns.record_id != new_config.dns.record_id
            || current.probe.kind != new_config.probe.kind
            || current.probe.primary_endpoint != new_config.probe.primary_endpoint
            || current.probe.backup_endpoint != new_config.probe.backup_endpoint
    };
    if restart_needed {
        tracing::warn!("Server, DNS and probe changes take effect after a restart");
    }

    let settings = MonitorSettings::from_config(&new_config);
    shared.store(Arc::new(new_config));

    if let Err(e) = monitor.reload(settings).await {
        tracing::error!(error = %e, "Could not hand new settings to the monitor");
    } else {
        tracing::info!("Configuration reloaded");
    }
}
