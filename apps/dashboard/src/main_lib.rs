use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use todo_dashboard_client::DashboardClient;
use todo_dashboard_core::{DataFetcher, NotificationSource, SyncStatus, Synchronizer};
use todo_dashboard_live::{LiveConfig, ReconnectPolicy};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::render::render;

pub fn init_tracing() {
    let fmt_layer = fmt::layer()
        .json()
        .with_current_span(false)
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

pub fn build_synchronizer(config: &Config) -> anyhow::Result<Arc<Synchronizer>> {
    let client = DashboardClient::with_timeout(config.api_url.as_str(), config.request_timeout)?;
    tracing::info!("Reading dashboard collections from {}", client.base_url());
    Ok(Synchronizer::new(DataFetcher::new(Arc::new(client))))
}

pub fn live_config(config: &Config) -> anyhow::Result<LiveConfig> {
    let reconnect = ReconnectPolicy {
        initial_delay: config.reconnect_delay,
        max_delay: config.reconnect_delay_max,
        ..ReconnectPolicy::default()
    };
    Ok(LiveConfig::new(config.socket_url.as_str())?.with_reconnect(reconnect))
}

/// Runs a single reload and renders it. Returns `false` if the data is stale.
pub async fn run_once<W: Write>(
    config: &Config,
    synchronizer: &Arc<Synchronizer>,
    out: &mut W,
) -> anyhow::Result<bool> {
    synchronizer.reload().await;
    let state = synchronizer.current();
    writeln!(out, "{}", render(&state, config.output)?)?;
    out.flush()?;
    Ok(!state.degraded)
}

/// Mounts the dashboard on `source` and renders every settled state until
/// `shutdown` resolves, then unmounts.
pub async fn run_live<W: Write>(
    config: &Config,
    synchronizer: &Arc<Synchronizer>,
    source: Arc<dyn NotificationSource>,
    shutdown: impl Future<Output = ()>,
    out: &mut W,
) -> anyhow::Result<()> {
    let mut states = synchronizer.subscribe();
    let mount = synchronizer.mount(source);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                if state.status == SyncStatus::Refreshing {
                    continue;
                }
                writeln!(out, "{}", render(&state, config.output)?)?;
                out.flush()?;
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                break;
            }
        }
    }

    mount.unmount();
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
