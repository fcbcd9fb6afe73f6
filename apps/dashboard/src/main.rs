use todo_dashboard::config::Config;
use todo_dashboard::main_lib::{
    build_synchronizer, init_tracing, live_config, run_live, run_once, shutdown_signal,
};
use todo_dashboard_live::{reset_shared_client, shared_client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    let synchronizer = build_synchronizer(&config)?;

    if config.once {
        if !run_once(&config, &synchronizer, &mut std::io::stdout()).await? {
            let reason = synchronizer
                .current()
                .last_error
                .clone()
                .unwrap_or_else(|| "reload failed".into());
            anyhow::bail!("Dashboard data is stale: {}", reason);
        }
        return Ok(());
    }

    let live = shared_client(&live_config(&config)?);
    tracing::info!("Listening for change events on {}", live.config().endpoint());
    let result = run_live(
        &config,
        &synchronizer,
        live,
        shutdown_signal(),
        &mut std::io::stdout(),
    )
    .await;
    reset_shared_client();
    result
}
