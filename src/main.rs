use anyhow::Result;
use log::{error, info};
use rustic_ink_display::{
    config::Config,
    dashboard::Dashboard,
    scheduler::{CalibrationPolicy, Scheduler, SystemClock, UpdateInterval},
};
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Resolves once the process is asked to stop.
async fn termination() -> Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;
    info!("Loaded configuration from {}", config_path.display());

    let dashboard = Dashboard::from_config(&config)?;
    let mut scheduler = Scheduler::new(
        SystemClock,
        UpdateInterval::new(config.update_interval)?,
        CalibrationPolicy::new(config.calibration_hours.clone()),
        dashboard,
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match termination().await {
            Ok(()) => info!("Termination requested"),
            Err(e) => error!("Could not listen for signals: {e}"),
        }
        signal_cancel.cancel();
    });

    scheduler.run(cancel).await;

    info!(
        "Shut down, panel {:?}",
        scheduler.into_cycle().panel_state()
    );
    Ok(())
}
