//! Veloce - headless ERG training session driver
//!
//! Connects the trainer (or the simulator), runs a workout through the
//! timeline engine at 1 Hz and exports the ride when it completes.

use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use veloce::coach::{spawn_worker, CoachClient};
use veloce::devices::DeviceSessionManager;
use veloce::devices::TelemetryCell;
use veloce::recording::exporter_tcx::TcxFileSink;
use veloce::storage::config;
use veloce::workout::types::{Interval, IntervalKind, Workout};
use veloce::workout::WorkoutTimeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Veloce v{}", env!("CARGO_PKG_VERSION"));

    let app_config = config::load_config().context("Failed to load configuration")?;
    tracing::info!(
        "Rider: {} (FTP {}W)",
        app_config.profile.name,
        app_config.profile.ftp
    );

    let (telemetry_tx, telemetry_rx) = crossbeam::channel::unbounded();

    let mut devices = DeviceSessionManager::new(telemetry_tx);
    devices.set_discovery_timeout(Duration::from_secs(u64::from(
        app_config.devices.discovery_timeout_secs,
    )));
    if app_config.devices.simulate {
        devices.toggle_simulation();
    } else {
        devices
            .initialize()
            .await
            .context("Failed to initialize Bluetooth")?;
    }
    devices.connect_bike().await.context("Failed to connect bike")?;

    let sink = Box::new(TcxFileSink::new(app_config.export_dir()));
    let mut engine = WorkoutTimeline::new(
        devices.trainer_control(),
        TelemetryCell::new(telemetry_rx),
        sink,
        app_config.profile.ftp,
    );
    engine.set_user_name(Some(app_config.profile.name.clone()));

    if let Some(api_key) = app_config.coach.api_key.clone() {
        let client = match app_config.coach.base_url.clone() {
            Some(base_url) => CoachClient::with_base_url(api_key, base_url),
            None => CoachClient::new(api_key),
        };
        let (req_tx, req_rx) = crossbeam::channel::unbounded();
        let (resp_tx, resp_rx) = crossbeam::channel::unbounded();
        spawn_worker(client, req_rx, resp_tx, tokio::runtime::Handle::current());
        engine = engine.with_coach(req_tx, resp_rx);
        tracing::info!("AI coaching enabled");
    }

    let workout = default_workout(app_config.profile.ftp);
    engine.start_workout(workout, chrono::Utc::now().timestamp_millis())?;

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    while engine.is_active() {
        ticker.tick().await;
        engine.tick(chrono::Utc::now().timestamp_millis());
    }

    devices.disconnect().await;
    tracing::info!("Session finished");
    Ok(())
}

/// A short sweet-spot session used when no workout file is given.
fn default_workout(ftp: u16) -> Workout {
    let pct = |p: u32| (ftp as u32 * p / 100) as u16;

    Workout::new(
        "Sweet Spot Opener".to_string(),
        vec![
            Interval::new(300, pct(55), IntervalKind::Warmup),
            Interval::new(600, pct(90), IntervalKind::Active),
            Interval::new(180, pct(50), IntervalKind::Recovery),
            Interval::new(600, pct(90), IntervalKind::Active),
            Interval::new(300, pct(45), IntervalKind::Cooldown),
        ],
    )
}
