use std::path::PathBuf;
use std::time::Duration;

use tokio::signal;
use tracing::{info, warn};
use woo_notify::Result;
use woo_notify::config::Settings;
use woo_notify::engine::{Engine, RngChooser};
use woo_notify::error::{ConfigError, Error as NotifyError};
use woo_notify::feed;
use woo_notify::payload::Payload;
use woo_notify::telemetry::init_tracing;

use super::cli::{Cli, Command, PayloadArgs, PreviewArgs};
use super::driver::{ConsoleSurface, run_preview};

const DEFAULT_CONFIG: &str = "woo-notify.toml";

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.as_deref(), cli.json_logs)?;

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut settings = Settings::from_env_and_file(&config_path)?;

    match cli.command {
        Command::Payload(args) => print_payload(&settings, &args),
        Command::Preview(args) => {
            if let Some(interval) = args.interval {
                settings.notifications.interval = positive("cli.interval", interval)?;
            }
            if let Some(duration) = args.duration {
                settings.notifications.duration = positive("cli.duration", duration)?;
            }
            preview(&settings, &args).await
        }
    }
}

fn print_payload(settings: &Settings, args: &PayloadArgs) -> Result<()> {
    let Some(payload) = build_payload(settings, args.seed)? else {
        return Ok(());
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        serde_json::to_string(&payload)?
    };
    println!("{json}");
    Ok(())
}

async fn preview(settings: &Settings, args: &PreviewArgs) -> Result<()> {
    let payload = build_payload(settings, args.seed)?;
    let chooser = chooser(args.seed);
    let surface = ConsoleSurface::new(std::io::stdout());
    let Some(engine) = Engine::start(payload, surface, chooser) else {
        return Ok(());
    };

    info!(
        interval = %humantime::format_duration(settings.notifications.interval),
        duration = %humantime::format_duration(settings.notifications.duration),
        "preview started, press Ctrl-C to stop"
    );
    let engine = run_preview(engine, args.cycles, shutdown_signal()).await;
    info!(shown = engine.shown(), "preview finished");
    Ok(())
}

fn build_payload(settings: &Settings, seed: Option<u64>) -> Result<Option<Payload>> {
    let orders = feed::load_orders(settings, &mut chooser(seed))?;
    let payload = Payload::from_settings(&settings.notifications, orders);
    if payload.is_none() {
        info!("no eligible orders, nothing to show");
    }
    Ok(payload)
}

fn chooser(seed: Option<u64>) -> RngChooser<rand::rngs::StdRng> {
    RngChooser::seeded(seed.unwrap_or_else(rand::random))
}

fn positive(field: &'static str, value: Duration) -> Result<Duration> {
    if value.is_zero() {
        return Err(NotifyError::from(ConfigError::InvalidField {
            field,
            message: "value must be greater than zero".to_string(),
        }));
    }
    Ok(value)
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, stopping preview");
}
