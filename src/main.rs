use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use gamepad_lsl::config::AppConfig;
use gamepad_lsl::controller::{ControllerSource, GilrsSource};
use gamepad_lsl::link::{LinkController, SessionSummary};
use gamepad_lsl::sampling::ReleasePolicy;
use gamepad_lsl::stream::{Clock, OutletFactory};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Streams game controller axes and button presses
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Controller index, overrides the configured device
    #[arg(short, long)]
    index: Option<usize>,

    /// List connected controllers and exit
    #[arg(long)]
    list: bool,

    /// Store the selected controller as the configured device
    #[arg(long)]
    save_config: bool,

    /// Re-arm button detection the way the legacy streamer did
    #[arg(long)]
    legacy_release: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup(args.verbose)?;

    let config_path = args.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load_or_default(&config_path)?;
    if args.legacy_release {
        config.sampling.release_policy = ReleasePolicy::Legacy;
    }

    // Controller initialisieren
    let mut source = GilrsSource::new()?;
    let devices = source.refresh();

    if args.list {
        if devices.is_empty() {
            println!("No controllers connected");
        }
        for device in &devices {
            println!("[{}] {} ({})", device.index, device.name, device.guid);
        }
        return Ok(());
    }

    let index = match args.index {
        Some(index) => index,
        None => match config.resolve_device(&devices) {
            Ok(Some(index)) => index,
            Ok(None) => config.sampling.controller_index,
            Err(e) => {
                warn!("{}", e);
                config.sampling.controller_index
            }
        },
    };

    if args.save_config {
        let device = devices
            .iter()
            .find(|d| d.index == index)
            .ok_or_else(|| eyre!("No controller connected at index {}", index))?;
        config.remember_device(device);
        config.save(&config_path)?;
    }

    let (outlets, clock) = transport();
    let mut link = LinkController::new(
        Box::new(source),
        outlets,
        clock,
        config.link_settings(&host_name()),
    );
    link.link(index)
        .map_err(|e| eyre!("Could not link controller {}: {}", index, e))?;

    info!("Streaming controller {}, press Ctrl-C to unlink", index);
    let mut health_check = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("Ctrl-C received"),
                    Err(e) => error!("Could not listen for Ctrl-C, unlinking: {}", e),
                }
                break;
            }
            _ = health_check.tick() => {
                match link.reap().await {
                    Ok(Some(summary)) => {
                        report(&summary);
                        return match summary.failure {
                            Some(e) => Err(eyre!("Session ended: {}", e)),
                            None => Ok(()),
                        };
                    }
                    Ok(None) => {}
                    Err(e) => return Err(eyre!("Could not close the failed session: {}", e)),
                }
            }
        }
    }

    // Verbindung sauber trennen
    match link.unlink().await {
        Ok(Some(summary)) => report(&summary),
        Ok(None) => {}
        Err(e) => {
            error!("Unlink failed: {}", e);
            return Err(eyre!("Could not stop the background processing: {}", e));
        }
    }
    Ok(())
}

fn report(summary: &SessionSummary) {
    info!(
        "Session on controller {} from {} to {}: {} iterations ({} disconnected), {} axes samples, {} button events",
        summary.controller_index,
        summary.started_at.format("%H:%M:%S%.3f"),
        summary.stopped_at.format("%H:%M:%S%.3f"),
        summary.stats.iterations,
        summary.stats.disconnected_iterations,
        summary.stats.axes_samples,
        summary.stats.button_events
    );
    if let Some(failure) = &summary.failure {
        error!("Session failed: {}", failure);
    }
}

#[cfg(feature = "lsl")]
fn transport() -> (Box<dyn OutletFactory>, Arc<dyn Clock>) {
    use gamepad_lsl::stream::{LslClock, LslOutletFactory};
    (Box::new(LslOutletFactory), Arc::new(LslClock))
}

#[cfg(not(feature = "lsl"))]
fn transport() -> (Box<dyn OutletFactory>, Arc<dyn Clock>) {
    use gamepad_lsl::stream::{LogOutletFactory, MonotonicClock};
    warn!("Built without the `lsl` feature, samples are only written to the log");
    (Box::new(LogOutletFactory), Arc::new(MonotonicClock::new()))
}

fn host_name() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("Could not determine host name: {}", e);
            "unknown".to_string()
        }
    }
}

fn setup(verbose: bool) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env(if verbose { Level::DEBUG } else { Level::INFO });
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
