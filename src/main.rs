use color_eyre::{eyre::eyre, Result};
use smartdoorbell::config::{Config, LogFormat};
use smartdoorbell::doorbell::Doorbell;
use smartdoorbell::gpio::ButtonWatcher;
use smartdoorbell::mqtt::RumqttTransport;
use std::path::PathBuf;
use tokio::{signal, sync::mpsc};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let level = config.log_level();
    let format = config.log_format();
    setup(
        *level.as_ref().unwrap_or(&Level::INFO),
        *format.as_ref().unwrap_or(&LogFormat::Pretty),
    )?;
    if let Err(e) = level {
        warn!("{e}, using info level");
    }
    if let Err(e) = format {
        warn!("{e}, using pretty format");
    }

    let doorbell = Doorbell::from_config(&config, RumqttTransport::default());

    // Taster am GPIO-Pin überwachen
    let (press_tx, mut press_rx) = mpsc::channel(16);
    let button = ButtonWatcher::watch(&config.gpio_settings(), press_tx)
        .map_err(|e| eyre!("Failed to watch doorbell button: {}", e))?;

    doorbell.enter().await?;
    info!(pin = button.pin(), "****************** Starting Doorbell ******************");

    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Unable to listen for shutdown signal: {}", e);
                }
                info!("exit");
                break;
            }
            press = press_rx.recv() => match press {
                Some(press) => doorbell.ring_at(press.at).await,
                None => {
                    warn!("Button watcher stopped");
                    break;
                }
            }
        }
    }

    // Verbindung sauber schließen
    doorbell.exit().await;
    Ok(())
}

fn load_config() -> Result<Config> {
    let path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => Config::default_path().ok_or_else(|| eyre!("No config directory available"))?,
    };
    Ok(Config::load(&path)?)
}

fn setup(level: Level, format: LogFormat) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env(level, format);
    Ok(())
}

fn setup_logging_env(level: Level, format: LogFormat) {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);
    match format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Full => builder.init(),
    }
}
