//! xtray Daemon
//!
//! Main process for the xtray system tray manager.
//!
//! Responsibilities:
//! - Load configuration and set up logging
//! - Connect to the X server and claim the tray selection
//! - Forward X11 events to the dispatch loop
//! - Shut down cleanly on Ctrl+C or when another tray takes over

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::{find_config_file, Config};
use std::path::PathBuf;
use std::sync::mpsc;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use xtray_core::event_loop::{self, LoopExit, StopHandle};
use xtray_core::{DisplayError, DisplayEvent, Tray};
use xtray_platform_x11::X11Display;

#[derive(Parser)]
#[command(name = "xtray")]
#[command(author, version, about = "Minimal freedesktop system tray for X11")]
struct Args {
    /// Configuration file to use instead of the standard locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// X display to connect to (defaults to $DISPLAY)
    #[arg(short, long)]
    display: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

/// Parse a configured log level, defaulting to INFO.
fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Spawn a named thread that reads display events and forwards them to the loop.
///
/// The thread exits when reading fails or the loop has gone away. A read
/// failure is forwarded as [`DisplayEvent::ConnectionLost`], since other
/// senders (the Ctrl+C handler) keep the channel open.
fn spawn_forwarding_thread<F>(
    name: &str,
    mut next_event: F,
    sender: mpsc::Sender<DisplayEvent>,
) -> Result<std::thread::JoinHandle<()>>
where
    F: FnMut() -> Result<DisplayEvent, DisplayError> + Send + 'static,
{
    let thread_name = name.to_string();
    std::thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || loop {
            match next_event() {
                Ok(event) => {
                    if sender.send(event).is_err() {
                        break; // Loop finished, daemon shutting down
                    }
                }
                Err(e) => {
                    error!("Lost connection to the X server: {}", e);
                    let _ = sender.send(DisplayEvent::ConnectionLost(e.to_string()));
                    break;
                }
            }
        })
        .map_err(|e| anyhow::anyhow!("Failed to spawn {} thread: {}", thread_name, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (needed for log level)
    let config_path = args.config.clone().or_else(find_config_file);
    let loaded = match &config_path {
        Some(path) => Config::load_from_path(path),
        None => Ok(Config::default()),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        // Can't use tracing yet, fall back to eprintln
        eprintln!("Failed to load configuration: {:#}. Using defaults.", e);
        Config::default()
    });
    if let Some(level) = args.log_level {
        config.behavior.log_level = level;
    }
    if args.display.is_some() {
        config.display = args.display;
    }

    // Validate and clamp config values
    let config_warnings = config.validate();

    // Initialize logging; RUST_LOG takes precedence over the configured level
    let log_level = parse_log_level(&config.behavior.log_level);
    let builder = FmtSubscriber::builder().with_max_level(log_level);
    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())?
        }
        Err(_) => tracing::subscriber::set_global_default(builder.finish())?,
    }

    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    for w in &config_warnings {
        warn!("Config: {} - {}", w.field, w.message);
    }

    info!("xtray starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Fatal: without a display there is nothing to manage
    let display = X11Display::connect(config.display.as_deref()).context("Cannot open display")?;
    let reader = display.event_reader();
    let options = config.tray_options(display.screen_number());
    info!(
        "Host window {}x{} at ({}, {}), icon slot {}",
        options.geometry.width,
        options.geometry.height,
        options.geometry.x,
        options.geometry.y,
        options.geometry.icon_size
    );

    // Fatal: a second tray manager cannot coexist with the current one
    let mut tray = Tray::start(display, &options).context("Unable to get system tray selection")?;

    let (event_tx, mut event_rx) = mpsc::channel::<DisplayEvent>();
    // Not joined: the reader stays blocked on the connection until the process exits
    let _reader_handle =
        spawn_forwarding_thread("x11-events", move || reader.next_event(), event_tx.clone())?;

    let stop = StopHandle::new();

    // Install Ctrl+C handler so terminal kill triggers graceful shutdown
    {
        let stop = stop.clone();
        let wake_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Ctrl+C received, initiating shutdown...");
                stop.request_stop();
                // Wake the loop so it observes the stop request
                let _ = wake_tx.send(DisplayEvent::Other);
            }
        });
    }
    drop(event_tx);

    info!("Ready. Waiting for tray icons to dock.");

    // The loop blocks on the event channel, keep it off the async runtime
    let result = tokio::task::spawn_blocking(move || {
        let result = event_loop::run(&mut tray, &mut event_rx, &stop);
        tray.shutdown();
        result
    })
    .await
    .context("Event loop task panicked")?;

    match result.context("Event loop failed")? {
        LoopExit::StopRequested => debug!("Event loop stopped on request"),
        LoopExit::SourceClosed => warn!("X11 event stream closed"),
        LoopExit::SelectionLost => info!("Another tray manager took over"),
    }

    info!("xtray shutting down.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtray_core::EventSource;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("trace"), Level::TRACE);
        assert_eq!(parse_log_level("Debug"), Level::DEBUG);
        assert_eq!(parse_log_level("WARN"), Level::WARN);
        assert_eq!(parse_log_level("error"), Level::ERROR);
        assert_eq!(parse_log_level("bogus"), Level::INFO);
    }

    #[test]
    fn test_spawn_forwarding_thread_forwards_events() {
        let mut events = vec![DisplayEvent::Expose { window: 7, count: 0 }].into_iter();
        let (tx, rx) = mpsc::channel();

        let handle = spawn_forwarding_thread(
            "test",
            move || {
                events
                    .next()
                    .ok_or_else(|| DisplayError::Connection("end of test events".into()))
            },
            tx,
        )
        .unwrap();
        handle.join().expect("Thread should exit cleanly");

        assert_eq!(
            rx.recv().unwrap(),
            DisplayEvent::Expose { window: 7, count: 0 }
        );
    }

    #[test]
    fn test_spawn_forwarding_thread_stops_on_channel_close() {
        let (tx, rx) = mpsc::channel();
        drop(rx);

        let handle =
            spawn_forwarding_thread("test-close", || Ok(DisplayEvent::Other), tx).unwrap();

        // Thread should exit when send() fails
        handle.join().expect("Thread should exit cleanly");
    }

    #[test]
    fn test_spawn_forwarding_thread_reports_connection_loss() {
        let (tx, mut rx) = mpsc::channel();
        // Held like the Ctrl+C handler's sender, so the channel never closes
        let _wake_tx = tx.clone();

        let handle = spawn_forwarding_thread(
            "test-lost",
            || Err(DisplayError::Connection("broken pipe".into())),
            tx,
        )
        .unwrap();
        handle.join().expect("Thread should exit cleanly");

        match rx.next_event() {
            Some(DisplayEvent::ConnectionLost(reason)) => {
                assert!(reason.contains("broken pipe"), "{}", reason)
            }
            other => panic!("Expected ConnectionLost, got {:?}", other),
        }
    }

    #[test]
    fn test_args_parse_flags() {
        let args = Args::try_parse_from([
            "xtray",
            "--config",
            "/tmp/xtray.toml",
            "--display",
            ":1",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("/tmp/xtray.toml")));
        assert_eq!(args.display.as_deref(), Some(":1"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_args_default_to_none() {
        let args = Args::try_parse_from(["xtray"]).unwrap();
        assert!(args.config.is_none());
        assert!(args.display.is_none());
        assert!(args.log_level.is_none());
    }
}
