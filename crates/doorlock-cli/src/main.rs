//! `doorlock` - RFID door lock controller.
//!
//! Reads card numbers from a serial RFID reader, checks them against a card
//! directory mirrored from the member-management service, and energizes the
//! door relay for known cards. The directory is cached on local disk, so the
//! door keeps working while the service is unreachable.
//!
//! # Startup
//!
//! 1. Parse arguments and load the configuration (no runtime yet)
//! 2. Initialize logging
//! 3. Claim the GPIO lines and drive them low, then install a panic hook
//!    that drives them low again
//! 4. Open the serial reader and register termination signals
//! 5. Read the cached card directory (fatal if missing or unreadable)
//! 6. Start the reader, updater and (unless `--debug`) liveness loops
//!
//! Any termination signal, or any loop failing, stops every loop. The door
//! is locked on every exit path; a failure exits non-zero so the service
//! manager restarts the controller.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::FalseyValueParser;
use doorlock_controller::{
    Actuator, Controller, LivenessMonitor, LoopKind, ReaderLoop, Updater, directory_channel,
};
use doorlock_hardware::{DeviceWatchdog, LockPins, SerialCardReader, SysfsLock};
use doorlock_network::HttpAuthority;
use doorlock_storage::{DirectoryStore, JsonFileStore};
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::DoorConfig;

/// doorlock - RFID door lock controller
#[derive(Parser, Debug)]
#[command(name = "doorlock")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to TOML configuration file (all keys have defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log to file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Development mode: do not open or kick the hardware watchdog.
    /// `DEBUG` set to `0`, `false`, `no`, `off` or empty leaves it off
    #[arg(long, env = "DEBUG", value_parser = FalseyValueParser::new())]
    debug: bool,

    /// Bearer key for the card directory endpoint
    #[arg(long, env = "DOOR_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Validate the configuration, print it (without the API key) and exit
    #[arg(long)]
    check_config: bool,
}

/// 1. Parse args and load configuration synchronously
/// 2. THEN create the Tokio runtime
/// 3. THEN run the async main
fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DoorConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => DoorConfig::default(),
    };
    if let Some(key) = &args.api_key {
        config.authority.api_key.clone_from(key);
    }
    config.validate()?;

    if args.check_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_logging(&args)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to create Tokio runtime")?;
    runtime.block_on(async_main(args, config))
}

fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .context("failed to open log file")?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
    Ok(())
}

async fn async_main(args: Args, config: DoorConfig) -> Result<()> {
    info!(version = doorlock_core::VERSION, "Initializing...");

    let pins = config.lock_pins();
    let lock = SysfsLock::open(&pins).context("failed to claim lock GPIO lines")?;
    let actuator = Actuator::new(lock).context("failed to lock door at startup")?;
    install_panic_hook(pins);

    let serial = config.serial();
    let reader = SerialCardReader::open(&serial)
        .with_context(|| format!("failed to open card reader on {}", serial.path.display()))?;

    let signals = Signals::register()?;
    info!("Signals initialized");

    let store = JsonFileStore::new(&config.storage.cards_file);
    let directory = store
        .load()
        .await
        .with_context(|| format!("failed to read {}", store.path().display()))?;

    let authority = Arc::new(HttpAuthority::new(config.authority())?);
    info!(url = authority.base_url(), "Remote authority configured");

    let (publisher, subscriber) = directory_channel(directory);
    let reader = ReaderLoop::new(
        reader,
        actuator,
        Arc::clone(&authority),
        subscriber,
        config.reader(),
    );
    let updater = Updater::new(authority, store, publisher, config.updater());

    let shutdown = CancellationToken::new();
    let mut controller = Controller::new(&shutdown);
    controller.spawn(LoopKind::Reader, |stop| reader.run(stop));
    controller.spawn(LoopKind::Updater, |stop| updater.run(stop));

    if args.debug {
        warn!("DEBUG set, hardware watchdog disabled");
    } else {
        let watchdog = DeviceWatchdog::open(&config.hardware.watchdog_device)
            .context("failed to open hardware watchdog")?;
        let monitor = LivenessMonitor::new(watchdog, config.liveness_interval());
        controller.spawn(LoopKind::Liveness, |stop| monitor.run(stop));
    }

    let signal_shutdown = shutdown.clone();
    let signal_task = tokio::spawn(async move {
        let name = signals.recv().await;
        info!(signal = name, "Exiting, locking door...");
        signal_shutdown.cancel();
    });

    let result = controller.run().await;
    signal_task.abort();

    match &result {
        Ok(()) => info!("Door controller stopped"),
        Err(e) => error!(error = %e, "Door controller failed"),
    }
    result.context("door controller stopped on failure")
}

/// Drive the lock lines low before the default panic output. Release builds
/// abort on panic, so no destructor would run.
fn install_panic_hook(pins: LockPins) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        pins.force_release();
        default_hook(info);
    }));
}

/// Termination signals that lock the door and stop the controller.
struct Signals {
    interrupt: Signal,
    terminate: Signal,
    hangup: Signal,
    quit: Signal,
}

impl Signals {
    fn register() -> Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("failed to register SIGINT")?,
            terminate: signal(SignalKind::terminate()).context("failed to register SIGTERM")?,
            hangup: signal(SignalKind::hangup()).context("failed to register SIGHUP")?,
            quit: signal(SignalKind::quit()).context("failed to register SIGQUIT")?,
        })
    }

    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.quit.recv() => "SIGQUIT",
        }
    }
}
