//! # Sorter Control
//!
//! Runs the sorting pipeline against the configured hardware driver.
//!
//! Startup loads and validates `config/sorter.toml`, opens the JSON data
//! file (stepper positions and bin bindings), builds the steppers through
//! the driver registry and enters the tick loop. Ctrl-C stops the loop,
//! returns every machine to IDLE and releases the steppers.
//!
//! Vision and classification come from the simulation backends; the
//! inference pipeline is a separate process.

use clap::Parser;
use sorter_common::classify::Classification;
use sorter_common::consts::DEFAULT_CONFIG_PATH;
use sorter_common::pipeline::config::SorterConfig;
use sorter_common::pipeline::events::{SorterEvent, event_channel};
use sorter_control::config::load_config;
use sorter_control::cycle::{Collaborators, Coordinator};
use sorter_control::profile::JsonSortingProfile;
use sorter_hal::drivers::simulation::{SimulatedClassifier, SimulatedVision};
use sorter_hal::{BlobStore, DriverRegistry, SorterHardware};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Sorter Control: parts sorting pipeline
#[derive(Parser, Debug)]
#[command(name = "sorter_control")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Feeder, classification and distribution pipeline for the parts sorter")]
struct Args {
    /// Path to the sorter configuration TOML.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Declare the current chute position as 0° before starting.
    #[arg(long)]
    home_chute: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Config errors are reported after tracing is up, at the default level.
    let config = load_config(&args.config);
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level.as_directive())
        .unwrap_or("info");
    setup_tracing(&args, level);

    info!("Sorter Control v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, &config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Sorter Control shutdown complete");
}

fn run(args: &Args, config: &SorterConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: '{}', tick={}ms, {} layers / {} bins, driver '{}'",
        config.shared.service_name,
        config.pipeline.tick_ms,
        config.layout.layers.len(),
        config.layout.bin_count(),
        config.hardware.driver,
    );

    let store = Arc::new(BlobStore::open(&config.hardware.data_file)?);
    info!("Data file: {}", store.path().display());

    let registry = DriverRegistry::with_builtin()?;
    let hardware = SorterHardware::from_config(&config.hardware, &registry, store.clone())?;
    hardware.enable_all()?;

    let profile = match &config.distribution.parts_file {
        Some(path) => JsonSortingProfile::load(path)?,
        None => {
            warn!("No parts file configured, every piece sorts to misc");
            JsonSortingProfile::empty()
        }
    };
    info!("Sorting profile: {} parts", profile.len());

    let classifier = SimulatedClassifier::fixed(Classification::none(), Duration::from_millis(200))?;

    let (events, event_rx) = event_channel();
    let drain = std::thread::Builder::new()
        .name("event-drain".to_string())
        .spawn(move || drain_events(event_rx))?;

    let mut coordinator = Coordinator::new(
        config,
        Collaborators {
            hardware: hardware.clone(),
            vision: Arc::new(SimulatedVision::new()),
            classifier: Arc::new(classifier),
            profile: Arc::new(profile),
            bindings: store,
            events,
        },
    );

    if args.home_chute {
        coordinator.distribution().chute().home()?;
    }

    // Setup signal handler for graceful shutdown.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    coordinator.run(&running);
    coordinator.cleanup();
    hardware.shutdown();

    // Drain thread exits once the last sender is gone.
    drop(coordinator);
    if drain.join().is_err() {
        warn!("Event drain thread panicked");
    }
    Ok(())
}

/// Log every pipeline event as JSON until the channel closes.
fn drain_events(rx: Receiver<SorterEvent>) {
    for event in rx {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "sorter_events", "{json}"),
            Err(e) => warn!("Unserializable {} event: {e}", event.tag()),
        }
    }
}

/// Setup tracing subscriber from CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: &str) {
    let filter = EnvFilter::from_default_env();
    let filter = if args.verbose {
        filter.add_directive(Level::DEBUG.into())
    } else {
        match configured.parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter.add_directive(Level::INFO.into()),
        }
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
