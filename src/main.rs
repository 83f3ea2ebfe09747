mod abort;
mod capture;
mod config;
mod controller;
mod motion;
mod peripheral;
mod rf;
mod rig;
#[cfg(feature = "ros")]
mod ros;
mod scan;
mod sim;
#[cfg(test)]
mod testing;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crate::abort::CancelFlag;
use crate::config::Config;
use crate::peripheral::AntennaState;
use crate::rig::Rig;
use crate::scan::ScanPlan;
use crate::web::AppState;

#[derive(Parser)]
#[command(name = "survey-o-mat")]
#[command(about = "Raster-scan RF survey robot control")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate { config: String },
    /// Run one raster scan
    Scan {
        config: String,
        #[arg(long)]
        rows: Option<u32>,
        #[arg(long)]
        columns: Option<u32>,
        /// Speed along the first row in m/s; the sign sets the direction
        #[arg(long, allow_hyphen_values = true)]
        velocity: Option<f64>,
    },
    /// Capture one sample without moving
    Capture { config: String },
    /// Take a photo, or one every `--every` until Ctrl-C
    Photo {
        config: String,
        #[arg(long, value_parser = humantime::parse_duration)]
        every: Option<Duration>,
        /// Stop after this many photos
        #[arg(long, requires = "every")]
        count: Option<usize>,
    },
    /// Send one antenna-select command (not retried)
    Antenna { config: String, position: AntennaState },
    /// Print the current heading
    Heading { config: String },
    /// Serve the operator API
    Serve { config: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Scan {
            config,
            rows,
            columns,
            velocity,
        } => scan(&config, rows, columns, velocity).await,
        Commands::Capture { config } => capture(&config).await,
        Commands::Photo {
            config,
            every,
            count,
        } => match every {
            Some(every) => photo_series(&config, every, count).await,
            None => photo(&config).await,
        },
        Commands::Antenna { config, position } => antenna(&config, position).await,
        Commands::Heading { config } => heading(&config).await,
        Commands::Serve { config } => serve(&config).await,
    }
}

fn load(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error loading {}: {}", path, e);
            None
        }
    }
}

fn build_rig(config: &Config, cancel: &CancelFlag) -> Option<Rig> {
    match rig::build(config, cancel.clone()) {
        Ok(rig) => Some(rig),
        Err(e) => {
            eprintln!("Failed to set up robot: {}", e);
            None
        }
    }
}

/// Raises the cancel flag on Ctrl-C so a running motion loop stops the robot.
fn cancel_on_ctrl_c(cancel: &CancelFlag) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Ctrl-C received, stopping robot");
            cancel.cancel();
        }
    });
}

fn validate(path: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };

    let plan = config.scan.plan();
    println!("Configuration is valid");
    println!("  robot: {:?}", config.robot.backend);
    println!("  peripherals: {:?}", config.peripherals.backend);
    println!("  rf: {:?}", config.rf.backend);
    println!(
        "  scan: {} rows x {} columns at {} m/s ({} samples)",
        plan.rows,
        plan.columns,
        plan.velocity,
        plan.samples()
    );
    println!(
        "  antennas: {}",
        config
            .capture
            .antenna_sequence
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    ExitCode::SUCCESS
}

async fn scan(
    path: &str,
    rows: Option<u32>,
    columns: Option<u32>,
    velocity: Option<f64>,
) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    let defaults = config.scan.plan();
    let plan = ScanPlan {
        rows: rows.unwrap_or(defaults.rows),
        columns: columns.unwrap_or(defaults.columns),
        velocity: velocity.unwrap_or(defaults.velocity),
    };

    let cancel = CancelFlag::new();
    let Some(mut rig) = build_rig(&config, &cancel) else {
        return ExitCode::FAILURE;
    };
    cancel_on_ctrl_c(&cancel);

    match rig.orchestrator.run(plan).await {
        Ok(summary) => {
            println!(
                "Scan {} completed: {} samples, {} row transitions",
                summary.run_id,
                summary.records.len(),
                summary.row_transitions
            );
            println!("Output: {}", summary.dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn capture(path: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    let cancel = CancelFlag::new();
    let Some(mut rig) = build_rig(&config, &cancel) else {
        return ExitCode::FAILURE;
    };

    match rig.orchestrator.capture_here().await {
        Ok(record) => {
            println!("Sample {}", record.id);
            match &record.photo {
                Some(photo) => println!("  photo: {}", photo),
                None => println!("  photo: missing"),
            }
            for reading in &record.readings {
                println!("  antenna {}: {:.2} dB", reading.antenna, reading.power);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Capture failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn photo(path: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    let cancel = CancelFlag::new();
    let Some(mut rig) = build_rig(&config, &cancel) else {
        return ExitCode::FAILURE;
    };

    match rig.orchestrator.take_photo().await {
        Ok(Some(name)) => {
            println!("Photo saved as {}", name);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("Photo capture failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Failed to prepare photo directory: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn photo_series(path: &str, every: Duration, count: Option<usize>) -> ExitCode {
    if every.is_zero() {
        eprintln!("--every must be greater than zero");
        return ExitCode::FAILURE;
    }
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    let cancel = CancelFlag::new();
    let Some(mut rig) = build_rig(&config, &cancel) else {
        return ExitCode::FAILURE;
    };
    cancel_on_ctrl_c(&cancel);

    match rig.orchestrator.photo_series(every, count, &cancel).await {
        Ok(photos) => {
            println!("Saved {} photos", photos.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to prepare photo directory: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn antenna(path: &str, position: AntennaState) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    let cancel = CancelFlag::new();
    let Some(mut rig) = build_rig(&config, &cancel) else {
        return ExitCode::FAILURE;
    };

    match rig.orchestrator.send_antenna(position).await {
        Ok(()) => {
            println!("Sent: '{}'", position);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to send '{}': {}", position, e);
            ExitCode::FAILURE
        }
    }
}

async fn heading(path: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    let cancel = CancelFlag::new();
    let Some(mut rig) = build_rig(&config, &cancel) else {
        return ExitCode::FAILURE;
    };

    match rig.orchestrator.heading().await {
        Ok(heading) => {
            println!("{} ({:.4} rad)", heading, heading.radians());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to read heading: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(path: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    if config.web.api_keys.is_empty() {
        log::warn!("No API keys configured; every request will be rejected");
    }

    let cancel = CancelFlag::new();
    let Some(rig) = build_rig(&config, &cancel) else {
        return ExitCode::FAILURE;
    };

    let (connectivity, _monitor) = rig.monitor.spawn();
    let (controller, worker) = controller::spawn(rig.orchestrator, cancel, 16);

    let stopper = controller.clone();
    let state = AppState {
        config: Arc::new(config.web.clone()),
        controller,
        connectivity,
        default_plan: config.scan.plan(),
    };

    let shutdown = async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Ctrl-C received, stopping robot and shutting down");
        }
        stopper.stop();
    };

    let served = web::run_server(&config.web.bind, state, shutdown).await;

    // The router held the last queue handles; the worker exits once the
    // cancelled command has stopped the robot.
    if let Err(e) = worker.await {
        log::error!("Controller task failed: {}", e);
    }

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
