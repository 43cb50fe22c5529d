//! AgniNav - Autonomous firefighting mission controller
//!
//! Drives a differential-drive robot through a three-phase mission: a
//! wall-following approach into a structure, an interior patrol that scans
//! for fire and obstacle markers while suppressing fires, and a return leg
//! back to the start point.
//!
//! ## Multi-Threaded Architecture
//!
//! The interior phase runs three cooperating threads on top of the main
//! coordinator thread:
//!
//! - **Navigation Thread**: Drives the patrol route leg by leg, yielding the
//!   drivetrain whenever a marker is being handled
//! - **Sweep Thread**: Walks the sensor head between its bounds in a
//!   triangle wave, publishing the current angle
//! - **Responder Thread**: Polls the marker classifier and runs the
//!   suppression or avoidance maneuver for each detection
//!
//! A safety interlock thread polls the emergency input for the whole
//! mission and can halt everything at any time.

mod config;
mod drivetrain;
mod error;
mod hardware;
mod maneuver;
mod mission;
mod safety;
mod sequencer;
mod shared;
mod threads;
mod wall_follow;

use config::AgniConfig;
use drivetrain::Drivetrain;
use error::Result;
use hardware::sim::build_sim_rig;
use mission::{MissionCoordinator, MissionOutcome};
use shared::MissionState;

use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `agni-nav <path>` (positional)
/// - `agni-nav --config <path>` (flag-based)
/// - `agni-nav -c <path>` (short flag)
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = std::env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agni_nav=info".parse().unwrap()),
        )
        .init();

    let config = match parse_config_path() {
        Some(path) => {
            info!("Loading configuration from {}", path);
            AgniConfig::load(Path::new(&path))?
        }
        None if Path::new("agni.toml").exists() => {
            info!("Loading configuration from agni.toml");
            AgniConfig::load(Path::new("agni.toml"))?
        }
        None => {
            info!("Using default configuration");
            AgniConfig::default()
        }
    };

    let (rig, emergency) = build_sim_rig(&config.sim);

    // Ctrl-C maps onto the same emergency input the interlock polls.
    {
        let emergency = Arc::clone(&emergency);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            emergency.trip();
        })
        .map_err(|e| error::AgniError::Thread(format!("Error setting Ctrl-C handler: {e}")))?;
    }

    let mission = Arc::new(MissionState::new(config.mission.fire_target));
    let drivetrain = Arc::new(Drivetrain::new(Arc::clone(&rig.motors)));

    info!(
        fire_target = config.mission.fire_target,
        time_budget_secs = config.mission.time_budget_secs,
        "AgniNav starting"
    );

    let coordinator = MissionCoordinator::new(config, mission, drivetrain, rig);
    match coordinator.run()? {
        MissionOutcome::Completed {
            fires_suppressed,
            elapsed,
        } => {
            info!(
                fires_suppressed,
                elapsed_secs = elapsed.as_secs(),
                "Mission completed"
            );
        }
        MissionOutcome::Halted { reason } => {
            tracing::error!(reason, "Mission halted");
        }
    }

    Ok(())
}
