//! Navigation sequencer: runs the ordered legs and turns of one mission
//! phase.
//!
//! The sequencer knows nothing about markers. When a leg reports
//! `Preempted` it simply re-issues the identical leg until it completes or
//! the mission halts; the wall follower re-samples its side distance fresh
//! each time, so interruptions need no special casing here.

use crate::config::{DriveConfig, RouteStepConfig};
use crate::drivetrain::{Drivetrain, Owner};
use crate::hardware::DistanceSensors;
use crate::maneuver::rotate_in_place;
use crate::shared::MissionState;
use crate::wall_follow::{Leg, LegOutcome, run_leg};

use std::time::Duration;

/// One step of a phase route.
#[derive(Debug, Clone, Copy)]
pub enum RouteStep {
    Leg(Leg),
    /// In-place rotation; positive degrees turn left
    Turn { degrees: f32 },
}

/// How a phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed,
    Halted,
}

/// Expand a configured route into executable steps.
pub fn build_route(drive: &DriveConfig, steps: &[RouteStepConfig]) -> Vec<RouteStep> {
    steps
        .iter()
        .map(|step| match *step {
            RouteStepConfig::Leg { side_cm, front_cm } => {
                RouteStep::Leg(Leg::from_config(drive, side_cm, front_cm))
            }
            RouteStepConfig::Turn { degrees } => RouteStep::Turn { degrees },
        })
        .collect()
}

/// Execute a route strictly in order.
pub fn run_phase(
    name: &str,
    route: &[RouteStep],
    drivetrain: &Drivetrain,
    sensors: &dyn DistanceSensors,
    mission: &MissionState,
    drive: &DriveConfig,
) -> PhaseOutcome {
    let tick = Duration::from_millis(drive.tick_ms);
    tracing::info!(phase = name, steps = route.len(), "Phase started");

    for (index, step) in route.iter().enumerate() {
        match *step {
            RouteStep::Leg(leg) => loop {
                match run_leg(&leg, drivetrain, sensors, mission, tick) {
                    LegOutcome::Completed => break,
                    LegOutcome::Preempted => {
                        // Marker handling borrowed the drivetrain; the
                        // identical leg goes again once it is returned.
                        tracing::debug!(phase = name, step = index, "Re-issuing preempted leg");
                    }
                    LegOutcome::Halted => {
                        tracing::warn!(phase = name, step = index, "Phase halted during leg");
                        return PhaseOutcome::Halted;
                    }
                }
            },
            RouteStep::Turn { degrees } => {
                let Some(grant) = drivetrain.acquire_blocking(Owner::WallFollower, mission) else {
                    tracing::warn!(phase = name, step = index, "Phase halted before turn");
                    return PhaseOutcome::Halted;
                };
                let ok = rotate_in_place(&grant, drive, degrees);
                drop(grant);
                if !ok && mission.is_halted() {
                    return PhaseOutcome::Halted;
                }
                tracing::debug!(phase = name, step = index, degrees, "Turn complete");
            }
        }

        if mission.is_halted() {
            return PhaseOutcome::Halted;
        }
    }

    tracing::info!(phase = name, "Phase completed");
    PhaseOutcome::Completed
}
