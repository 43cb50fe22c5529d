//! Wall-following driver: one waypoint leg per invocation.
//!
//! A leg drives forward holding a reference side distance until the front
//! distance drops to the leg's stop threshold. Steering is a deterministic
//! three-way bang-bang law on the side-distance error, not a tuned PID:
//! inside the tolerance band both wheels get equal power, outside it the
//! inner wheel is slowed by the leg's correction offset.

use crate::config::DriveConfig;
use crate::drivetrain::{Drivetrain, Owner};
use crate::hardware::DistanceSensors;
use crate::shared::MissionState;

use std::time::Duration;

/// One immutable waypoint leg. Created by the sequencer, executed once.
#[derive(Debug, Clone, Copy)]
pub struct Leg {
    /// Forward drive power
    pub power: i32,
    /// Side-distance reference to hold (cm)
    pub target_side_cm: f32,
    /// Front-distance stop threshold (cm)
    pub target_front_cm: f32,
    /// Power taken off the inner wheel when correcting
    pub correction_offset: i32,
    /// Tolerance band around the side reference (cm)
    pub tolerance_cm: f32,
    /// Tick bound; on expiry the leg completes anyway
    pub max_ticks: u32,
}

impl Leg {
    /// Build a leg from the drive configuration plus per-leg targets.
    pub fn from_config(drive: &DriveConfig, side_cm: f32, front_cm: f32) -> Self {
        Self {
            power: drive.power,
            target_side_cm: side_cm,
            target_front_cm: front_cm,
            correction_offset: drive.correction_offset,
            tolerance_cm: drive.tolerance_cm,
            max_ticks: drive.leg_max_ticks,
        }
    }
}

/// How a leg ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegOutcome {
    /// Front threshold reached (or tick bound expired)
    Completed,
    /// Released the drivetrain for the marker responder; re-issue the leg
    Preempted,
    /// Mission halted; no further actuation
    Halted,
}

/// Steering decision for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// In band or invalid reading: equal power
    Straight,
    /// Too far from the wall: slow the wall-side wheel
    TowardWall,
    /// Too close to the wall: slow the outer wheel
    AwayFromWall,
}

/// Tri-state correction law. Invalid readings never correct.
pub fn correction(side_cm: Option<f32>, target_cm: f32, tolerance_cm: f32) -> Correction {
    match side_cm {
        Some(side) if side > target_cm + tolerance_cm => Correction::TowardWall,
        Some(side) if side < target_cm - tolerance_cm => Correction::AwayFromWall,
        _ => Correction::Straight,
    }
}

impl Correction {
    /// Wheel power pair for this decision. The side sensor faces the left
    /// wall, so steering toward it slows the left wheel.
    pub fn wheel_powers(self, power: i32, offset: i32) -> (i32, i32) {
        match self {
            Correction::Straight => (power, power),
            Correction::TowardWall => (power - offset, power),
            Correction::AwayFromWall => (power, power - offset),
        }
    }
}

/// Drive one leg to completion, preemption, or halt.
///
/// Blocks until the drivetrain is available, then runs fixed-period ticks.
/// The side distance is sampled fresh every tick, so a re-issued leg never
/// resumes from stale state.
pub fn run_leg(
    leg: &Leg,
    drivetrain: &Drivetrain,
    sensors: &dyn DistanceSensors,
    mission: &MissionState,
    tick: Duration,
) -> LegOutcome {
    let Some(grant) = drivetrain.acquire_blocking(Owner::WallFollower, mission) else {
        return LegOutcome::Halted;
    };

    tracing::debug!(
        side = leg.target_side_cm,
        front = leg.target_front_cm,
        "Leg started"
    );

    for tick_no in 0..leg.max_ticks {
        if mission.is_halted() {
            grant.stop();
            return LegOutcome::Halted;
        }

        // The responder signals its need for the drivetrain through the
        // marker-handling flag; yield and let the sequencer re-issue us.
        if mission.is_marker_handling() {
            drop(grant);
            tracing::debug!(tick = tick_no, "Leg preempted for marker handling");
            return LegOutcome::Preempted;
        }

        if let Some(front) = sensors.front_cm()
            && front <= leg.target_front_cm
        {
            grant.stop();
            tracing::info!(front_cm = front, ticks = tick_no, "Leg completed");
            return LegOutcome::Completed;
        }

        let correction = correction(sensors.side_cm(), leg.target_side_cm, leg.tolerance_cm);
        let (left, right) = correction.wheel_powers(leg.power, leg.correction_offset);
        if !grant.set_power(left, right) {
            // Revoked mid-leg; only the safety interlock does that.
            return if mission.is_halted() {
                LegOutcome::Halted
            } else {
                LegOutcome::Preempted
            };
        }

        std::thread::sleep(tick);
    }

    // Stop condition never seen: assume the goal is unreachable or already
    // passed and let the mission continue.
    grant.stop();
    tracing::warn!(
        ticks = leg.max_ticks,
        front = leg.target_front_cm,
        "Leg tick bound expired; treating as complete"
    );
    LegOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::{RecordingMotors, ScriptedDistance};
    use std::sync::Arc;

    const TICK: Duration = Duration::from_millis(1);

    fn rig() -> (Arc<Drivetrain>, Arc<RecordingMotors>, Arc<MissionState>) {
        let motors = Arc::new(RecordingMotors::new());
        let drivetrain = Arc::new(Drivetrain::new(Arc::clone(&motors) as _));
        let mission = Arc::new(MissionState::new(2));
        (drivetrain, motors, mission)
    }

    fn test_leg(side: f32, front: f32) -> Leg {
        Leg {
            power: 20,
            target_side_cm: side,
            target_front_cm: front,
            correction_offset: 5,
            tolerance_cm: 0.3,
            max_ticks: 50,
        }
    }

    #[test]
    fn correction_law_is_tri_state() {
        // Strictly inside the band: always straight.
        assert_eq!(correction(Some(10.0), 10.0, 0.3), Correction::Straight);
        assert_eq!(correction(Some(10.29), 10.0, 0.3), Correction::Straight);
        assert_eq!(correction(Some(9.71), 10.0, 0.3), Correction::Straight);

        // Above the band: toward the wall, never the reverse bias.
        assert_eq!(correction(Some(10.4), 10.0, 0.3), Correction::TowardWall);
        assert_eq!(correction(Some(50.0), 10.0, 0.3), Correction::TowardWall);

        // Below the band: away from the wall.
        assert_eq!(correction(Some(9.6), 10.0, 0.3), Correction::AwayFromWall);
        assert_eq!(correction(Some(0.0), 10.0, 0.3), Correction::AwayFromWall);

        // Invalid readings never correct.
        assert_eq!(correction(None, 10.0, 0.3), Correction::Straight);
    }

    #[test]
    fn wheel_powers_bias_the_documented_wheel() {
        assert_eq!(Correction::Straight.wheel_powers(20, 5), (20, 20));
        assert_eq!(Correction::TowardWall.wheel_powers(20, 5), (15, 20));
        assert_eq!(Correction::AwayFromWall.wheel_powers(20, 5), (20, 15));
    }

    #[test]
    fn leg_stops_exactly_at_front_threshold() {
        let (drivetrain, motors, mission) = rig();
        let sensors = ScriptedDistance::new();
        sensors.push_fronts([80.0, 70.0, 60.0, 50.0, 40.0, 30.0].map(Some));
        sensors.set_side_fallback(Some(8.0));

        let leg = test_leg(8.0, 33.0);
        let outcome = run_leg(&leg, &drivetrain, &sensors, &mission, TICK);

        assert_eq!(outcome, LegOutcome::Completed);
        assert_eq!(motors.last(), (0, 0));
        // Five driving ticks (80..40), then the 30 cm reading stops the leg
        // before any further power command.
        let driven = motors
            .history()
            .iter()
            .filter(|pair| **pair != (0, 0))
            .count();
        assert_eq!(driven, 5);
    }

    #[test]
    fn invalid_front_reading_does_not_stop() {
        let (drivetrain, _motors, mission) = rig();
        let sensors = ScriptedDistance::new();
        sensors.push_fronts([None, None, Some(30.0)]);
        sensors.set_side_fallback(Some(8.0));

        let leg = test_leg(8.0, 33.0);
        assert_eq!(
            run_leg(&leg, &drivetrain, &sensors, &mission, TICK),
            LegOutcome::Completed
        );
    }

    #[test]
    fn tick_bound_expiry_completes_the_leg() {
        let (drivetrain, motors, mission) = rig();
        let sensors = ScriptedDistance::new();
        sensors.set_front_fallback(Some(100.0));
        sensors.set_side_fallback(Some(8.0));

        let mut leg = test_leg(8.0, 33.0);
        leg.max_ticks = 3;
        assert_eq!(
            run_leg(&leg, &drivetrain, &sensors, &mission, TICK),
            LegOutcome::Completed
        );
        assert_eq!(motors.last(), (0, 0));
    }

    #[test]
    fn marker_handling_preempts_and_frees_the_token() {
        let (drivetrain, motors, mission) = rig();
        let sensors = ScriptedDistance::new();
        sensors.set_front_fallback(Some(100.0));
        sensors.set_side_fallback(Some(8.0));

        mission.set_marker_handling(true);
        let leg = test_leg(8.0, 33.0);
        let outcome = run_leg(&leg, &drivetrain, &sensors, &mission, TICK);

        assert_eq!(outcome, LegOutcome::Preempted);
        assert_eq!(motors.last(), (0, 0));
        assert!(drivetrain.holder().is_none(), "token must be free");
    }

    #[test]
    fn emergency_trip_mid_leg_halts_with_zero_power() {
        let (drivetrain, motors, mission) = rig();
        let sensors = Arc::new(ScriptedDistance::new());
        sensors.set_front_fallback(Some(100.0));
        sensors.set_side_fallback(Some(8.0));

        let leg = test_leg(8.0, 33.0);
        let handle = {
            let drivetrain = Arc::clone(&drivetrain);
            let sensors = Arc::clone(&sensors);
            let mission = Arc::clone(&mission);
            std::thread::spawn(move || run_leg(&leg, &drivetrain, &*sensors, &mission, TICK))
        };

        std::thread::sleep(Duration::from_millis(10));
        mission.halt("emergency stop pressed");
        assert_eq!(handle.join().unwrap(), LegOutcome::Halted);
        assert_eq!(motors.last(), (0, 0));
    }

    #[test]
    fn halted_mission_refuses_the_leg() {
        let (drivetrain, _motors, mission) = rig();
        let sensors = ScriptedDistance::new();
        mission.halt("tripped before start");

        let leg = test_leg(8.0, 33.0);
        assert_eq!(
            run_leg(&leg, &drivetrain, &sensors, &mission, TICK),
            LegOutcome::Halted
        );
    }
}
