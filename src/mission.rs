//! Mission coordinator: the top-level phase sequence.
//!
//! Owns the phase transitions `Approach -> Interior -> Return` and the
//! lifecycles around them: the safety interlock runs for the whole mission,
//! the siren sounds only during the approach, and the interior workers are
//! spawned and joined at the phase boundaries. A halt in any phase skips the
//! remaining phases but still tears everything down in order.

use crate::config::AgniConfig;
use crate::drivetrain::Drivetrain;
use crate::error::{AgniError, Result};
use crate::hardware::HardwareRig;
use crate::safety::SafetyInterlock;
use crate::sequencer::{self, PhaseOutcome};
use crate::shared::{MissionPhase, MissionState};
use crate::threads;

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Final mission result reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionOutcome {
    Completed {
        fires_suppressed: u32,
        elapsed: Duration,
    },
    Halted {
        reason: String,
    },
}

pub struct MissionCoordinator {
    config: AgniConfig,
    mission: Arc<MissionState>,
    drivetrain: Arc<Drivetrain>,
    rig: HardwareRig,
}

impl MissionCoordinator {
    pub fn new(
        config: AgniConfig,
        mission: Arc<MissionState>,
        drivetrain: Arc<Drivetrain>,
        rig: HardwareRig,
    ) -> Self {
        Self {
            config,
            mission,
            drivetrain,
            rig,
        }
    }

    /// Run the mission from start to finish.
    pub fn run(&self) -> Result<MissionOutcome> {
        let start = Instant::now();

        let interlock = SafetyInterlock::new(
            Arc::clone(&self.mission),
            Arc::clone(&self.drivetrain),
            Arc::clone(&self.rig.emergency),
            Arc::clone(&self.rig.suppressor),
            Duration::from_millis(self.config.mission.interlock_poll_ms),
        );
        let safety = std::thread::Builder::new()
            .name("safety-interlock".to_string())
            .spawn(move || interlock.run())
            .map_err(|e| AgniError::Thread(format!("failed to spawn safety interlock: {e}")))?;

        // Approach: siren sounding, single wall-following route.
        self.rig.siren.start();
        let approach = self.run_route("approach", &self.config.mission.approach);
        self.rig.siren.stop();

        if approach == PhaseOutcome::Completed {
            self.mission.advance_phase(MissionPhase::Interior);
            self.run_interior()?;
        }

        if !self.mission.is_halted() {
            self.mission.advance_phase(MissionPhase::Return);
            self.run_route("return", &self.config.mission.return_route);
        }

        // Mission over one way or the other; disarm the interlock.
        self.mission.signal_shutdown();
        safety
            .join()
            .map_err(|_| AgniError::Thread("safety interlock thread panicked".into()))?;

        let elapsed = start.elapsed();
        let budget = Duration::from_secs(self.config.mission.time_budget_secs);
        if elapsed > budget {
            tracing::warn!(
                elapsed_secs = elapsed.as_secs(),
                budget_secs = budget.as_secs(),
                "Mission exceeded its time budget"
            );
        }

        Ok(match self.mission.halt_reason() {
            Some(reason) => MissionOutcome::Halted { reason },
            None => MissionOutcome::Completed {
                fires_suppressed: self.mission.fires_suppressed(),
                elapsed,
            },
        })
    }

    fn run_route(&self, name: &str, steps: &[crate::config::RouteStepConfig]) -> PhaseOutcome {
        let route = sequencer::build_route(&self.config.drive, steps);
        sequencer::run_phase(
            name,
            &route,
            &self.drivetrain,
            &*self.rig.distance,
            &self.mission,
            &self.config.drive,
        )
    }

    /// Interior phase: navigation, sweep and responder run concurrently
    /// until all three report back.
    fn run_interior(&self) -> Result<()> {
        let handles =
            threads::spawn_interior(&self.config, &self.mission, &self.drivetrain, &self.rig)?;
        let reports = handles.join()?;
        for report in &reports {
            tracing::info!(task = report.task, outcome = ?report.outcome, "Interior task finished");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DriveConfig, MissionConfig, ResponderConfig, RouteStepConfig, SweepConfig};
    use crate::hardware::MarkerClass;
    use crate::hardware::sim::{
        LogSiren, RecordingHead, RecordingMotors, RecordingSuppressor, ScriptedDistance,
        ScriptedMarkers, SwitchEmergency,
    };

    fn fast_config() -> AgniConfig {
        let mut config = AgniConfig::default();
        config.drive = DriveConfig {
            tick_ms: 1,
            turn_90_ms: 1,
            leg_max_ticks: 50,
            ..DriveConfig::default()
        };
        config.sweep.tick_ms = 1;
        config.responder = ResponderConfig {
            tick_ms: 1,
            cooldown_ms: 2,
            pulse_ms: 1,
            backoff_ms: 1,
            ..ResponderConfig::default()
        };
        config.mission = MissionConfig {
            fire_target: 1,
            interlock_poll_ms: 1,
            approach: vec![RouteStepConfig::Leg {
                side_cm: 8.0,
                front_cm: 57.0,
            }],
            interior: vec![RouteStepConfig::Leg {
                side_cm: 30.0,
                front_cm: 31.0,
            }],
            return_route: vec![RouteStepConfig::Leg {
                side_cm: 27.0,
                front_cm: 57.0,
            }],
            ..MissionConfig::default()
        };
        config
    }

    struct TestRig {
        rig: HardwareRig,
        emergency: Arc<SwitchEmergency>,
        suppressor: Arc<RecordingSuppressor>,
    }

    fn test_rig(markers: Vec<MarkerClass>) -> TestRig {
        let distance = Arc::new(ScriptedDistance::new());
        distance.set_front_fallback(Some(10.0));
        distance.set_side_fallback(Some(30.0));
        let emergency = Arc::new(SwitchEmergency::new());
        let suppressor = Arc::new(RecordingSuppressor::new());
        let rig = HardwareRig {
            distance,
            marker: Arc::new(ScriptedMarkers::new(markers)),
            motors: Arc::new(RecordingMotors::new()),
            head: Arc::new(RecordingHead::new()),
            suppressor: Arc::clone(&suppressor) as _,
            emergency: Arc::clone(&emergency) as _,
            siren: Arc::new(LogSiren),
        };
        TestRig {
            rig,
            emergency,
            suppressor,
        }
    }

    fn coordinator(config: AgniConfig, rig: &HardwareRig) -> MissionCoordinator {
        let mission = Arc::new(MissionState::new(config.mission.fire_target));
        let drivetrain = Arc::new(Drivetrain::new(Arc::clone(&rig.motors)));
        MissionCoordinator::new(config, mission, drivetrain, rig.clone())
    }

    #[test]
    fn full_mission_completes_with_fires_suppressed() {
        let test = test_rig(vec![MarkerClass::Fire]);
        let coordinator = coordinator(fast_config(), &test.rig);

        match coordinator.run().unwrap() {
            MissionOutcome::Completed {
                fires_suppressed, ..
            } => assert_eq!(fires_suppressed, 1),
            MissionOutcome::Halted { reason } => panic!("halted: {reason}"),
        }
        assert_eq!(test.suppressor.pulse_count(), 1);
    }

    #[test]
    fn pre_tripped_emergency_halts_before_any_phase_completes() {
        let test = test_rig(vec![]);
        test.emergency.trip();
        let coordinator = coordinator(fast_config(), &test.rig);

        match coordinator.run().unwrap() {
            MissionOutcome::Halted { reason } => {
                assert_eq!(reason, "emergency stop asserted");
            }
            MissionOutcome::Completed { .. } => panic!("expected a halt"),
        }
        assert_eq!(test.suppressor.pulse_count(), 0);
    }
}
