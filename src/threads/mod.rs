//! Interior-phase worker threads and their lifecycle.
//!
//! The interior phase runs three cooperating loops at once: the navigation
//! sequencer on the patrol route, the sensor-head sweep, and the marker
//! responder. They are spawned together, report their outcomes over a
//! bounded channel, and are joined together at the end of the phase.

pub mod navigation;
pub mod responder;
pub mod sweep;

use crate::config::AgniConfig;
use crate::drivetrain::Drivetrain;
use crate::error::{AgniError, Result};
use crate::hardware::HardwareRig;
use crate::sequencer::PhaseOutcome;
use crate::shared::MissionState;

use navigation::InteriorNavigation;
use responder::{MarkerResponder, ResponderOutcome};
use sweep::SweepController;

use crossbeam_channel::{Receiver, bounded};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Outcome report from one interior worker.
#[derive(Debug, Clone, Copy)]
pub struct TaskReport {
    pub task: &'static str,
    pub outcome: PhaseOutcome,
}

/// Join handles plus the report channel for the interior workers.
pub struct InteriorHandles {
    pub navigation: JoinHandle<()>,
    pub sweep: JoinHandle<()>,
    pub responder: JoinHandle<()>,
    pub reports: Receiver<TaskReport>,
}

impl InteriorHandles {
    /// Wait for all three workers and collect their reports.
    pub fn join(self) -> Result<Vec<TaskReport>> {
        for (name, handle) in [
            ("navigation", self.navigation),
            ("sweep", self.sweep),
            ("responder", self.responder),
        ] {
            handle
                .join()
                .map_err(|_| AgniError::Thread(format!("{name} thread panicked")))?;
        }
        Ok(self.reports.try_iter().collect())
    }
}

/// Spawn the three interior workers as named threads.
pub fn spawn_interior(
    config: &AgniConfig,
    mission: &Arc<MissionState>,
    drivetrain: &Arc<Drivetrain>,
    rig: &HardwareRig,
) -> Result<InteriorHandles> {
    let (tx, rx) = bounded::<TaskReport>(3);

    let navigation = {
        let worker = InteriorNavigation::new(
            Arc::clone(mission),
            Arc::clone(drivetrain),
            Arc::clone(&rig.distance),
            config.drive.clone(),
            &config.mission,
        );
        let tx = tx.clone();
        spawn_named("interior-nav", move || {
            let outcome = worker.run();
            let _ = tx.send(TaskReport {
                task: "navigation",
                outcome,
            });
        })?
    };

    let sweep = {
        let worker = SweepController::new(
            Arc::clone(mission),
            Arc::clone(&rig.head),
            config.sweep.clone(),
        );
        let mission = Arc::clone(mission);
        let tx = tx.clone();
        spawn_named("head-sweep", move || {
            worker.run();
            let outcome = if mission.is_halted() {
                PhaseOutcome::Halted
            } else {
                PhaseOutcome::Completed
            };
            let _ = tx.send(TaskReport {
                task: "sweep",
                outcome,
            });
        })?
    };

    let responder = {
        let worker = MarkerResponder::new(
            Arc::clone(mission),
            Arc::clone(drivetrain),
            Arc::clone(&rig.marker),
            Arc::clone(&rig.head),
            Arc::clone(&rig.suppressor),
            config.drive.clone(),
            config.responder.clone(),
        );
        spawn_named("marker-responder", move || {
            let outcome = match worker.run() {
                ResponderOutcome::Done => PhaseOutcome::Completed,
                ResponderOutcome::Halted => PhaseOutcome::Halted,
            };
            let _ = tx.send(TaskReport {
                task: "responder",
                outcome,
            });
        })?
    };

    Ok(InteriorHandles {
        navigation,
        sweep,
        responder,
        reports: rx,
    })
}

fn spawn_named<F>(name: &str, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|e| AgniError::Thread(format!("failed to spawn {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DriveConfig, MissionConfig, ResponderConfig, RouteStepConfig, SweepConfig};
    use crate::hardware::sim::{
        LogSiren, RecordingHead, RecordingMotors, RecordingSuppressor, ScriptedDistance,
        ScriptedMarkers, SwitchEmergency,
    };
    use crate::hardware::MarkerClass;
    use crate::shared::MissionPhase;

    fn fast_config() -> AgniConfig {
        let mut config = AgniConfig::default();
        config.drive = DriveConfig {
            tick_ms: 1,
            turn_90_ms: 1,
            leg_max_ticks: 50,
            ..DriveConfig::default()
        };
        config.sweep = SweepConfig {
            tick_ms: 1,
            ..SweepConfig::default()
        };
        config.responder = ResponderConfig {
            tick_ms: 1,
            cooldown_ms: 2,
            pulse_ms: 1,
            backoff_ms: 1,
            ..ResponderConfig::default()
        };
        config.mission = MissionConfig {
            fire_target: 1,
            interior: vec![RouteStepConfig::Leg {
                side_cm: 30.0,
                front_cm: 31.0,
            }],
            ..MissionConfig::default()
        };
        config
    }

    fn test_rig(markers: Vec<MarkerClass>) -> HardwareRig {
        let distance = Arc::new(ScriptedDistance::new());
        distance.set_front_fallback(Some(10.0));
        distance.set_side_fallback(Some(30.0));
        HardwareRig {
            distance,
            marker: Arc::new(ScriptedMarkers::new(markers)),
            motors: Arc::new(RecordingMotors::new()),
            head: Arc::new(RecordingHead::new()),
            suppressor: Arc::new(RecordingSuppressor::new()),
            emergency: Arc::new(SwitchEmergency::new()),
            siren: Arc::new(LogSiren),
        }
    }

    #[test]
    fn interior_workers_all_report_completed() {
        let config = fast_config();
        let rig = test_rig(vec![MarkerClass::Fire]);
        let mission = Arc::new(MissionState::new(config.mission.fire_target));
        mission.advance_phase(MissionPhase::Interior);
        mission.set_head_angle(65.0);
        let drivetrain = Arc::new(Drivetrain::new(Arc::clone(&rig.motors)));

        let handles = spawn_interior(&config, &mission, &drivetrain, &rig).unwrap();
        let reports = handles.join().unwrap();

        assert_eq!(reports.len(), 3);
        assert!(
            reports
                .iter()
                .all(|report| report.outcome == PhaseOutcome::Completed),
            "reports: {reports:?}"
        );
        assert_eq!(mission.fires_suppressed(), 1);
    }

    #[test]
    fn halt_propagates_to_every_worker() {
        let config = fast_config();
        let rig = test_rig(vec![]);
        let mission = Arc::new(MissionState::new(config.mission.fire_target));
        mission.advance_phase(MissionPhase::Interior);
        let drivetrain = Arc::new(Drivetrain::new(Arc::clone(&rig.motors)));

        let handles = spawn_interior(&config, &mission, &drivetrain, &rig).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        mission.halt("tripped");
        let reports = handles.join().unwrap();

        assert_eq!(reports.len(), 3);
        assert!(
            reports
                .iter()
                .any(|report| report.outcome == PhaseOutcome::Halted)
        );
    }
}
