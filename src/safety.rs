//! Safety interlock: the unconditional override.
//!
//! Runs for the whole mission as its own polling thread. On an asserted
//! emergency input it marks the mission `Halted`, zeroes the drive motors by
//! force-releasing the drivetrain token, and zeroes the suppression
//! actuator. Every other component observes the halt cooperatively at its
//! next tick; this thread is the only place that transition is made from
//! outside the phase sequence.

use crate::drivetrain::Drivetrain;
use crate::hardware::{EmergencyInput, Suppressor};
use crate::shared::MissionState;

use std::sync::Arc;
use std::time::Duration;

pub struct SafetyInterlock {
    mission: Arc<MissionState>,
    drivetrain: Arc<Drivetrain>,
    emergency: Arc<dyn EmergencyInput>,
    suppressor: Arc<dyn Suppressor>,
    poll: Duration,
}

impl SafetyInterlock {
    pub fn new(
        mission: Arc<MissionState>,
        drivetrain: Arc<Drivetrain>,
        emergency: Arc<dyn EmergencyInput>,
        suppressor: Arc<dyn Suppressor>,
        poll: Duration,
    ) -> Self {
        Self {
            mission,
            drivetrain,
            emergency,
            suppressor,
            poll,
        }
    }

    /// Poll the emergency input until it trips or the mission ends.
    pub fn run(&self) {
        tracing::info!("Safety interlock armed");

        loop {
            if self.mission.should_shutdown() {
                tracing::info!("Safety interlock disarmed");
                return;
            }

            if self.emergency.is_tripped() {
                tracing::error!("Emergency stop asserted; halting all actuation");
                self.mission.halt("emergency stop asserted");
                // Zero actuators synchronously; task loops catch up within
                // one tick via the mission state.
                self.drivetrain.force_release();
                self.suppressor.set_power(0);
                return;
            }

            std::thread::sleep(self.poll);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivetrain::Owner;
    use crate::hardware::sim::{RecordingMotors, RecordingSuppressor, SwitchEmergency};

    const POLL: Duration = Duration::from_millis(1);

    #[test]
    fn trip_halts_and_zeroes_all_actuators() {
        let motors = Arc::new(RecordingMotors::new());
        let drivetrain = Arc::new(Drivetrain::new(Arc::clone(&motors) as _));
        let mission = Arc::new(MissionState::new(2));
        let emergency = Arc::new(SwitchEmergency::new());
        let suppressor = Arc::new(RecordingSuppressor::new());

        // Something is driving when the trip happens.
        let grant = drivetrain.try_acquire(Owner::WallFollower).unwrap();
        grant.set_power(20, 20);

        let interlock = SafetyInterlock::new(
            Arc::clone(&mission),
            Arc::clone(&drivetrain),
            Arc::clone(&emergency) as _,
            Arc::clone(&suppressor) as _,
            POLL,
        );

        emergency.trip();
        interlock.run();

        assert!(mission.is_halted());
        assert_eq!(mission.halt_reason().as_deref(), Some("emergency stop asserted"));
        assert_eq!(motors.last(), (0, 0));
        assert_eq!(suppressor.last(), 0);
        assert!(!grant.set_power(20, 20), "holder must be revoked");
    }

    #[test]
    fn shutdown_disarms_without_halting() {
        let motors = Arc::new(RecordingMotors::new());
        let drivetrain = Arc::new(Drivetrain::new(Arc::clone(&motors) as _));
        let mission = Arc::new(MissionState::new(2));

        let interlock = SafetyInterlock::new(
            Arc::clone(&mission),
            drivetrain,
            Arc::new(SwitchEmergency::new()) as _,
            Arc::new(RecordingSuppressor::new()) as _,
            POLL,
        );

        mission.signal_shutdown();
        interlock.run();
        assert!(!mission.is_halted());
    }
}
