//! Sweep controller thread: triangle-wave rotation of the sensor head.
//!
//! The head walks between the configured bounds one step per tick and
//! reverses at each bound rather than snapping back, so no travel is
//! wasted. While the responder is handling a marker the head holds its
//! last commanded angle. The sweep never touches the drivetrain.

use crate::config::SweepConfig;
use crate::hardware::SensorHead;
use crate::shared::{MissionPhase, MissionState};

use std::sync::Arc;
use std::time::Duration;

/// Advance one sweep step, reversing at the bounds.
/// Returns the new angle and direction.
pub fn next_angle(current: f32, direction: f32, config: &SweepConfig) -> (f32, f32) {
    let mut angle = current + direction * config.step_deg;
    let mut direction = direction;
    if angle >= config.max_deg {
        angle = config.max_deg;
        direction = -1.0;
    } else if angle <= config.min_deg {
        angle = config.min_deg;
        direction = 1.0;
    }
    (angle, direction)
}

pub struct SweepController {
    mission: Arc<MissionState>,
    head: Arc<dyn SensorHead>,
    config: SweepConfig,
}

impl SweepController {
    pub fn new(mission: Arc<MissionState>, head: Arc<dyn SensorHead>, config: SweepConfig) -> Self {
        Self {
            mission,
            head,
            config,
        }
    }

    /// Run the sweep loop until the interior phase ends, the fire target is
    /// reached, or the mission halts.
    pub fn run(&self) {
        let tick = Duration::from_millis(self.config.tick_ms);
        let mut angle = self.config.min_deg;
        let mut direction = 1.0;

        tracing::info!(
            min = self.config.min_deg,
            max = self.config.max_deg,
            step = self.config.step_deg,
            "Sweep started"
        );

        self.head.set_angle(angle, self.config.head_speed);
        self.mission.set_head_angle(angle);

        loop {
            if self.mission.is_halted() || self.mission.phase() != MissionPhase::Interior {
                break;
            }
            if self.mission.fire_target_reached() {
                tracing::info!("Sweep finished: fire target reached");
                break;
            }

            // Hold position while a marker is being handled; the responder
            // owns the head during its maneuver.
            if self.mission.is_marker_handling() {
                std::thread::sleep(tick);
                continue;
            }

            (angle, direction) = next_angle(angle, direction, &self.config);
            self.head.set_angle(angle, self.config.head_speed);
            self.mission.set_head_angle(angle);
            std::thread::sleep(tick);
        }

        tracing::info!("Sweep exited");
    }
}
