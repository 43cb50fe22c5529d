//! Interior navigation thread: drives the interior patrol route while the
//! sweep and responder run beside it.

use crate::config::{DriveConfig, MissionConfig};
use crate::drivetrain::Drivetrain;
use crate::hardware::DistanceSensors;
use crate::sequencer::{self, PhaseOutcome, RouteStep};
use crate::shared::MissionState;

use std::sync::Arc;

pub struct InteriorNavigation {
    mission: Arc<MissionState>,
    drivetrain: Arc<Drivetrain>,
    sensors: Arc<dyn DistanceSensors>,
    route: Vec<RouteStep>,
    drive: DriveConfig,
}

impl InteriorNavigation {
    pub fn new(
        mission: Arc<MissionState>,
        drivetrain: Arc<Drivetrain>,
        sensors: Arc<dyn DistanceSensors>,
        drive: DriveConfig,
        config: &MissionConfig,
    ) -> Self {
        let route = sequencer::build_route(&drive, &config.interior);
        Self {
            mission,
            drivetrain,
            sensors,
            route,
            drive,
        }
    }

    /// Traverse the interior route once.
    pub fn run(&self) -> PhaseOutcome {
        sequencer::run_phase(
            "interior",
            &self.route,
            &self.drivetrain,
            &*self.sensors,
            &self.mission,
            &self.drive,
        )
    }
}
