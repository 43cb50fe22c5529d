//! Marker responder thread: classify, preempt, maneuver, release.
//!
//! State machine: `Scanning -> Detected -> Handling -> Cooldown -> Scanning`,
//! terminal `Done` when the fire target is reached and `Halted` on an
//! emergency trip from any state. A marker event is consumed at most once
//! and handled to completion before scanning resumes; while the
//! marker-handling flag is up the sweep holds and the wall follower yields
//! the drivetrain.

use crate::config::{DriveConfig, ResponderConfig};
use crate::drivetrain::{DriveGrant, Drivetrain, Owner};
use crate::hardware::{MarkerClass, MarkerSensor, SensorHead, Suppressor};
use crate::maneuver::{
    MarkerEvent, drive_for, fire_band, obstacle_turn_degrees, pulse_suppressor, rotate_in_place,
};
use crate::shared::{MissionPhase, MissionState};

use std::sync::Arc;
use std::time::Duration;

/// Terminal states of the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderOutcome {
    /// Fire target reached
    Done,
    /// Emergency trip observed; no maneuver was completed after it
    Halted,
}

/// A maneuver aborted because the grant was revoked or the mission halted.
struct Aborted;

pub struct MarkerResponder {
    mission: Arc<MissionState>,
    drivetrain: Arc<Drivetrain>,
    marker: Arc<dyn MarkerSensor>,
    head: Arc<dyn SensorHead>,
    suppressor: Arc<dyn Suppressor>,
    drive: DriveConfig,
    config: ResponderConfig,
}

impl MarkerResponder {
    pub fn new(
        mission: Arc<MissionState>,
        drivetrain: Arc<Drivetrain>,
        marker: Arc<dyn MarkerSensor>,
        head: Arc<dyn SensorHead>,
        suppressor: Arc<dyn Suppressor>,
        drive: DriveConfig,
        config: ResponderConfig,
    ) -> Self {
        Self {
            mission,
            drivetrain,
            marker,
            head,
            suppressor,
            drive,
            config,
        }
    }

    /// Run the responder until done or halted.
    pub fn run(&self) -> ResponderOutcome {
        let tick = Duration::from_millis(self.config.tick_ms);
        tracing::info!("Responder scanning");

        loop {
            // Scanning
            if self.mission.is_halted() {
                return self.halted("scanning");
            }
            if self.mission.fire_target_reached() {
                tracing::info!("Responder done: fire target reached");
                return ResponderOutcome::Done;
            }
            if self.mission.phase() != MissionPhase::Interior {
                tracing::info!("Responder done: interior phase over");
                return ResponderOutcome::Done;
            }

            let event = match self.marker.read_class() {
                MarkerClass::Fire => MarkerEvent {
                    class: MarkerClass::Fire,
                    angle_deg: self.mission.head_angle(),
                },
                MarkerClass::Obstacle => MarkerEvent {
                    class: MarkerClass::Obstacle,
                    angle_deg: self.mission.head_angle(),
                },
                // Unknown classifier codes are indistinguishable from clear.
                MarkerClass::None | MarkerClass::Unknown => {
                    std::thread::sleep(tick);
                    continue;
                }
            };

            // Scanning -> Detected
            tracing::info!(
                class = ?event.class,
                angle = event.angle_deg,
                "Marker detected"
            );

            // Detected -> Handling: suspend the sweep, take the drivetrain.
            self.mission.set_marker_handling(true);
            let handled = self.handle(event);
            self.mission.set_marker_handling(false);

            if handled.is_err() {
                return self.halted("handling");
            }

            // Handling -> Cooldown: let the sweep resume and avoid
            // re-detecting the marker we just dealt with.
            tracing::debug!("Responder cooling down");
            std::thread::sleep(Duration::from_millis(self.config.cooldown_ms));
        }
    }

    fn halted(&self, state: &'static str) -> ResponderOutcome {
        tracing::warn!(state, "Responder halted");
        ResponderOutcome::Halted
    }

    /// Execute the maneuver for one event while holding the drivetrain.
    fn handle(&self, event: MarkerEvent) -> Result<(), Aborted> {
        // Blocks until the wall follower yields; a trip during the wait
        // aborts before any actuation. Suppression never follows a trip.
        let Some(grant) = self.drivetrain.acquire_blocking(Owner::Responder, &self.mission) else {
            return Err(Aborted);
        };
        grant.stop();

        match event.class {
            MarkerClass::Fire => self.suppress(&grant, event.angle_deg)?,
            MarkerClass::Obstacle => self.avoid(&grant, event.angle_deg)?,
            MarkerClass::None | MarkerClass::Unknown => {}
        }

        Ok(())
    }

    /// Fire maneuver: stow the head, apply the band's reposition and
    /// pre-rotation, pulse the suppressor, undo the rotation.
    fn suppress(&self, grant: &DriveGrant<'_>, angle_deg: f32) -> Result<(), Aborted> {
        self.head
            .set_angle(self.config.fire_stow_deg, self.drive.turn_power);

        let band = fire_band(angle_deg);
        tracing::info!(
            angle = angle_deg,
            band_min = band.min_deg,
            band_max = band.max_deg,
            pre_rotate = band.pre_rotate_deg,
            "Suppression maneuver selected"
        );

        if band.advance_ms > 0 {
            self.step(drive_for(
                grant,
                self.config.advance_power,
                Duration::from_millis(band.advance_ms),
            ))?;
        }
        self.step(rotate_in_place(grant, &self.drive, band.pre_rotate_deg))?;

        pulse_suppressor(
            &*self.suppressor,
            self.config.suppressor_power,
            Duration::from_millis(self.config.pulse_ms),
        );

        self.step(rotate_in_place(grant, &self.drive, -band.pre_rotate_deg))?;

        if self.mission.record_fire_suppressed() {
            tracing::info!(
                suppressed = self.mission.fires_suppressed(),
                target = self.mission.fire_target(),
                "Fire suppressed"
            );
        }
        Ok(())
    }

    /// Obstacle maneuver: stow the head, back off, route around the marker
    /// without re-triggering on it.
    fn avoid(&self, grant: &DriveGrant<'_>, angle_deg: f32) -> Result<(), Aborted> {
        self.head
            .set_angle(self.config.obstacle_stow_deg, self.drive.turn_power);

        let turn = obstacle_turn_degrees(angle_deg, self.config.obstacle_midpoint_deg);
        tracing::info!(angle = angle_deg, turn, "Avoidance maneuver selected");

        let backoff = Duration::from_millis(self.config.backoff_ms);
        self.step(drive_for(grant, -self.config.advance_power, backoff))?;
        self.step(rotate_in_place(grant, &self.drive, turn))?;
        self.step(drive_for(grant, self.config.advance_power, backoff))?;
        self.step(rotate_in_place(grant, &self.drive, -turn))?;
        Ok(())
    }

    /// A revoked grant means the interlock fired mid-maneuver.
    fn step(&self, ok: bool) -> Result<(), Aborted> {
        if ok { Ok(()) } else { Err(Aborted) }
    }
}
