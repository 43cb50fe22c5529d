//! Hardware trait seams for the mission controller.
//!
//! The controller never talks to devices directly; every sensor and actuator
//! sits behind one of these traits. The shipped implementation is the
//! simulation rig in [`sim`] — real device drivers live outside this crate.

pub mod sim;

use std::sync::Arc;

/// Drive power bounds shared by every actuator (percent of full power).
pub const POWER_MAX: i32 = 100;

/// Symbolic marker classes reported by the classification sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerClass {
    /// Nothing recognized at the current head angle
    None,
    /// Fire marker: triggers a suppression maneuver
    Fire,
    /// Obstacle marker: triggers an avoidance maneuver
    Obstacle,
    /// Unrecognized classifier code; treated as `None` by consumers
    Unknown,
}

/// Front and side range sensors. `None` means an invalid reading (out of
/// range, no echo) and must be treated as "no correction / do not stop",
/// never as zero distance.
pub trait DistanceSensors: Send + Sync {
    fn front_cm(&self) -> Option<f32>;
    fn side_cm(&self) -> Option<f32>;
}

/// Color classification sensor mounted on the rotating head.
pub trait MarkerSensor: Send + Sync {
    fn read_class(&self) -> MarkerClass;
}

/// The two drive motors. Fire-and-forget; implementations clamp power to
/// `-POWER_MAX..=POWER_MAX`.
pub trait DriveMotors: Send + Sync {
    fn set_power(&self, left: i32, right: i32);
}

/// Position-controlled sensor-head actuator.
pub trait SensorHead: Send + Sync {
    fn set_angle(&self, target_deg: f32, speed: i32);
    fn angle_deg(&self) -> f32;
}

/// Suppression actuator; pulses are driven as power-then-zero sequences.
pub trait Suppressor: Send + Sync {
    fn set_power(&self, power: i32);
}

/// Operator emergency input, polled by the safety interlock.
pub trait EmergencyInput: Send + Sync {
    fn is_tripped(&self) -> bool;
}

/// Audible signaling, owned outside the core; the coordinator stops it at
/// the approach/interior boundary.
pub trait Siren: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// Cloneable bundle of every device the controller needs.
#[derive(Clone)]
pub struct HardwareRig {
    pub distance: Arc<dyn DistanceSensors>,
    pub marker: Arc<dyn MarkerSensor>,
    pub motors: Arc<dyn DriveMotors>,
    pub head: Arc<dyn SensorHead>,
    pub suppressor: Arc<dyn Suppressor>,
    pub emergency: Arc<dyn EmergencyInput>,
    pub siren: Arc<dyn Siren>,
}
