//! Simulation rig: scripted devices for tests and a synthetic closed-loop
//! rig for running full missions without hardware.
//!
//! The synthetic rig models just enough of the world for the control loops
//! to close: forward drive shrinks the front distance, any in-place rotation
//! restores it (a new corridor is faced), and the side distance wanders
//! around a configured base with noise. Marker classifications are scripted
//! by read index so mission runs are reproducible.

use super::{
    DistanceSensors, DriveMotors, EmergencyInput, HardwareRig, MarkerClass, MarkerSensor,
    POWER_MAX, SensorHead, Siren, Suppressor,
};
use crate::config::SimConfig;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Distance sensors fed from explicit reading queues. Used by tests; once a
/// queue runs dry the configured fallback is returned on every read.
#[derive(Default)]
pub struct ScriptedDistance {
    fronts: Mutex<VecDeque<Option<f32>>>,
    sides: Mutex<VecDeque<Option<f32>>>,
    front_fallback: Mutex<Option<f32>>,
    side_fallback: Mutex<Option<f32>>,
}

impl ScriptedDistance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_fronts(&self, readings: impl IntoIterator<Item = Option<f32>>) {
        self.fronts.lock().extend(readings);
    }

    pub fn push_sides(&self, readings: impl IntoIterator<Item = Option<f32>>) {
        self.sides.lock().extend(readings);
    }

    pub fn set_front_fallback(&self, reading: Option<f32>) {
        *self.front_fallback.lock() = reading;
    }

    pub fn set_side_fallback(&self, reading: Option<f32>) {
        *self.side_fallback.lock() = reading;
    }
}

impl DistanceSensors for ScriptedDistance {
    fn front_cm(&self) -> Option<f32> {
        self.fronts
            .lock()
            .pop_front()
            .unwrap_or(*self.front_fallback.lock())
    }

    fn side_cm(&self) -> Option<f32> {
        self.sides
            .lock()
            .pop_front()
            .unwrap_or(*self.side_fallback.lock())
    }
}

/// Marker sensor fed from an explicit classification queue; reads past the
/// end return `MarkerClass::None`.
#[derive(Default)]
pub struct ScriptedMarkers {
    script: Mutex<VecDeque<MarkerClass>>,
    reads: AtomicU64,
}

impl ScriptedMarkers {
    pub fn new(script: impl IntoIterator<Item = MarkerClass>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            reads: AtomicU64::new(0),
        }
    }

    /// Total classification reads performed so far.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Acquire)
    }
}

impl MarkerSensor for ScriptedMarkers {
    fn read_class(&self) -> MarkerClass {
        self.reads.fetch_add(1, Ordering::AcqRel);
        self.script.lock().pop_front().unwrap_or(MarkerClass::None)
    }
}

/// Drive motors that clamp and record every commanded power pair.
#[derive(Default)]
pub struct RecordingMotors {
    history: Mutex<Vec<(i32, i32)>>,
}

impl RecordingMotors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent commanded pair; (0, 0) if nothing was commanded yet.
    pub fn last(&self) -> (i32, i32) {
        self.history.lock().last().copied().unwrap_or((0, 0))
    }

    pub fn history(&self) -> Vec<(i32, i32)> {
        self.history.lock().clone()
    }
}

impl DriveMotors for RecordingMotors {
    fn set_power(&self, left: i32, right: i32) {
        self.history.lock().push((
            left.clamp(-POWER_MAX, POWER_MAX),
            right.clamp(-POWER_MAX, POWER_MAX),
        ));
    }
}

/// Sensor head that snaps to the commanded angle and records commands.
#[derive(Default)]
pub struct RecordingHead {
    angle_deg: Mutex<f32>,
    commands: Mutex<Vec<f32>>,
}

impl RecordingHead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<f32> {
        self.commands.lock().clone()
    }
}

impl SensorHead for RecordingHead {
    fn set_angle(&self, target_deg: f32, _speed: i32) {
        *self.angle_deg.lock() = target_deg;
        self.commands.lock().push(target_deg);
    }

    fn angle_deg(&self) -> f32 {
        *self.angle_deg.lock()
    }
}

/// Suppression actuator that records every commanded power.
#[derive(Default)]
pub struct RecordingSuppressor {
    history: Mutex<Vec<i32>>,
}

impl RecordingSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<i32> {
        self.history.lock().clone()
    }

    pub fn last(&self) -> i32 {
        self.history.lock().last().copied().unwrap_or(0)
    }

    /// Number of forward pulses issued (a pulse is forward, reverse, off).
    pub fn pulse_count(&self) -> usize {
        self.history.lock().iter().filter(|p| **p > 0).count()
    }
}

impl Suppressor for RecordingSuppressor {
    fn set_power(&self, power: i32) {
        self.history.lock().push(power.clamp(-POWER_MAX, POWER_MAX));
    }
}

/// Emergency input backed by a flag; tests and the Ctrl-C handler trip it.
#[derive(Default)]
pub struct SwitchEmergency {
    tripped: AtomicBool,
}

impl SwitchEmergency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trip(&self) {
        self.tripped.store(true, Ordering::Release);
    }
}

impl EmergencyInput for SwitchEmergency {
    fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }
}

/// Siren that only logs its lifecycle.
#[derive(Default)]
pub struct LogSiren;

impl Siren for LogSiren {
    fn start(&self) {
        tracing::info!("Siren started");
    }

    fn stop(&self) {
        tracing::info!("Siren stopped");
    }
}

struct WorldInner {
    front_cm: f32,
    powers: (i32, i32),
    rng: StdRng,
}

/// Shared synthetic world driven by the motor commands.
struct SimWorld {
    inner: Mutex<WorldInner>,
    config: SimConfig,
}

impl SimWorld {
    fn new(config: SimConfig) -> Self {
        let rng = if config.seed == 0 {
            StdRng::from_os_rng()
        } else {
            StdRng::seed_from_u64(config.seed)
        };
        Self {
            inner: Mutex::new(WorldInner {
                front_cm: config.front_start_cm,
                powers: (0, 0),
                rng,
            }),
            config,
        }
    }
}

struct SimMotors(Arc<SimWorld>);

impl DriveMotors for SimMotors {
    fn set_power(&self, left: i32, right: i32) {
        let left = left.clamp(-POWER_MAX, POWER_MAX);
        let right = right.clamp(-POWER_MAX, POWER_MAX);
        let mut world = self.0.inner.lock();
        // An in-place rotation faces a fresh stretch of corridor.
        if left != 0 && right != 0 && left.signum() != right.signum() {
            world.front_cm = self.0.config.front_start_cm;
        }
        world.powers = (left, right);
    }
}

struct SimDistance(Arc<SimWorld>);

impl DistanceSensors for SimDistance {
    fn front_cm(&self) -> Option<f32> {
        let mut world = self.0.inner.lock();
        if world.powers.0 > 0 && world.powers.1 > 0 {
            world.front_cm = (world.front_cm - self.0.config.advance_cm_per_tick).max(0.0);
        }
        Some(world.front_cm)
    }

    fn side_cm(&self) -> Option<f32> {
        let mut world = self.0.inner.lock();
        let noise = self.0.config.side_noise_cm;
        let jitter = if noise > 0.0 {
            world.rng.random_range(-noise..=noise)
        } else {
            0.0
        };
        Some(self.0.config.side_base_cm + jitter)
    }
}

struct SimMarkers {
    fire_reads: Vec<u64>,
    obstacle_reads: Vec<u64>,
    reads: AtomicU64,
}

impl MarkerSensor for SimMarkers {
    fn read_class(&self) -> MarkerClass {
        let read = self.reads.fetch_add(1, Ordering::AcqRel);
        if self.fire_reads.contains(&read) {
            MarkerClass::Fire
        } else if self.obstacle_reads.contains(&read) {
            MarkerClass::Obstacle
        } else {
            MarkerClass::None
        }
    }
}

/// Build the synthetic rig the binary runs against. Returns the emergency
/// switch separately so the Ctrl-C handler can trip it.
pub fn build_sim_rig(config: &SimConfig) -> (HardwareRig, Arc<SwitchEmergency>) {
    let world = Arc::new(SimWorld::new(config.clone()));
    let emergency = Arc::new(SwitchEmergency::new());

    let rig = HardwareRig {
        distance: Arc::new(SimDistance(Arc::clone(&world))),
        marker: Arc::new(SimMarkers {
            fire_reads: config.fire_reads.clone(),
            obstacle_reads: config.obstacle_reads.clone(),
            reads: AtomicU64::new(0),
        }),
        motors: Arc::new(SimMotors(world)),
        head: Arc::new(RecordingHead::new()),
        suppressor: Arc::new(RecordingSuppressor::new()),
        emergency: Arc::clone(&emergency) as Arc<dyn EmergencyInput>,
        siren: Arc::new(LogSiren),
    };

    (rig, emergency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn scripted_distance_drains_then_falls_back() {
        let sensors = ScriptedDistance::new();
        sensors.push_fronts([Some(80.0), None]);
        sensors.set_front_fallback(Some(20.0));

        assert_eq!(sensors.front_cm(), Some(80.0));
        assert_eq!(sensors.front_cm(), None);
        assert_eq!(sensors.front_cm(), Some(20.0));
    }

    #[test]
    fn recording_motors_clamp_power() {
        let motors = RecordingMotors::new();
        motors.set_power(250, -250);
        assert_eq!(motors.last(), (POWER_MAX, -POWER_MAX));
    }

    #[test]
    fn sim_front_distance_shrinks_while_driving() {
        let config = SimConfig::default();
        let (rig, _emergency) = build_sim_rig(&config);

        rig.motors.set_power(20, 20);
        let first = rig.distance.front_cm().unwrap();
        let second = rig.distance.front_cm().unwrap();
        assert_relative_eq!(first - second, config.advance_cm_per_tick);

        // Rotation restores the corridor distance.
        rig.motors.set_power(30, -30);
        let after_turn = rig.distance.front_cm().unwrap();
        assert!(after_turn >= config.front_start_cm - config.advance_cm_per_tick);
    }

    #[test]
    fn sim_markers_follow_script() {
        let markers = SimMarkers {
            fire_reads: vec![1],
            obstacle_reads: vec![2],
            reads: AtomicU64::new(0),
        };
        assert_eq!(markers.read_class(), MarkerClass::None);
        assert_eq!(markers.read_class(), MarkerClass::Fire);
        assert_eq!(markers.read_class(), MarkerClass::Obstacle);
        assert_eq!(markers.read_class(), MarkerClass::None);
    }
}
