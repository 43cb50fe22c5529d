//! Configuration loading for AgniNav

use crate::error::{AgniError, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize)]
pub struct AgniConfig {
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub mission: MissionConfig,
    #[serde(default)]
    pub sim: SimConfig,
}

/// Drivetrain and wall-following parameters
#[derive(Clone, Debug, Deserialize)]
pub struct DriveConfig {
    /// Control tick period for the wall follower (milliseconds)
    #[serde(default = "default_drive_tick_ms")]
    pub tick_ms: u64,

    /// Forward drive power for a leg (-100..=100)
    #[serde(default = "default_drive_power")]
    pub power: i32,

    /// Power taken off the inner wheel when correcting toward/away from the wall
    #[serde(default = "default_correction_offset")]
    pub correction_offset: i32,

    /// Side-distance tolerance band around the leg reference (cm)
    #[serde(default = "default_tolerance_cm")]
    pub tolerance_cm: f32,

    /// Maximum ticks per leg before it is declared complete anyway
    #[serde(default = "default_leg_max_ticks")]
    pub leg_max_ticks: u32,

    /// Wheel power used for in-place rotation
    #[serde(default = "default_turn_power")]
    pub turn_power: i32,

    /// Calibrated duration of a 90-degree in-place rotation (milliseconds)
    #[serde(default = "default_turn_90_ms")]
    pub turn_90_ms: u64,
}

/// Sensor-head sweep parameters
#[derive(Clone, Debug, Deserialize)]
pub struct SweepConfig {
    /// Lower sweep bound (degrees)
    #[serde(default = "default_sweep_min_deg")]
    pub min_deg: f32,

    /// Upper sweep bound (degrees)
    #[serde(default = "default_sweep_max_deg")]
    pub max_deg: f32,

    /// Angle advanced per sweep tick (degrees)
    #[serde(default = "default_sweep_step_deg")]
    pub step_deg: f32,

    /// Sweep tick period (milliseconds)
    #[serde(default = "default_sweep_tick_ms")]
    pub tick_ms: u64,

    /// Head rotation speed passed to the actuator
    #[serde(default = "default_head_speed")]
    pub head_speed: i32,
}

/// Marker responder parameters
#[derive(Clone, Debug, Deserialize)]
pub struct ResponderConfig {
    /// Classification poll period while scanning (milliseconds)
    #[serde(default = "default_responder_tick_ms")]
    pub tick_ms: u64,

    /// Pause after a maneuver before scanning resumes (milliseconds)
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Head stow angle before a suppression maneuver (degrees)
    #[serde(default = "default_fire_stow_deg")]
    pub fire_stow_deg: f32,

    /// Head stow angle before an avoidance maneuver (degrees)
    #[serde(default = "default_obstacle_stow_deg")]
    pub obstacle_stow_deg: f32,

    /// Detection angles at or above this turn right, below turn left
    #[serde(default = "default_obstacle_midpoint_deg")]
    pub obstacle_midpoint_deg: f32,

    /// Suppression actuator pulse power
    #[serde(default = "default_suppressor_power")]
    pub suppressor_power: i32,

    /// Duration of each suppression pulse phase (milliseconds)
    #[serde(default = "default_pulse_ms")]
    pub pulse_ms: u64,

    /// Drive power for maneuver repositioning
    #[serde(default = "default_advance_power")]
    pub advance_power: i32,

    /// Back-off duration when avoiding an obstacle (milliseconds)
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

/// One step of a phase route: a wall-following leg or an in-place turn.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteStepConfig {
    /// Drive until the front distance drops to `front_cm`, holding `side_cm`
    Leg { side_cm: f32, front_cm: f32 },
    /// Rotate in place; positive degrees turn left
    Turn { degrees: f32 },
}

/// Mission-level parameters and phase routes
#[derive(Clone, Debug, Deserialize)]
pub struct MissionConfig {
    /// Fires to suppress before the interior phase is done
    #[serde(default = "default_fire_target")]
    pub fire_target: u32,

    /// Soft mission time budget; exceeding it only logs a warning (seconds)
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: u64,

    /// Safety interlock poll period (milliseconds)
    #[serde(default = "default_interlock_poll_ms")]
    pub interlock_poll_ms: u64,

    /// Route from the start point to the interior entrance
    #[serde(default = "default_approach_route")]
    pub approach: Vec<RouteStepConfig>,

    /// Route traversed inside the interior while scanning for markers
    #[serde(default = "default_interior_route")]
    pub interior: Vec<RouteStepConfig>,

    /// Route from the interior back to the start point
    #[serde(default = "default_return_route", rename = "return")]
    pub return_route: Vec<RouteStepConfig>,
}

/// Simulation rig parameters (the binary always runs against the sim)
#[derive(Clone, Debug, Deserialize)]
pub struct SimConfig {
    /// Noise seed; 0 seeds from entropy
    #[serde(default = "default_sim_seed")]
    pub seed: u64,

    /// Half-width of the uniform side-distance jitter (cm)
    #[serde(default = "default_side_noise_cm")]
    pub side_noise_cm: f32,

    /// Front distance restored after each rotation (cm)
    #[serde(default = "default_front_start_cm")]
    pub front_start_cm: f32,

    /// Front distance closed per forward tick (cm)
    #[serde(default = "default_advance_cm_per_tick")]
    pub advance_cm_per_tick: f32,

    /// Ambient side distance the sim wanders around (cm)
    #[serde(default = "default_side_base_cm")]
    pub side_base_cm: f32,

    /// Classification read indices that report a fire marker
    #[serde(default = "default_fire_reads")]
    pub fire_reads: Vec<u64>,

    /// Classification read indices that report an obstacle marker
    #[serde(default = "default_obstacle_reads")]
    pub obstacle_reads: Vec<u64>,
}

// Drive defaults (leg power and correction from the field-calibrated runs)
fn default_drive_tick_ms() -> u64 {
    50
}
fn default_drive_power() -> i32 {
    20
}
fn default_correction_offset() -> i32 {
    5
}
fn default_tolerance_cm() -> f32 {
    0.3
}
fn default_leg_max_ticks() -> u32 {
    600
}
fn default_turn_power() -> i32 {
    30
}
fn default_turn_90_ms() -> u64 {
    1100
}

// Sweep defaults
fn default_sweep_min_deg() -> f32 {
    0.0
}
fn default_sweep_max_deg() -> f32 {
    150.0
}
fn default_sweep_step_deg() -> f32 {
    10.0
}
fn default_sweep_tick_ms() -> u64 {
    50
}
fn default_head_speed() -> i32 {
    25
}

// Responder defaults
fn default_responder_tick_ms() -> u64 {
    100
}
fn default_cooldown_ms() -> u64 {
    1000
}
fn default_fire_stow_deg() -> f32 {
    150.0
}
fn default_obstacle_stow_deg() -> f32 {
    0.0
}
fn default_obstacle_midpoint_deg() -> f32 {
    75.0
}
fn default_suppressor_power() -> i32 {
    30
}
fn default_pulse_ms() -> u64 {
    100
}
fn default_advance_power() -> i32 {
    20
}
fn default_backoff_ms() -> u64 {
    500
}

// Mission defaults
fn default_fire_target() -> u32 {
    2
}
fn default_time_budget_secs() -> u64 {
    180
}
fn default_interlock_poll_ms() -> u64 {
    100
}

fn default_approach_route() -> Vec<RouteStepConfig> {
    vec![
        RouteStepConfig::Leg {
            side_cm: 8.0,
            front_cm: 57.0,
        },
        RouteStepConfig::Turn { degrees: -90.0 },
        RouteStepConfig::Leg {
            side_cm: 55.0,
            front_cm: 33.0,
        },
        RouteStepConfig::Turn { degrees: 90.0 },
    ]
}

fn default_interior_route() -> Vec<RouteStepConfig> {
    vec![
        RouteStepConfig::Leg {
            side_cm: 76.0,
            front_cm: 31.0,
        },
        RouteStepConfig::Turn { degrees: -90.0 },
        RouteStepConfig::Leg {
            side_cm: 31.0,
            front_cm: 9.0,
        },
        RouteStepConfig::Turn { degrees: 90.0 },
        RouteStepConfig::Leg {
            side_cm: 100.0,
            front_cm: 8.0,
        },
        RouteStepConfig::Turn { degrees: 90.0 },
        RouteStepConfig::Leg {
            side_cm: 98.0,
            front_cm: 50.0,
        },
        RouteStepConfig::Turn { degrees: 90.0 },
        RouteStepConfig::Leg {
            side_cm: 50.0,
            front_cm: 74.0,
        },
        RouteStepConfig::Turn { degrees: 90.0 },
        RouteStepConfig::Leg {
            side_cm: 28.0,
            front_cm: 26.0,
        },
        RouteStepConfig::Turn { degrees: -90.0 },
    ]
}

fn default_return_route() -> Vec<RouteStepConfig> {
    vec![
        RouteStepConfig::Leg {
            side_cm: 27.0,
            front_cm: 57.0,
        },
        RouteStepConfig::Turn { degrees: -90.0 },
        RouteStepConfig::Leg {
            side_cm: 55.0,
            front_cm: 8.0,
        },
        RouteStepConfig::Turn { degrees: 90.0 },
        RouteStepConfig::Leg {
            side_cm: 112.0,
            front_cm: 8.0,
        },
    ]
}

// Sim defaults
fn default_sim_seed() -> u64 {
    42
}
fn default_side_noise_cm() -> f32 {
    0.1
}
fn default_front_start_cm() -> f32 {
    150.0
}
fn default_advance_cm_per_tick() -> f32 {
    2.0
}
fn default_side_base_cm() -> f32 {
    30.0
}
fn default_fire_reads() -> Vec<u64> {
    vec![40, 120]
}
fn default_obstacle_reads() -> Vec<u64> {
    vec![75]
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_drive_tick_ms(),
            power: default_drive_power(),
            correction_offset: default_correction_offset(),
            tolerance_cm: default_tolerance_cm(),
            leg_max_ticks: default_leg_max_ticks(),
            turn_power: default_turn_power(),
            turn_90_ms: default_turn_90_ms(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_deg: default_sweep_min_deg(),
            max_deg: default_sweep_max_deg(),
            step_deg: default_sweep_step_deg(),
            tick_ms: default_sweep_tick_ms(),
            head_speed: default_head_speed(),
        }
    }
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_responder_tick_ms(),
            cooldown_ms: default_cooldown_ms(),
            fire_stow_deg: default_fire_stow_deg(),
            obstacle_stow_deg: default_obstacle_stow_deg(),
            obstacle_midpoint_deg: default_obstacle_midpoint_deg(),
            suppressor_power: default_suppressor_power(),
            pulse_ms: default_pulse_ms(),
            advance_power: default_advance_power(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            fire_target: default_fire_target(),
            time_budget_secs: default_time_budget_secs(),
            interlock_poll_ms: default_interlock_poll_ms(),
            approach: default_approach_route(),
            interior: default_interior_route(),
            return_route: default_return_route(),
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: default_sim_seed(),
            side_noise_cm: default_side_noise_cm(),
            front_start_cm: default_front_start_cm(),
            advance_cm_per_tick: default_advance_cm_per_tick(),
            side_base_cm: default_side_base_cm(),
            fire_reads: default_fire_reads(),
            obstacle_reads: default_obstacle_reads(),
        }
    }
}

impl Default for AgniConfig {
    fn default() -> Self {
        Self {
            drive: DriveConfig::default(),
            sweep: SweepConfig::default(),
            responder: ResponderConfig::default(),
            mission: MissionConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

impl AgniConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AgniError::Config(format!("Failed to read config file: {}", e)))?;
        let config: AgniConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the control loops cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.drive.power <= 0 || self.drive.power > 100 {
            return Err(AgniError::Config(format!(
                "drive.power must be in 1..=100, got {}",
                self.drive.power
            )));
        }
        if self.drive.correction_offset < 0 || self.drive.correction_offset >= self.drive.power {
            return Err(AgniError::Config(format!(
                "drive.correction_offset must be in 0..drive.power, got {}",
                self.drive.correction_offset
            )));
        }
        if self.sweep.min_deg >= self.sweep.max_deg {
            return Err(AgniError::Config(format!(
                "sweep bounds are inverted: {}..{}",
                self.sweep.min_deg, self.sweep.max_deg
            )));
        }
        if self.sweep.step_deg <= 0.0 {
            return Err(AgniError::Config("sweep.step_deg must be positive".into()));
        }
        if self.mission.fire_target == 0 {
            return Err(AgniError::Config("mission.fire_target must be nonzero".into()));
        }
        Ok(())
    }
}
