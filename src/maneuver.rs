//! Marker-response maneuvers: the fire band table, obstacle avoidance
//! geometry, and the timed motion primitives they are built from.
//!
//! The suppression maneuver depends only on the head angle at detection.
//! The angle range splits into five non-overlapping bands, each naming an
//! optional forward reposition and a pre-rotation that is undone after the
//! suppressor fires. The table is data, not code, so it can be checked for
//! coverage and read against the field calibration it came from.

use crate::config::DriveConfig;
use crate::drivetrain::DriveGrant;
use crate::hardware::{MarkerClass, Suppressor};

use std::time::Duration;

/// A classified marker observation: what was seen and where the head was
/// pointing. Consumed at most once.
#[derive(Debug, Clone, Copy)]
pub struct MarkerEvent {
    pub class: MarkerClass,
    pub angle_deg: f32,
}

/// One angle band of the suppression policy. Bands are half-open
/// `[min_deg, max_deg)` and tile the whole range.
#[derive(Debug, Clone, Copy)]
pub struct FireBand {
    pub min_deg: f32,
    pub max_deg: f32,
    /// Rotation applied before deploying, undone afterwards (degrees)
    pub pre_rotate_deg: f32,
    /// Forward reposition before deploying (milliseconds; 0 = none)
    pub advance_ms: u64,
}

/// Suppression maneuver table, far left to far right.
pub const FIRE_BANDS: [FireBand; 5] = [
    FireBand {
        min_deg: f32::NEG_INFINITY,
        max_deg: 30.0,
        pre_rotate_deg: -30.0,
        advance_ms: 0,
    },
    FireBand {
        min_deg: 30.0,
        max_deg: 60.0,
        pre_rotate_deg: -15.0,
        advance_ms: 300,
    },
    FireBand {
        min_deg: 60.0,
        max_deg: 80.0,
        pre_rotate_deg: 0.0,
        advance_ms: 300,
    },
    FireBand {
        min_deg: 80.0,
        max_deg: 120.0,
        pre_rotate_deg: 15.0,
        advance_ms: 500,
    },
    FireBand {
        min_deg: 120.0,
        max_deg: f32::INFINITY,
        pre_rotate_deg: 30.0,
        advance_ms: 0,
    },
];

/// Select the suppression band for a detection angle.
pub fn fire_band(angle_deg: f32) -> &'static FireBand {
    FIRE_BANDS
        .iter()
        .find(|band| angle_deg >= band.min_deg && angle_deg < band.max_deg)
        .unwrap_or(&FIRE_BANDS[FIRE_BANDS.len() - 1])
}

/// Avoidance turn for an obstacle detection: right of the midpoint turns
/// right, left of it turns left. Positive degrees turn left.
pub fn obstacle_turn_degrees(angle_deg: f32, midpoint_deg: f32) -> f32 {
    if angle_deg >= midpoint_deg { -90.0 } else { 90.0 }
}

/// Rotate the chassis in place by `degrees` (positive = left), using the
/// calibrated 90-degree turn duration. Returns `false` if the grant was
/// revoked; the sleep itself is not cancellable, as with any timed pulse.
pub fn rotate_in_place(grant: &DriveGrant<'_>, drive: &DriveConfig, degrees: f32) -> bool {
    if degrees == 0.0 {
        return true;
    }
    let power = drive.turn_power;
    let (left, right) = if degrees > 0.0 {
        (-power, power)
    } else {
        (power, -power)
    };
    if !grant.set_power(left, right) {
        return false;
    }
    let duration_ms = (degrees.abs() / 90.0 * drive.turn_90_ms as f32) as u64;
    std::thread::sleep(Duration::from_millis(duration_ms));
    grant.stop()
}

/// Drive both wheels at `power` for a fixed duration, then stop. Negative
/// power backs off.
pub fn drive_for(grant: &DriveGrant<'_>, power: i32, duration: Duration) -> bool {
    if !grant.set_power(power, power) {
        return false;
    }
    std::thread::sleep(duration);
    grant.stop()
}

/// Pulse the suppression actuator: forward, reverse, off. The reverse
/// phase re-arms the mechanism for the next deployment.
pub fn pulse_suppressor(suppressor: &dyn Suppressor, power: i32, phase: Duration) {
    suppressor.set_power(power);
    std::thread::sleep(phase);
    suppressor.set_power(-power);
    std::thread::sleep(phase);
    suppressor.set_power(0);
}
