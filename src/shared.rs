//! Shared mission state for the multi-threaded controller.
//!
//! One `Arc<MissionState>` replaces the pile of ad hoc global flags the
//! mission otherwise needs: phase, fires-suppressed count, the
//! marker-handling flag that suspends the sweep, the published head angle,
//! and the emergency/shutdown signals. Every control loop checks it once per
//! tick; the safety interlock is the only writer of the halt transition.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

/// Atomic wrapper for f32 values.
/// Uses AtomicU32 with bit reinterpretation.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(val: f32) -> Self {
        Self(AtomicU32::new(val.to_bits()))
    }

    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }

    pub fn store(&self, val: f32, order: Ordering) {
        self.0.store(val.to_bits(), order);
    }
}

/// Top-level mission stages, ordered. The numeric ordering is load-bearing:
/// phase advances use `fetch_max`, so the sequence is monotonic and `Halted`
/// absorbs every other phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum MissionPhase {
    Approach = 0,
    Interior = 1,
    Return = 2,
    Halted = 3,
}

impl MissionPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => MissionPhase::Approach,
            1 => MissionPhase::Interior,
            2 => MissionPhase::Return,
            _ => MissionPhase::Halted,
        }
    }
}

/// Shared state between all control threads.
#[derive(Debug)]
pub struct MissionState {
    /// Current mission phase (monotonic; see [`MissionPhase`])
    phase: AtomicU8,

    /// Fires suppressed so far; never exceeds `fire_target`
    fires_suppressed: AtomicU32,

    /// Mission goal for suppressed fires
    fire_target: u32,

    /// Set while the responder handles a marker; suspends the sweep and
    /// preempts the wall follower
    marker_handling: AtomicBool,

    /// Last head angle commanded by the sweep (degrees)
    head_angle_deg: AtomicF32,

    /// Why the mission halted, if it did
    halt_reason: RwLock<Option<String>>,

    /// Mission-complete signal for the safety interlock thread
    shutdown: AtomicBool,
}

impl MissionState {
    pub fn new(fire_target: u32) -> Self {
        Self {
            phase: AtomicU8::new(MissionPhase::Approach as u8),
            fires_suppressed: AtomicU32::new(0),
            fire_target,
            marker_handling: AtomicBool::new(false),
            head_angle_deg: AtomicF32::new(0.0),
            halt_reason: RwLock::new(None),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn phase(&self) -> MissionPhase {
        MissionPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Advance to `phase` if it is later than the current one. Never moves
    /// backwards, so a concurrent halt cannot be overwritten.
    pub fn advance_phase(&self, phase: MissionPhase) {
        self.phase.fetch_max(phase as u8, Ordering::AcqRel);
    }

    /// Transition to `Halted` and record the reason. First reason wins.
    pub fn halt(&self, reason: &str) {
        if let Ok(mut guard) = self.halt_reason.write()
            && guard.is_none()
        {
            *guard = Some(reason.to_string());
        }
        self.phase.fetch_max(MissionPhase::Halted as u8, Ordering::AcqRel);
    }

    pub fn is_halted(&self) -> bool {
        self.phase() == MissionPhase::Halted
    }

    pub fn halt_reason(&self) -> Option<String> {
        self.halt_reason.read().ok().and_then(|g| g.clone())
    }

    pub fn fires_suppressed(&self) -> u32 {
        self.fires_suppressed.load(Ordering::Acquire)
    }

    pub fn fire_target(&self) -> u32 {
        self.fire_target
    }

    /// Record one suppressed fire. Returns `false` when the target was
    /// already reached; the count never exceeds the target.
    pub fn record_fire_suppressed(&self) -> bool {
        self.fires_suppressed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.fire_target).then_some(n + 1)
            })
            .is_ok()
    }

    pub fn fire_target_reached(&self) -> bool {
        self.fires_suppressed() >= self.fire_target
    }

    pub fn set_marker_handling(&self, active: bool) {
        self.marker_handling.store(active, Ordering::Release);
    }

    pub fn is_marker_handling(&self) -> bool {
        self.marker_handling.load(Ordering::Acquire)
    }

    pub fn set_head_angle(&self, deg: f32) {
        self.head_angle_deg.store(deg, Ordering::Release);
    }

    pub fn head_angle(&self) -> f32 {
        self.head_angle_deg.load(Ordering::Acquire)
    }

    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}
