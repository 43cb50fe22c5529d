//! Drivetrain arbiter: exclusive, revocable access to the drive motors.
//!
//! Exactly one task may command the drive motors at a time. The token is
//! handed out as an RAII [`DriveGrant`]; releasing it (or having it revoked
//! by the safety interlock) zeroes both motors before the token becomes
//! free, so a stale power setting can never leak across ownership changes.
//!
//! There is no fairness guarantee: only the wall follower and the marker
//! responder ever contend, and the responder wins in practice because the
//! follower yields as soon as the marker-handling flag is set.

use crate::hardware::DriveMotors;
use crate::shared::MissionState;

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

/// How long a blocked acquirer waits between halt checks. Bounds the time a
/// missed wakeup or a racing emergency trip can keep a waiter parked.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Tasks allowed to hold the drivetrain token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    WallFollower,
    Responder,
}

/// The arbiter itself; owns the only handle to the drive motors.
pub struct Drivetrain {
    motors: Arc<dyn DriveMotors>,
    holder: Mutex<Option<Owner>>,
    freed: Condvar,
}

impl Drivetrain {
    pub fn new(motors: Arc<dyn DriveMotors>) -> Self {
        Self {
            motors,
            holder: Mutex::new(None),
            freed: Condvar::new(),
        }
    }

    /// Non-blocking acquisition attempt.
    pub fn try_acquire(&self, owner: Owner) -> Option<DriveGrant<'_>> {
        let mut holder = self.holder.lock();
        if holder.is_none() {
            *holder = Some(owner);
            Some(DriveGrant { arbiter: self, owner })
        } else {
            None
        }
    }

    /// Wait until the token is free. Returns `None` if the mission halts
    /// before ownership is granted; callers must treat that as an abort.
    pub fn acquire_blocking(&self, owner: Owner, mission: &MissionState) -> Option<DriveGrant<'_>> {
        let mut holder = self.holder.lock();
        loop {
            if mission.is_halted() {
                return None;
            }
            if holder.is_none() {
                *holder = Some(owner);
                return Some(DriveGrant { arbiter: self, owner });
            }
            self.freed.wait_for(&mut holder, WAIT_SLICE);
        }
    }

    /// Revoke any current holder unconditionally and zero both motors.
    /// Safety-interlock use only.
    pub fn force_release(&self) {
        let mut holder = self.holder.lock();
        self.motors.set_power(0, 0);
        *holder = None;
        drop(holder);
        self.freed.notify_all();
    }

    /// Current holder, if any. Diagnostic only.
    pub fn holder(&self) -> Option<Owner> {
        *self.holder.lock()
    }
}

/// Exclusive right to command the drive motors. Dropping the grant stops
/// the motors and frees the token.
pub struct DriveGrant<'a> {
    arbiter: &'a Drivetrain,
    owner: Owner,
}

impl DriveGrant<'_> {
    /// Command both motors. Returns `false` if the grant was revoked by a
    /// `force_release` in the meantime; the caller must stop maneuvering.
    pub fn set_power(&self, left: i32, right: i32) -> bool {
        let holder = self.arbiter.holder.lock();
        if *holder == Some(self.owner) {
            self.arbiter.motors.set_power(left, right);
            true
        } else {
            false
        }
    }

    /// Stop both motors without releasing the token.
    pub fn stop(&self) -> bool {
        self.set_power(0, 0)
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }
}

impl Drop for DriveGrant<'_> {
    fn drop(&mut self) {
        let mut holder = self.arbiter.holder.lock();
        if *holder == Some(self.owner) {
            self.arbiter.motors.set_power(0, 0);
            *holder = None;
            drop(holder);
            self.arbiter.freed.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::RecordingMotors;
    use rand::Rng;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn arbiter() -> (Drivetrain, Arc<RecordingMotors>) {
        let motors = Arc::new(RecordingMotors::new());
        (Drivetrain::new(Arc::clone(&motors) as _), motors)
    }

    #[test]
    fn second_acquire_is_denied_while_held() {
        let (drivetrain, _motors) = arbiter();
        let grant = drivetrain.try_acquire(Owner::WallFollower).unwrap();
        assert!(drivetrain.try_acquire(Owner::Responder).is_none());
        drop(grant);
        assert!(drivetrain.try_acquire(Owner::Responder).is_some());
    }

    #[test]
    fn release_zeroes_motors() {
        let (drivetrain, motors) = arbiter();
        let grant = drivetrain.try_acquire(Owner::WallFollower).unwrap();
        assert!(grant.set_power(20, 15));
        assert_eq!(motors.last(), (20, 15));
        drop(grant);
        assert_eq!(motors.last(), (0, 0));
    }

    #[test]
    fn force_release_revokes_and_zeroes() {
        let (drivetrain, motors) = arbiter();
        let grant = drivetrain.try_acquire(Owner::Responder).unwrap();
        assert!(grant.set_power(30, 30));

        drivetrain.force_release();
        assert_eq!(motors.last(), (0, 0));
        assert!(!grant.set_power(30, 30), "revoked grant must not drive");
        assert_eq!(motors.last(), (0, 0));

        // Token is free for the next acquirer despite the stale grant.
        assert!(drivetrain.try_acquire(Owner::WallFollower).is_some());
    }

    #[test]
    fn blocking_acquire_aborts_on_halt() {
        let (drivetrain, _motors) = arbiter();
        let drivetrain = Arc::new(drivetrain);
        let mission = Arc::new(MissionState::new(2));

        let _held = drivetrain.try_acquire(Owner::WallFollower).unwrap();

        let waiter = {
            let drivetrain = Arc::clone(&drivetrain);
            let mission = Arc::clone(&mission);
            std::thread::spawn(move || drivetrain.acquire_blocking(Owner::Responder, &mission).is_none())
        };

        std::thread::sleep(Duration::from_millis(20));
        mission.halt("trip during wait");
        assert!(waiter.join().unwrap(), "waiter must abort with no grant");
    }

    #[test]
    fn halted_mission_never_grants() {
        let (drivetrain, _motors) = arbiter();
        let mission = MissionState::new(2);
        mission.halt("tripped");
        assert!(drivetrain.acquire_blocking(Owner::WallFollower, &mission).is_none());
    }

    #[test]
    fn ownership_is_exclusive_under_contention() {
        let (drivetrain, _motors) = arbiter();
        let drivetrain = Arc::new(drivetrain);
        let mission = Arc::new(MissionState::new(2));
        let inside = Arc::new(AtomicU32::new(0));
        let violations = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let drivetrain = Arc::clone(&drivetrain);
                let mission = Arc::clone(&mission);
                let inside = Arc::clone(&inside);
                let violations = Arc::clone(&violations);
                let owner = if i % 2 == 0 {
                    Owner::WallFollower
                } else {
                    Owner::Responder
                };
                std::thread::spawn(move || {
                    let mut rng = rand::rng();
                    for _ in 0..50 {
                        let grant = match drivetrain.acquire_blocking(owner, &mission) {
                            Some(g) => g,
                            None => return,
                        };
                        if inside.fetch_add(1, Ordering::AcqRel) != 0 {
                            violations.fetch_add(1, Ordering::AcqRel);
                        }
                        grant.set_power(10, 10);
                        std::thread::sleep(Duration::from_micros(rng.random_range(0..200)));
                        inside.fetch_sub(1, Ordering::AcqRel);
                        drop(grant);
                        std::thread::sleep(Duration::from_micros(rng.random_range(0..100)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(violations.load(Ordering::Acquire), 0);
        assert!(drivetrain.holder().is_none());
    }
}
