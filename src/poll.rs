//! Wait-for-completion loop run after a motion command.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::status::GripperStatus;
use crate::RgError;

/// Deadline and poll rate of [`wait_for_motion`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Time allowed for the motion, measured from the first poll.
    pub timeout: Duration,
    /// Sleep between two status reads.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            interval: Duration::from_millis(100),
        }
    }
}

/// Time source of the poll loop.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
    fn sleep(&mut self, duration: Duration);
}

/// Wall clock, sleeping the calling thread.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionPhase {
    /// A command was written and the busy flag has not cleared yet.
    Moving,
    /// The busy flag cleared.
    Done,
}

/// Explicit state of one wait, advanced once per tick.
#[derive(Debug, Clone)]
pub struct PollState {
    pub phase: MotionPhase,
    pub started_at: Duration,
    /// Status reads completed so far.
    pub ticks: u32,
    pub last_status: Option<GripperStatus>,
}

impl PollState {
    pub fn new(started_at: Duration) -> Self {
        Self {
            phase: MotionPhase::Moving,
            started_at,
            ticks: 0,
            last_status: None,
        }
    }

    /// Record one status read, moving to `Done` once the busy flag is clear.
    pub fn observe(&mut self, status: GripperStatus) -> MotionPhase {
        self.ticks += 1;
        if !status.busy {
            self.phase = MotionPhase::Done;
        }
        self.last_status = Some(status);
        self.phase
    }

    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.started_at)
    }

    /// Fails with [`RgError::Timeout`] once `now` has reached the deadline.
    pub fn check_deadline(&self, now: Duration, config: &PollConfig) -> Result<(), RgError> {
        if self.phase == MotionPhase::Moving && self.elapsed(now) >= config.timeout {
            return Err(RgError::Timeout {
                timeout: config.timeout,
                ticks: self.ticks,
            });
        }
        Ok(())
    }
}

/// Read the status until the busy flag clears.
///
/// A failed read is retried once right away; a second consecutive failure is
/// returned. On timeout the gripper is left in whatever state it reached.
pub fn wait_for_motion<F, C>(
    mut read_status: F,
    clock: &mut C,
    config: &PollConfig,
) -> Result<GripperStatus, RgError>
where
    F: FnMut() -> Result<GripperStatus, RgError>,
    C: Clock,
{
    let mut state = PollState::new(clock.now());
    loop {
        let status = match read_status() {
            Ok(status) => status,
            Err(e) => {
                warn!("status read failed ({e}), reading again");
                read_status()?
            }
        };
        debug!("poll tick {}: {:?}", state.ticks + 1, status);

        if state.observe(status.clone()) == MotionPhase::Done {
            info!(
                "motion done after {} ticks ({:?})",
                state.ticks,
                state.elapsed(clock.now())
            );
            return Ok(status);
        }

        clock.sleep(config.interval);
        state.check_deadline(clock.now(), config)?;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Clock advanced only by `sleep`.
    #[derive(Debug, Default)]
    pub(crate) struct ManualClock {
        pub now: Duration,
        pub sleeps: u32,
    }

    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            self.now
        }

        fn sleep(&mut self, duration: Duration) {
            self.now += duration;
            self.sleeps += 1;
        }
    }

    fn status(busy: bool) -> GripperStatus {
        GripperStatus {
            busy,
            grip_detected: false,
            s1_pushed: false,
            s1_triggered: false,
            s2_pushed: false,
            s2_triggered: false,
            safety_error: false,
            width_mm: 50.0,
            width_with_offset_mm: 50.0,
            fingertip_offset_mm: 0.0,
            force_n: 20.0,
        }
    }

    fn scripted(script: Vec<Result<bool, ()>>) -> impl FnMut() -> Result<GripperStatus, RgError> {
        let mut script = script.into_iter();
        move || match script.next().expect("script exhausted") {
            Ok(busy) => Ok(status(busy)),
            Err(()) => Err(RgError::ShortResponse {
                address: 268,
                expected: 1,
                actual: 0,
            }),
        }
    }

    fn three_second_deadline() -> PollConfig {
        PollConfig {
            timeout: Duration::from_secs(3),
            interval: Duration::from_secs(1),
        }
    }

    #[test]
    fn done_when_busy_clears() {
        let mut clock = ManualClock::default();
        let read = scripted(vec![Ok(true), Ok(true), Ok(false)]);
        let status = wait_for_motion(read, &mut clock, &PollConfig::default()).unwrap();
        assert!(!status.busy);
        assert_eq!(clock.sleeps, 2);
    }

    #[test]
    fn done_on_first_tick_without_sleeping() {
        let mut clock = ManualClock::default();
        let read = scripted(vec![Ok(false)]);
        wait_for_motion(read, &mut clock, &three_second_deadline()).unwrap();
        assert_eq!(clock.sleeps, 0);
    }

    #[test]
    fn times_out_after_third_tick() {
        let mut clock = ManualClock::default();
        let mut reads = 0;
        let read = || {
            reads += 1;
            Ok(status(true))
        };
        let err = wait_for_motion(read, &mut clock, &three_second_deadline()).unwrap_err();
        assert!(matches!(err, RgError::Timeout { ticks: 3, .. }));
        assert_eq!(reads, 3);
        assert_eq!(clock.now, Duration::from_secs(3));
    }

    #[test]
    fn single_read_failure_is_retried() {
        let mut clock = ManualClock::default();
        let read = scripted(vec![Ok(true), Err(()), Ok(false)]);
        let status = wait_for_motion(read, &mut clock, &three_second_deadline()).unwrap();
        assert!(!status.busy);
    }

    #[test]
    fn second_consecutive_failure_is_fatal() {
        let mut clock = ManualClock::default();
        let read = scripted(vec![Ok(true), Err(()), Err(())]);
        let err = wait_for_motion(read, &mut clock, &three_second_deadline()).unwrap_err();
        assert!(matches!(err, RgError::ShortResponse { .. }));
    }

    #[test]
    fn poll_state_transitions() {
        let config = three_second_deadline();
        let mut state = PollState::new(Duration::from_secs(10));
        assert_eq!(state.observe(status(true)), MotionPhase::Moving);
        assert!(state.check_deadline(Duration::from_secs(12), &config).is_ok());
        assert!(state.check_deadline(Duration::from_secs(13), &config).is_err());

        assert_eq!(state.observe(status(false)), MotionPhase::Done);
        assert_eq!(state.ticks, 2);
        assert!(state.check_deadline(Duration::from_secs(60), &config).is_ok());
    }
}
