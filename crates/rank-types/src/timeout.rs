//! Cooperative timeout terminator.
//!
//! The seek loop is the only place a session can be cancelled. Reading the
//! clock on every seek is too expensive, so the terminator counts seeks and
//! only consults the clock every `step` calls. State lives in `Cell`s: the
//! terminator is shared immutably across session components but never
//! crosses a thread.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Step-counted deadline check shared by one session.
#[derive(Debug)]
pub struct TimeoutTerminator {
    deadline: Instant,
    step: Cell<u32>,
    until_check: Cell<u32>,
    check_times: Cell<u32>,
    timed_out: Cell<bool>,
}

impl TimeoutTerminator {
    pub fn new(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline,
            step: Cell::new(1),
            until_check: Cell::new(1),
            check_times: Cell::new(0),
            timed_out: Cell::new(false),
        }
    }

    /// Arm the terminator with the seeks-per-clock-check step.
    pub fn init(&self, step: u32) {
        let step = step.max(1);
        self.step.set(step);
        self.until_check.set(step);
    }

    /// Count one seek; consult the clock every `step` calls.
    ///
    /// Returns `true` when the session should keep going.
    pub fn step(&self) -> bool {
        self.check_times.set(self.check_times.get() + 1);
        if self.timed_out.get() {
            return false;
        }
        let left = self.until_check.get() - 1;
        if left == 0 {
            self.until_check.set(self.step.get());
            return !self.check_timeout();
        }
        self.until_check.set(left);
        true
    }

    /// Forced clock check, regardless of the step counter.
    pub fn check_timeout(&self) -> bool {
        if !self.timed_out.get() && Instant::now() >= self.deadline {
            self.timed_out.set(true);
        }
        self.timed_out.get()
    }

    /// Whether a deadline was observed as crossed.
    pub fn is_timeout(&self) -> bool {
        self.timed_out.get()
    }

    /// Seeks counted so far.
    pub fn check_times(&self) -> u32 {
        self.check_times.get()
    }
}
