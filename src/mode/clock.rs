//! Mode clock
//!
//! Each mode with a notion of time owns a [`ModeClock`]. The clock is
//! advanced by frame time and reports which timers came due. The step timer
//! fires at the step rate; other timers are one-shot or interval callbacks
//! scheduled by the owner.

use smallvec::SmallVec;

use super::DEFAULT_STEP_RATE;

/// Timer comparison tolerance
const EPSILON: f64 = 1e-9;

/// Identity of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u32);

/// The step timer, always scheduled at `1 / step_rate`
pub const STEP_TIMER: TimerId = TimerId(0);

/// A timer that came due during a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fired {
    /// The timer
    pub timer: TimerId,
    /// Time since the timer last fired (or was scheduled)
    pub elapsed: f64,
}

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    next: f64,
    last: f64,
    interval: Option<f64>,
}

/// Clock of a mode
#[derive(Debug, Clone)]
pub struct ModeClock {
    time: f64,
    ticks: u64,
    step_rate: f64,
    timers: Vec<Timer>,
    next_id: u32,
}

impl Default for ModeClock {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_RATE)
    }
}

impl ModeClock {
    /// Create a clock stepping at `step_rate` per second
    #[must_use]
    pub fn new(step_rate: f64) -> Self {
        let mut clock = Self {
            time: 0.0,
            ticks: 0,
            step_rate,
            timers: Vec::new(),
            next_id: 1,
        };
        clock.arm_step_timer();
        clock
    }

    fn arm_step_timer(&mut self) {
        self.timers.retain(|timer| timer.id != STEP_TIMER);
        let interval = 1.0 / self.step_rate;
        self.timers.push(Timer {
            id: STEP_TIMER,
            next: self.time + interval,
            last: self.time,
            interval: Some(interval),
        });
    }

    /// Current clock time in seconds
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of ticks so far
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Step timer rate
    #[must_use]
    pub fn step_rate(&self) -> f64 {
        self.step_rate
    }

    /// Change the step rate and re-arm the step timer from now
    pub fn set_step_rate(&mut self, step_rate: f64) {
        self.step_rate = step_rate;
        self.arm_step_timer();
    }

    fn allocate(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Schedule a timer firing once after `delay` seconds
    pub fn schedule_once(&mut self, delay: f64) -> TimerId {
        let id = self.allocate();
        self.timers.push(Timer {
            id,
            next: self.time + delay,
            last: self.time,
            interval: None,
        });
        id
    }

    /// Schedule a timer firing every `interval` seconds
    pub fn schedule_interval(&mut self, interval: f64) -> TimerId {
        let id = self.allocate();
        self.timers.push(Timer {
            id,
            next: self.time + interval,
            last: self.time,
            interval: Some(interval),
        });
        id
    }

    /// Cancel a timer. Returns `false` if it was not scheduled.
    pub fn unschedule(&mut self, timer: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != timer);
        self.timers.len() != before
    }

    /// Check if a timer is scheduled
    #[must_use]
    pub fn is_scheduled(&self, timer: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == timer)
    }

    /// Advance time by `dt` and return the timers that came due, in
    /// scheduling order. Each timer fires at most once per tick.
    pub fn tick(&mut self, dt: f64) -> SmallVec<[Fired; 4]> {
        self.time += dt;
        self.ticks += 1;
        let now = self.time;

        let mut fired = SmallVec::new();
        self.timers.retain_mut(|timer| {
            if timer.next > now + EPSILON {
                return true;
            }
            fired.push(Fired {
                timer: timer.id,
                elapsed: now - timer.last,
            });
            timer.last = now;
            match timer.interval {
                Some(interval) => {
                    timer.next += interval;
                    if timer.next <= now + EPSILON {
                        // Fell behind: skip the missed firings.
                        timer.next = now + interval;
                    }
                    true
                }
                None => false,
            }
        });
        fired
    }
}
