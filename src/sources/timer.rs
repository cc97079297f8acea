//! Periodic timers.
//!
//! A started [`Timer`] ticks once every `speed`. Each tick increments the
//! counter and posts a `TIMER` event carrying the new count and the delivery
//! lateness. There is no timer thread: queues the timer is registered with
//! pump it whenever they are queried, and blocking waits sleep until its next
//! deadline. A timer registered with no queue keeps its schedule but only
//! catches up once some queue pumps it.

use crate::error::{Error, Result};
use crate::event::{EventType, Payload, TimerEvent};
use crate::source::{lock, EventSource, EventSourceHandle, Pump};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Safety valve: maximum number of ticks emitted in one pump.
///
/// Past this the timer skips ahead (the counter still includes every missed
/// tick) so a long stall does not flood the queues.
const MAX_TICKS_PER_PUMP: usize = 256;

struct Schedule {
    speed: Duration,
    started: bool,
    count: i64,
    next_tick: Option<Instant>,
}

struct TimerState {
    schedule: Mutex<Schedule>,
}

impl Pump for TimerState {
    fn pump(&self, source: &EventSourceHandle, now: Instant) -> Option<Instant> {
        let mut ticks = Vec::new();
        let next = {
            let mut s = lock(&self.schedule);
            if !s.started {
                return None;
            }
            let mut next = s.next_tick?;
            while now >= next && ticks.len() < MAX_TICKS_PER_PUMP {
                s.count += 1;
                ticks.push(TimerEvent {
                    count: s.count,
                    error: (now - next).as_secs_f64(),
                });
                next += s.speed;
            }
            if now >= next {
                let behind = (now - next).as_nanos() / s.speed.as_nanos().max(1) + 1;
                s.count += behind as i64;
                next = now + s.speed;
                log::warn!("Timer {:?} fell behind, skipped {behind} tick(s)", source.id());
            }
            s.next_tick = Some(next);
            next
        };

        for tick in ticks {
            source.emit(EventType::TIMER, Payload::Timer(tick));
        }
        Some(next)
    }
}

/// Fixed-rate tick source.
pub struct Timer {
    handle: EventSourceHandle,
    state: Arc<TimerState>,
}

impl Timer {
    /// Creates a stopped timer ticking every `speed`.
    pub fn new(speed: Duration) -> Result<Self> {
        if speed.is_zero() {
            return Err(Error::InvalidTimerSpeed);
        }
        let state = Arc::new(TimerState {
            schedule: Mutex::new(Schedule {
                speed,
                started: false,
                count: 0,
                next_tick: None,
            }),
        });
        let handle = EventSourceHandle::with_pump("timer", Box::new(state.clone()));
        Ok(Self { handle, state })
    }

    /// Creates a stopped timer ticking `hz` times per second.
    pub fn from_hz(hz: f64) -> Result<Self> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(Error::InvalidTimerSpeed);
        }
        Self::new(Duration::from_secs_f64(1.0 / hz))
    }

    /// Starts the timer. Restarting a stopped timer resets its counter;
    /// starting a running one does nothing.
    pub fn start(&self) {
        let mut s = lock(&self.state.schedule);
        if s.started {
            return;
        }
        s.started = true;
        s.count = 0;
        s.next_tick = Some(Instant::now() + s.speed);
        log::debug!("Timer {:?} started ({:?})", self.handle.id(), s.speed);
    }

    pub fn stop(&self) {
        let mut s = lock(&self.state.schedule);
        s.started = false;
        s.next_tick = None;
    }

    /// Starts a stopped timer without resetting its counter.
    pub fn resume(&self) {
        let mut s = lock(&self.state.schedule);
        if !s.started {
            s.started = true;
            s.next_tick = Some(Instant::now() + s.speed);
        }
    }

    pub fn is_started(&self) -> bool {
        lock(&self.state.schedule).started
    }

    pub fn count(&self) -> i64 {
        lock(&self.state.schedule).count
    }

    pub fn set_count(&self, count: i64) {
        lock(&self.state.schedule).count = count;
    }

    pub fn add_count(&self, diff: i64) {
        lock(&self.state.schedule).count += diff;
    }

    pub fn speed(&self) -> Duration {
        lock(&self.state.schedule).speed
    }

    /// Changes the tick period. A running timer's next tick is rescheduled
    /// one new period from now.
    pub fn set_speed(&self, speed: Duration) -> Result<()> {
        if speed.is_zero() {
            return Err(Error::InvalidTimerSpeed);
        }
        let mut s = lock(&self.state.schedule);
        s.speed = speed;
        if s.started {
            s.next_tick = Some(Instant::now() + speed);
        }
        Ok(())
    }
}

impl EventSource for Timer {
    fn event_source(&self) -> &EventSourceHandle {
        &self.handle
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = lock(&self.state.schedule);
        f.debug_struct("Timer")
            .field("id", &self.handle.id())
            .field("speed", &s.speed)
            .field("started", &s.started)
            .field("count", &s.count)
            .finish()
    }
}
