use std::cell::Cell;
use std::time::Instant;

/// Source of the current playback position in milliseconds.
///
/// Reads are synchronous and cheap; the engine samples once per frame.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Clock driven by hand, for tools and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    time_ms: Cell<f64>,
}

impl ManualClock {
    pub fn new(time_ms: f64) -> Self {
        Self {
            time_ms: Cell::new(time_ms),
        }
    }

    pub fn set(&self, time_ms: f64) {
        self.time_ms.set(time_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.time_ms.set(self.time_ms.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.time_ms.get()
    }
}

/// Wall clock standing in for an audio stream position.
///
/// Reads `-lead_in_ms` until [`InstantClock::start`] is called, so nothing
/// spawns before playback begins.
#[derive(Debug)]
pub struct InstantClock {
    started: Option<Instant>,
    lead_in_ms: f64,
    rate: f64,
}

impl InstantClock {
    pub fn new(lead_in_ms: f64, rate: f64) -> Self {
        let rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
        Self {
            started: None,
            lead_in_ms: lead_in_ms.max(0.0),
            rate,
        }
    }

    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    pub const fn is_started(&self) -> bool {
        self.started.is_some()
    }
}

impl Clock for InstantClock {
    fn now_ms(&self) -> f64 {
        let Some(started) = self.started else {
            return -self.lead_in_ms;
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        elapsed_ms.mul_add(self.rate, -self.lead_in_ms)
    }
}
