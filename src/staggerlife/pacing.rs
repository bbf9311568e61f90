//! Real-time pacing: when a run should pause so the renderer can draw.
//!
//! The pacer keeps a weighted average of how long the renderer holds the
//! universe at each pit stop and aims to hit the frame interval without
//! spending most of the wall clock drawing.

use std::time::{Duration, Instant};

/// What the stepping loop should do after a generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pace {
    /// Keep computing.
    Continue,
    /// Pit stop now.
    Display,
    /// Sleep for the given time, then pit stop.
    DisplayAfter(Duration),
}

#[derive(Clone, Debug)]
pub struct Pacer {
    frame_interval: Duration,
    /// Generations per frame; 0 adapts to the measured cost.
    skip: u64,
    /// Weighted average of the time spent at a pit stop, in microseconds.
    predicted_display_us: u64,
    last_gen_interval: u64,
    last_frame_generation: u64,
    resumed_at: Option<Instant>,
    decided_at: Option<Instant>,
}

impl Pacer {
    pub fn new(frame_interval: Duration, skip: u64) -> Self {
        Self {
            frame_interval,
            skip,
            predicted_display_us: 0,
            last_gen_interval: 0,
            last_frame_generation: 0,
            resumed_at: None,
            decided_at: None,
        }
    }

    pub fn set(&mut self, frame_interval: Duration, skip: u64) {
        self.frame_interval = frame_interval;
        self.skip = skip;
        self.last_gen_interval = 0;
    }

    #[inline]
    pub fn predicted_display(&self) -> Duration {
        Duration::from_micros(self.predicted_display_us)
    }

    /// Starts a fresh run at `generation`.
    pub fn begin_run(&mut self, generation: u64) {
        self.last_gen_interval = 0;
        self.last_frame_generation = generation;
    }

    /// Records that stepping (re)starts at `now`. After a pit stop the time
    /// since the last decision is the display cost and feeds the average.
    pub fn mark_time(&mut self, now: Instant, after_pit_stop: bool) {
        if after_pit_stop {
            if let Some(decided) = self.decided_at {
                let cost = now.saturating_duration_since(decided).as_micros() as u64;
                self.predicted_display_us = (self.predicted_display_us * 7 + cost) / 8;
            }
        }
        self.resumed_at = Some(now);
    }

    /// Decides whether a pit stop is due after reaching `generation`.
    pub fn decide(&mut self, generation: u64, now: Instant) -> Pace {
        self.decided_at = Some(now);
        let gens = generation.saturating_sub(self.last_frame_generation);
        if gens == 0 {
            return Pace::Continue;
        }

        // Frame to frame, the generations per frame stay within 10%.
        if self.skip == 0 && self.last_gen_interval > 0 {
            let leeway = (self.last_gen_interval / 10).max(1);
            if gens < self.last_gen_interval.saturating_sub(leeway) {
                return Pace::Continue;
            }
            if gens > self.last_gen_interval + leeway {
                return self.display(generation, Pace::Display);
            }
        }

        let elapsed = self
            .resumed_at
            .map_or(0, |t| now.saturating_duration_since(t).as_micros() as u64);
        let predicted = self.predicted_display_us;
        let interval = self.frame_interval.as_micros() as u64;
        let half_gen = elapsed / gens / 2;

        if self.skip > 0 {
            if gens < self.skip {
                return Pace::Continue;
            }
            let sleep = interval.saturating_sub(predicted + half_gen).min(interval);
            let pace = if sleep > 0 {
                Pace::DisplayAfter(Duration::from_micros(sleep))
            } else {
                Pace::Display
            };
            return self.display(generation, pace);
        }

        // At most about 80% of the wall clock goes to drawing.
        if elapsed * 5 < predicted {
            return Pace::Continue;
        }
        if elapsed + predicted + half_gen >= interval {
            return self.display(generation, Pace::Display);
        }
        Pace::Continue
    }

    fn display(&mut self, generation: u64, pace: Pace) -> Pace {
        self.last_gen_interval = generation - self.last_frame_generation;
        self.last_frame_generation = generation;
        pace
    }

    /// [`decide`](Self::decide) against the clock, sleeping when asked to.
    pub fn frame_due(&mut self, generation: u64) -> bool {
        match self.decide(generation, Instant::now()) {
            Pace::Continue => false,
            Pace::Display => true,
            Pace::DisplayAfter(wait) => {
                std::thread::sleep(wait);
                self.decided_at = Some(Instant::now());
                true
            }
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), 0)
    }
}
