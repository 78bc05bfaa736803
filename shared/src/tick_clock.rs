//! Fixed-step accumulator clock (spec §4.4). Owns `Tick`, `LerpFactor`, and
//! the speed-multiplier slew; the per-tick `OnLogicTick` dispatch itself
//! belongs to [`crate::manager::EntityManager::update`], which drains the
//! tick count this clock reports.

use crate::constants::{MAX_TICKS_PER_UPDATE, TIME_SPEED_CHANGE_COEF};

/// Raw monotonic time source, abstracted so tests can drive the clock without
/// real wall-clock waits. `now_ticks` counts in the same unit as
/// [`ClockSource::frequency`] reports per second.
pub trait ClockSource {
    fn now_ticks(&self) -> i64;
    fn frequency(&self) -> u64;
}

/// Real-time source backed by [`std::time::Instant`], counting nanoseconds
/// since the source was created.
pub struct SystemClockSource {
    origin: std::time::Instant,
}

impl SystemClockSource {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for SystemClockSource {
    fn now_ticks(&self) -> i64 {
        self.origin.elapsed().as_nanos() as i64
    }

    fn frequency(&self) -> u64 {
        1_000_000_000
    }
}

/// A programmable clock source for tests (spec §8 scenarios 5 & 6): time only
/// advances when [`FakeClockSource::advance`] is called.
#[derive(Debug, Clone, Default)]
pub struct FakeClockSource {
    now: i64,
    frequency: u64,
}

impl FakeClockSource {
    pub fn new(frequency: u64) -> Self {
        Self { now: 0, frequency }
    }

    pub fn advance(&mut self, ticks: i64) {
        self.now += ticks;
    }
}

impl ClockSource for FakeClockSource {
    fn now_ticks(&self) -> i64 {
        self.now
    }

    fn frequency(&self) -> u64 {
        self.frequency
    }
}

/// Outcome of a single [`TickClock::update`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickUpdateOutcome {
    /// How many times the caller must invoke `OnLogicTick` this call.
    pub ticks_fired: u8,
    /// Whether the 5-tick clamp fired and backlog was shed (spec §4.4 step 6).
    pub shed_backlog: bool,
}

/// The fixed-step accumulator clock (spec §4.4).
pub struct TickClock<C: ClockSource> {
    clock: C,
    frames_per_second: u32,
    /// `DeltaTimeTicks`: the fixed step length, in the clock source's unit.
    delta_time_ticks: i64,
    /// `SlowdownTicks`: `max(100, DeltaTime * SpeedChangeCoef * ClockFrequency)`.
    slowdown_ticks: i64,
    running: bool,
    accumulator: i64,
    last_time: i64,
    speed_multiplier: f32,
    tick: u16,
    lerp_factor: f32,
    visual_delta_time: f32,
}

impl<C: ClockSource> TickClock<C> {
    pub fn new(frames_per_second: u32, clock: C) -> Self {
        let frequency = clock.frequency() as f64;
        let delta_time = 1.0 / frames_per_second as f64;
        let delta_time_ticks = (delta_time * frequency) as i64;
        let slowdown_ticks = (delta_time_ticks as f64 * TIME_SPEED_CHANGE_COEF as f64).max(100.0) as i64;

        Self {
            clock,
            frames_per_second,
            delta_time_ticks,
            slowdown_ticks,
            running: false,
            accumulator: 0,
            last_time: 0,
            speed_multiplier: 0.0,
            tick: 0,
            lerp_factor: 0.0,
            visual_delta_time: 0.0,
        }
    }

    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    pub fn delta_time(&self) -> f64 {
        1.0 / self.frames_per_second as f64
    }

    pub fn delta_time_f32(&self) -> f32 {
        self.delta_time() as f32
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick(&self) -> u16 {
        self.tick
    }

    pub fn lerp_factor(&self) -> f32 {
        self.lerp_factor
    }

    pub fn visual_delta_time(&self) -> f32 {
        self.visual_delta_time
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Direct access to the underlying time source, chiefly so tests can
    /// drive a [`FakeClockSource`] without real wall-clock waits.
    pub fn source_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Set by the client role to slew toward the server's tick (spec §4.4
    /// rationale). Roughly `[-1, +1]`; intentionally not clamped here, since
    /// a caller may briefly overshoot while catching up.
    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.speed_multiplier = multiplier;
    }

    /// `Reset` (spec §5 "cancellation primitive"): stops the clock; the next
    /// `update` call restarts it with a zeroed delta.
    pub fn reset(&mut self) {
        self.running = false;
        self.accumulator = 0;
        self.last_time = 0;
        self.tick = 0;
        self.lerp_factor = 0.0;
        self.visual_delta_time = 0.0;
    }

    /// Runs spec §4.4's algorithm for one `Update` call.
    pub fn update(&mut self) -> TickUpdateOutcome {
        let now = self.clock.now_ticks();

        if !self.running {
            self.running = true;
            self.last_time = now;
            self.visual_delta_time = 0.0;
            return TickUpdateOutcome {
                ticks_fired: 0,
                shed_backlog: false,
            };
        }

        let ticks_delta = now - self.last_time;
        self.visual_delta_time = ticks_delta as f32 / self.clock.frequency() as f32;
        self.accumulator += ticks_delta;
        self.last_time = now;

        let max_ticks = self.delta_time_ticks + (self.speed_multiplier as f64 * self.slowdown_ticks as f64) as i64;
        let max_ticks = max_ticks.max(1);

        let mut ticks_fired = 0u8;
        while self.accumulator >= max_ticks && ticks_fired < MAX_TICKS_PER_UPDATE {
            self.tick = self.tick.wrapping_add(1);
            self.accumulator -= max_ticks;
            ticks_fired += 1;
        }

        if ticks_fired == MAX_TICKS_PER_UPDATE && self.accumulator >= max_ticks {
            self.last_time = now;
            self.accumulator = 0;
            return TickUpdateOutcome {
                ticks_fired,
                shed_backlog: true,
            };
        }

        self.lerp_factor = (self.accumulator as f32 / max_ticks as f32).clamp(0.0, 1.0);

        TickUpdateOutcome {
            ticks_fired,
            shed_backlog: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_starts_the_clock_with_a_zeroed_delta() {
        let mut clock = TickClock::new(60, FakeClockSource::new(1_000_000_000));
        let outcome = clock.update();
        assert_eq!(outcome.ticks_fired, 0);
        assert!(clock.is_running());
    }

    #[test]
    fn fires_one_tick_per_delta_time_elapsed() {
        let mut clock = TickClock::new(60, FakeClockSource::new(1_000_000_000));
        clock.update();

        let step_nanos = (clock.delta_time() * 1_000_000_000.0) as i64;
        clock.clock.advance(step_nanos);
        let outcome = clock.update();

        assert_eq!(outcome.ticks_fired, 1);
        assert_eq!(clock.tick(), 1);
    }

    #[test]
    fn backlog_beyond_five_ticks_is_shed_instead_of_queued() {
        let mut clock = TickClock::new(60, FakeClockSource::new(1_000_000_000));
        clock.update();

        let step_nanos = (clock.delta_time() * 1_000_000_000.0) as i64;
        clock.clock.advance(step_nanos * 20);
        let outcome = clock.update();

        assert_eq!(outcome.ticks_fired, MAX_TICKS_PER_UPDATE);
        assert!(outcome.shed_backlog);
        assert_eq!(clock.tick(), MAX_TICKS_PER_UPDATE as u16);

        // Backlog was shed rather than carried forward into the next update.
        let outcome = clock.update();
        assert_eq!(outcome.ticks_fired, 0);
    }

    #[test]
    fn speed_multiplier_shortens_the_effective_step() {
        let mut clock = TickClock::new(60, FakeClockSource::new(1_000_000_000));
        clock.update();
        clock.set_speed_multiplier(1.0);

        let step_nanos = (clock.delta_time() * 1_000_000_000.0) as i64;
        clock.clock.advance(step_nanos);
        let outcome = clock.update();

        // A positive multiplier shortens MaxTicks, so the same elapsed time
        // fires at least as many ticks as with a neutral multiplier.
        assert!(outcome.ticks_fired >= 1);
    }
}
