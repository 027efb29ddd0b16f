//! Microsecond stopwatches over a free-running clock

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Instant;

/// A free-running, monotonic counter
pub trait Clock {
    /// The current raw count
    fn count(&self) -> u64;

    /// How many counts make one second
    fn frequency(&self) -> u64;

    /// Counts from `start` to `end`, saturating at zero if the clock went
    /// backwards
    fn elapsed(&self, start: u64, end: u64) -> u64 {
        end.saturating_sub(start)
    }
}

/// Wall-clock time, counted in nanoseconds since the clock was made
#[derive(Clone, Copy, Debug)]
pub struct HostClock {
    origin: Instant,
}

impl HostClock {
    pub fn new() -> HostClock {
        HostClock {
            origin: Instant::now(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        HostClock::new()
    }
}

impl Clock for HostClock {
    fn count(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn frequency(&self) -> u64 {
        1_000_000_000
    }
}

/// Scheduler ticks, at a nominal tick rate
///
/// Gives repeatable timings, because ticks only move when the scheduler
/// says so. The tick counter is 32 bits wide and wraps.
#[derive(Clone, Copy, Debug)]
pub struct TickClock {
    tick_hz: u32,
}

impl TickClock {
    pub const fn new(tick_hz: u32) -> TickClock {
        TickClock { tick_hz }
    }
}

impl Clock for TickClock {
    fn count(&self) -> u64 {
        u64::from(crate::now())
    }

    fn frequency(&self) -> u64 {
        u64::from(self.tick_hz.max(1))
    }

    fn elapsed(&self, start: u64, end: u64) -> u64 {
        // Counts are only ever u32 ticks, so the truncation loses nothing
        u64::from((end as u32).wrapping_sub(start as u32))
    }
}

/// Either of the built-in clocks, picked at run time
#[derive(Clone, Copy, Debug)]
pub enum AnyClock {
    Host(HostClock),
    Ticks(TickClock),
}

impl Clock for AnyClock {
    fn count(&self) -> u64 {
        match self {
            AnyClock::Host(clock) => clock.count(),
            AnyClock::Ticks(clock) => clock.count(),
        }
    }

    fn frequency(&self) -> u64 {
        match self {
            AnyClock::Host(clock) => clock.frequency(),
            AnyClock::Ticks(clock) => clock.frequency(),
        }
    }

    fn elapsed(&self, start: u64, end: u64) -> u64 {
        match self {
            AnyClock::Host(clock) => clock.elapsed(start, end),
            AnyClock::Ticks(clock) => clock.elapsed(start, end),
        }
    }
}

/// Measures one interval at a time, in microseconds
#[derive(Debug)]
pub struct Stopwatch<C> {
    clock: C,
    started_at: Option<u64>,
}

impl<C: Clock> Stopwatch<C> {
    pub fn new(clock: C) -> Stopwatch<C> {
        Stopwatch {
            clock,
            started_at: None,
        }
    }

    /// Forget any previous measurement and start counting from now
    pub fn start(&mut self) {
        self.started_at = Some(self.clock.count());
    }

    /// Stop counting, and report the microseconds since [`Stopwatch::start`]
    ///
    /// Returns zero if the stopwatch was not running. Saturates at
    /// `u32::MAX` microseconds.
    pub fn stop(&mut self) -> u32 {
        let Some(started_at) = self.started_at.take() else {
            return 0;
        };
        let elapsed = self.clock.elapsed(started_at, self.clock.count());
        to_micros(elapsed, self.clock.frequency())
    }

    /// Is a measurement in progress?
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}

/// Convert a raw count at `frequency` Hz into whole microseconds
fn to_micros(elapsed: u64, frequency: u64) -> u32 {
    let micros = u128::from(elapsed) * 1_000_000 / u128::from(frequency.max(1));
    u32::try_from(micros).unwrap_or(u32::MAX)
}


// End of File
