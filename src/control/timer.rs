// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Microsecond time base shared by the control loops.
//!
//! The hardware clock is a free-running 32-bit microsecond counter that wraps roughly every 71
//! minutes. All interval math is done with wrapping subtraction, so a single wrap between two
//! samples is harmless.

/// A monotonic free-running microsecond counter.
pub trait MicrosClock {
    fn micros(&self) -> u32;
}

impl<C: MicrosClock + ?Sized> MicrosClock for &C {
    #[inline]
    fn micros(&self) -> u32 {
        (**self).micros()
    }
}

/// Microseconds elapsed from `since` to `now`, modulo 2^32.
#[inline]
pub fn elapsed_us(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Milliseconds elapsed from `since` to `now` (both in microseconds).
#[inline]
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    elapsed_us(now, since) / 1000
}

/// Interval timer for one periodic consumer.
#[derive(Copy, Clone, Debug, Default)]
pub struct Stopwatch {
    last: Option<u32>,
}

impl Stopwatch {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Record a new timestamp and return the interval since the previous one, in seconds.
    ///
    /// Returns `None` when no timestamp is available, on the first (seeding) sample, and when no time
    /// has passed. Callers treat `None` as "hold a safe output this tick".
    pub fn lap(&mut self, now: Option<u32>) -> Option<f32> {
        let now = now?;
        let last = self.last.replace(now)?;
        let dt_us = elapsed_us(now, last);
        if dt_us == 0 {
            return None;
        }
        Some(dt_us as f32 * 1e-6)
    }

    /// Forget the previous timestamp; the next lap seeds again.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_lap_only_seeds() {
        let mut sw = Stopwatch::new();
        assert_eq!(sw.lap(Some(1_000)), None);
        let dt = sw.lap(Some(3_000)).unwrap();
        assert!((dt - 0.002).abs() < 1e-7);
    }

    #[test]
    fn missing_clock_yields_nothing() {
        let mut sw = Stopwatch::new();
        assert_eq!(sw.lap(None), None);
        assert_eq!(sw.lap(None), None);
    }

    #[test]
    fn wraparound_is_modular() {
        let mut sw = Stopwatch::new();
        sw.lap(Some(u32::MAX - 499));
        let dt = sw.lap(Some(500)).unwrap();
        assert!((dt - 0.001).abs() < 1e-7);
        assert_eq!(elapsed_ms(1_500, u32::MAX - 498_499), 500);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut sw = Stopwatch::new();
        sw.lap(Some(42));
        assert_eq!(sw.lap(Some(42)), None);
    }
}
