// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Drive overcurrent monitor.
//!
//! Trips when any drive motor's current magnitude stays above a ceiling for longer than a hold
//! time. The fault is level-triggered: it clears as soon as every current is back under the
//! ceiling.

use crate::control::timer::elapsed_us;
use log::warn;
use micromath::F32Ext;

/// Result of one monitor check.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SafetyState {
    /// All currents under the ceiling.
    Nominal,
    /// Over the ceiling, hold time not yet reached.
    Pending,
    /// Hold time exceeded on this check. Reported once per excursion.
    Tripped,
    /// Still over the ceiling after a trip.
    Faulted,
}

impl SafetyState {
    /// Whether drive output must be cut.
    #[inline]
    pub fn is_fault(self) -> bool {
        matches!(self, SafetyState::Tripped | SafetyState::Faulted)
    }
}

pub struct OvercurrentMonitor {
    ceiling: f32,
    hold_us: u32,
    since: Option<u32>,
    tripped: bool,
}

impl OvercurrentMonitor {
    pub const DEFAULT_HOLD_US: u32 = 2_000_000;

    pub const fn new(ceiling: f32, hold_us: u32) -> Self {
        Self {
            ceiling,
            hold_us,
            since: None,
            tripped: false,
        }
    }

    #[inline]
    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    #[inline]
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    /// Forget the start of a pending excursion, e.g. after the time base changed. A trip that has
    /// already fired stays in force until the currents drop.
    pub fn restart_timer(&mut self) {
        self.since = None;
    }

    /// Check the latest drive currents.
    ///
    /// Without a timestamp the excursion cannot be timed, so the monitor never trips.
    pub fn check(&mut self, now_us: Option<u32>, currents: &[f32; 4]) -> SafetyState {
        let over = currents.iter().any(|c| c.abs() > self.ceiling);

        if !over {
            if self.tripped {
                warn!("drive current back under {} mA, fault cleared", self.ceiling);
            }
            self.since = None;
            self.tripped = false;
            return SafetyState::Nominal;
        }

        if self.tripped {
            return SafetyState::Faulted;
        }

        let now = match now_us {
            Some(now) => now,
            None => return SafetyState::Pending,
        };
        let since = *self.since.get_or_insert(now);

        if elapsed_us(now, since) > self.hold_us {
            self.tripped = true;
            warn!(
                "drive overcurrent above {} mA for {} ms, cutting drive output",
                self.ceiling,
                self.hold_us / 1000
            );
            SafetyState::Tripped
        } else {
            SafetyState::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CEILING: f32 = 25_000.0;
    const HOT: [f32; 4] = [0.0, CEILING + 1.0, 0.0, 0.0];
    const COOL: [f32; 4] = [100.0, -200.0, 0.0, 300.0];

    fn monitor() -> OvercurrentMonitor {
        OvercurrentMonitor::new(CEILING, OvercurrentMonitor::DEFAULT_HOLD_US)
    }

    #[test]
    fn short_excursion_does_not_trip() {
        let mut m = monitor();
        for t in (0..=1_999_000u32).step_by(1_000) {
            assert_eq!(m.check(Some(t), &HOT), SafetyState::Pending);
        }
        assert!(!m.is_tripped());
    }

    #[test]
    fn sustained_excursion_trips_exactly_once() {
        let mut m = monitor();
        let mut trips = 0;
        for t in (0..=3_000_000u32).step_by(1_000) {
            let s = m.check(Some(t), &HOT);
            if s == SafetyState::Tripped {
                trips += 1;
                assert!(t > 2_000_000);
            }
            if t > 2_001_000 {
                assert_eq!(s, SafetyState::Faulted);
            }
        }
        assert_eq!(trips, 1);
    }

    #[test]
    fn negative_current_counts_by_magnitude() {
        let mut m = monitor();
        let hot = [-(CEILING + 1.0), 0.0, 0.0, 0.0];
        m.check(Some(0), &hot);
        assert_eq!(m.check(Some(2_000_001), &hot), SafetyState::Tripped);
    }

    #[test]
    fn clears_when_all_currents_drop() {
        let mut m = monitor();
        m.check(Some(0), &HOT);
        assert!(m.check(Some(2_500_000), &HOT).is_fault());
        assert_eq!(m.check(Some(2_501_000), &COOL), SafetyState::Nominal);
        assert!(!m.is_tripped());

        // A fresh excursion is timed from scratch.
        assert_eq!(m.check(Some(2_502_000), &HOT), SafetyState::Pending);
        assert_eq!(m.check(Some(4_000_000), &HOT), SafetyState::Pending);
    }

    #[test]
    fn dip_under_ceiling_restarts_hold_timer() {
        let mut m = monitor();
        m.check(Some(0), &HOT);
        m.check(Some(1_500_000), &COOL);
        m.check(Some(1_600_000), &HOT);
        assert_eq!(m.check(Some(3_000_000), &HOT), SafetyState::Pending);
        assert_eq!(m.check(Some(3_600_001), &HOT), SafetyState::Tripped);
    }

    #[test]
    fn no_clock_never_trips() {
        let mut m = monitor();
        for _ in 0..10_000 {
            assert_eq!(m.check(None, &HOT), SafetyState::Pending);
        }
    }

    #[test]
    fn restarted_timer_times_excursion_on_new_base() {
        let mut m = monitor();
        m.check(Some(3_000_000_000), &HOT);
        m.restart_timer();
        assert_eq!(m.check(Some(10), &HOT), SafetyState::Pending);
        assert_eq!(m.check(Some(1_000_000), &HOT), SafetyState::Pending);
        assert_eq!(m.check(Some(2_000_011), &HOT), SafetyState::Tripped);

        // An active fault is not cleared by a restart.
        m.restart_timer();
        assert_eq!(m.check(Some(5), &HOT), SafetyState::Faulted);
    }

    #[test]
    fn timing_survives_counter_wrap() {
        let mut m = monitor();
        let start = u32::MAX - 1_000_000;
        m.check(Some(start), &HOT);
        assert_eq!(m.check(Some(900_000), &HOT), SafetyState::Pending);
        assert_eq!(m.check(Some(1_000_001), &HOT), SafetyState::Tripped);
    }
}
