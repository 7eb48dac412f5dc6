// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Signal conditioning filters for the control loops.
//!
//! All filters are fixed-size and allocation-free. They share the [`Filter`] interface: push a raw
//! sample, get the filtered value back.

use core::cmp::Ordering;

/// One-sample-in, one-sample-out filter.
pub trait Filter {
    /// Feed a new sample and return the filtered output.
    fn f(&mut self, x: f32) -> f32;
}

/// First-order low-pass filter: `trust * x + (1 - trust) * x_prev`.
///
/// `trust = 1.0` passes samples through unchanged.
#[derive(Copy, Clone, Debug)]
pub struct LowPass {
    trust: f32,
    now: f32,
    last: f32,
}

impl LowPass {
    pub const fn new(trust: f32) -> Self {
        Self {
            trust,
            now: 0.0,
            last: 0.0,
        }
    }

    /// A filter with `trust = 1`, i.e. identity.
    pub const fn passthrough() -> Self {
        Self::new(1.0)
    }

    #[inline]
    pub fn trust(&self) -> f32 {
        self.trust
    }

    pub fn set_trust(&mut self, trust: f32) {
        self.trust = trust;
    }
}

impl Default for LowPass {
    fn default() -> Self {
        Self::passthrough()
    }
}

impl Filter for LowPass {
    fn f(&mut self, x: f32) -> f32 {
        self.last = self.now;
        self.now = x;
        self.now * self.trust + self.last * (1.0 - self.trust)
    }
}

/// Sliding-window median over the last `N` samples (`1 <= N <= 100`).
///
/// Until `N` samples have been seen the latest raw sample is returned. For even `N` the element at
/// index `N / 2` of the sorted window is returned.
pub struct Median<const N: usize> {
    window: [f32; N],
    head: usize,
    warmup: usize,
    latest: f32,
}

impl<const N: usize> Median<N> {
    const WINDOW_OK: () = assert!(N > 0 && N <= 100, "median window must be in 1..=100");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::WINDOW_OK;
        Self {
            window: [0.0; N],
            head: 0,
            warmup: N,
            latest: 0.0,
        }
    }
}

impl<const N: usize> Default for Median<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Filter for Median<N> {
    fn f(&mut self, x: f32) -> f32 {
        self.latest = x;
        self.warmup = self.warmup.saturating_sub(1);
        self.window[self.head] = x;
        self.head = (self.head + 1) % N;

        if self.warmup > 0 {
            return self.latest;
        }

        let mut sorted = self.window;
        sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        sorted[N / 2]
    }
}

/// Sliding-window mean over the last `N` samples (`1 <= N <= 100`).
///
/// The sum is maintained incrementally; float drift is not corrected.
pub struct Mean<const N: usize> {
    window: [f32; N],
    head: usize,
    warmup: usize,
    latest: f32,
    sum: f32,
}

impl<const N: usize> Mean<N> {
    const WINDOW_OK: () = assert!(N > 0 && N <= 100, "mean window must be in 1..=100");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::WINDOW_OK;
        Self {
            window: [0.0; N],
            head: 0,
            warmup: N,
            latest: 0.0,
            sum: 0.0,
        }
    }
}

impl<const N: usize> Default for Mean<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Filter for Mean<N> {
    fn f(&mut self, x: f32) -> f32 {
        self.latest = x;
        self.sum -= self.window[self.head];
        self.sum += x;
        self.window[self.head] = x;
        self.head = (self.head + 1) % N;
        self.warmup = self.warmup.saturating_sub(1);

        if self.warmup > 0 {
            self.latest
        } else {
            self.sum / N as f32
        }
    }
}
