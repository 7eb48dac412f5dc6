// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Generic PID controller for closed-loop control.
//!
//! Works in `no_std` and does not allocate memory.
//!
//! Features on top of the textbook loop:
//! - dead zone: small errors produce exactly zero output and leave all state untouched
//! - integral separation: the I term drops out while `|error|` is above a threshold
//! - integral clamp and I-term clamp for anti-windup
//! - derivative on measurement or on error
//! - incomplete differentiation (low-pass filtered D term)
//! - position or increment (velocity-form) output
//!
//! Timing comes from a microsecond timestamp passed to [`Pid::adjust`]. Without a timestamp, or on
//! the first call, the controller returns 0 rather than guessing a `dt`.

use crate::control::filter::{Filter, LowPass};
use crate::control::timer::Stopwatch;
use micromath::F32Ext;

/// Symmetric clamp to `[-max, max]` that never panics.
#[inline]
pub(crate) fn limit(x: f32, max: f32) -> f32 {
    if x > max {
        max
    } else if x < -max {
        -max
    } else {
        x
    }
}

/// Where the derivative term takes its signal from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DerivativeSource {
    Error,
    /// Backward difference of the process variable itself. Avoids the kick on setpoint steps.
    Measurement,
}

/// How the terms are turned into an output.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// `out = P + I + D`
    Position,
    /// `out = previous_out + P + I + D` with P and D in difference form.
    Increment,
}

/// PID controller with tunable gains and output clamping.
#[derive(Clone, Debug)]
pub struct Pid {
    /// Proportional gain
    kp: f32,
    /// Integral gain
    ki: f32,
    /// Derivative gain
    kd: f32,

    /// Output clamp (symmetric)
    out_max: f32,
    /// I term clamp (symmetric)
    i_term_max: f32,
    /// `|error|` below this gives zero output
    dead_zone: f32,
    /// `|error|` at or above this disables the I term
    separation: f32,

    derivative: DerivativeSource,
    output: OutputMode,

    error_filter: LowPass,
    d_filter: LowPass,

    /// Integrator state
    integral: f32,
    prev_error: f32,
    prev2_error: f32,
    prev_measurement: f32,
    prev2_measurement: f32,
    last_out: f32,

    timer: Stopwatch,
}

impl Pid {
    /// Default integral separation threshold.
    pub const DEFAULT_SEPARATION: f32 = 400.0;

    /// Create a new PID controller.
    ///
    /// `kp`, `ki`, `kd` are the gain constants.
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self {
            kp,
            ki,
            kd,

            out_max: 1.0,
            i_term_max: 1.0,
            dead_zone: 0.0,
            separation: Self::DEFAULT_SEPARATION,

            derivative: DerivativeSource::Error,
            output: OutputMode::Position,

            error_filter: LowPass::passthrough(),
            d_filter: LowPass::passthrough(),

            integral: 0.0,
            prev_error: 0.0,
            prev2_error: 0.0,
            prev_measurement: 0.0,
            prev2_measurement: 0.0,
            last_out: 0.0,

            timer: Stopwatch::new(),
        }
    }

    /// Set the symmetric output limit.
    pub const fn with_output_limit(mut self, max: f32) -> Self {
        self.out_max = max;
        self
    }

    /// Set the symmetric I-term limit for anti-windup.
    pub const fn with_integral_limit(mut self, max: f32) -> Self {
        self.i_term_max = max;
        self
    }

    /// Errors smaller than `dead_zone` in magnitude produce zero output. A negative value disables it.
    pub const fn with_dead_zone(mut self, dead_zone: f32) -> Self {
        self.dead_zone = dead_zone;
        self
    }

    /// Errors at or above `threshold` in magnitude drop the I term for that tick.
    pub const fn with_separation_threshold(mut self, threshold: f32) -> Self {
        self.separation = threshold;
        self
    }

    /// Low-pass trust for the error input and for the derivative term (1.0 disables either).
    pub const fn with_filters(mut self, error_trust: f32, derivative_trust: f32) -> Self {
        self.error_filter = LowPass::new(error_trust);
        self.d_filter = LowPass::new(derivative_trust);
        self
    }

    pub const fn with_derivative_on_measurement(mut self, on: bool) -> Self {
        self.derivative = if on {
            DerivativeSource::Measurement
        } else {
            DerivativeSource::Error
        };
        self
    }

    pub const fn with_increment_output(mut self, on: bool) -> Self {
        self.output = if on {
            OutputMode::Increment
        } else {
            OutputMode::Position
        };
        self
    }

    /// Replace gains, keeping mode and history.
    pub fn set_gains(&mut self, kp: f32, ki: f32, kd: f32) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
    }

    /// Reset integrator, derivative history and timing.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
        self.prev2_error = 0.0;
        self.prev_measurement = 0.0;
        self.prev2_measurement = 0.0;
        self.last_out = 0.0;
        self.timer.reset();
    }

    #[inline]
    pub fn integral(&self) -> f32 {
        self.integral
    }

    #[inline]
    pub fn output_mode(&self) -> OutputMode {
        self.output
    }

    /// Run one control step.
    ///
    /// `target` — desired value
    /// `current` — measured value
    /// `now_us` — microsecond timestamp, `None` if no clock is available
    ///
    /// Returns the command in `[-out_max, out_max]`.
    pub fn adjust(&mut self, target: f32, current: f32, now_us: Option<u32>) -> f32 {
        let dt = match self.timer.lap(now_us) {
            Some(dt) => dt,
            None => return 0.0,
        };

        let raw_error = target - current;
        if raw_error.abs() < self.dead_zone {
            return 0.0;
        }

        let error = self.error_filter.f(raw_error);
        let increment = self.output == OutputMode::Increment;

        // ----- P term -----
        let p = if increment {
            self.kp * (error - self.prev_error)
        } else {
            self.kp * error
        };

        // ----- I term -----
        // Increment mode keeps only the current error: the output accumulator is the integrator.
        if self.ki != 0.0 {
            self.integral = if increment {
                error
            } else {
                self.integral + error * dt
            };
            self.integral = limit(self.integral, (self.i_term_max / self.ki).abs());
        } else {
            self.integral = 0.0;
        }

        let i = if error.abs() < self.separation {
            limit(self.ki * self.integral, self.i_term_max)
        } else {
            0.0
        };

        // ----- D term -----
        let slope = match (self.derivative, increment) {
            (DerivativeSource::Error, false) => error - self.prev_error,
            (DerivativeSource::Error, true) => error + self.prev2_error - 2.0 * self.prev_error,
            (DerivativeSource::Measurement, false) => current - self.prev_measurement,
            (DerivativeSource::Measurement, true) => {
                current + self.prev2_measurement - 2.0 * self.prev_measurement
            }
        };
        let d = self.kd * self.d_filter.f(slope / dt);

        self.prev2_error = self.prev_error;
        self.prev_error = error;
        self.prev2_measurement = self.prev_measurement;
        self.prev_measurement = current;

        // ----- Output clamp -----
        let out = if increment {
            p + i + d + self.last_out
        } else {
            p + i + d
        };
        let out = limit(out, self.out_max);
        self.last_out = out;

        out
    }
}
