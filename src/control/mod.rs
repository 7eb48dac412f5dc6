// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Control Algorithms
//!
//! Building blocks for closed-loop motor control and the swerve chassis controller built on them.
//!
//! ## Modules
//!
//! - [`timer`] - Microsecond time base and interval measurement.
//! - [`filter`] - Scalar signal filters.
//! - [`pid`] - General-purpose PID controller implementation.
//! - [`kinematics`] - Swerve inverse kinematics and steering resolution.
//! - [`safety`] - Drive overcurrent monitor.
//! - [`chassis`] - Per-tick chassis controller.

pub mod chassis;
pub mod filter;
pub mod kinematics;
pub mod pid;
pub mod safety;
pub mod timer;

pub use chassis::{AlarmTone, ChassisCommand, ChassisConfig, Phase, PidLoop, SwerveChassis, WheelFeedback};
pub use kinematics::{Corner, SwerveKinematics, WheelTarget};
pub use pid::Pid;
pub use safety::{OvercurrentMonitor, SafetyState};
pub use timer::{MicrosClock, Stopwatch};
