// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Actuator Abstractions
//!
//! Motor-level wrappers that sit above the device-level drivers in `drivers`.
//!
//! ## Modules
//!
//! - [`swerve_motors`] - The steering and drive motors of the four wheel stations.

pub mod swerve_motors;

pub use swerve_motors::{SwerveMotors, STEER_ENCODER_OFFSETS};
