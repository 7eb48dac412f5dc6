// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Device-Specific Drivers
//!
//! This module contains the CAN motor drivers that sit below the chassis controller. They are
//! hardware independent: they decode received frames and build frames to transmit, and leave the
//! bus itself to `hw`.
//!
//! ## Existing drivers
//!
//! - [`can_motor`] – `CanMotor` telemetry interface shared by both families
//! - [`rm_motor`] – C610 / C620 / GM6020 geared motors, used for steering
//! - [`vesc`] – VESC brushless wheel drivers, used for drive

pub mod can_motor;
pub mod rm_motor;
pub mod vesc;

pub use can_motor::{CanMotor, FrameError};
pub use rm_motor::{RmModel, RmMotor};
pub use vesc::{Vesc, VescCommand};
