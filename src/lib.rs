// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Swerve Chassis Core
//!
//! Motion-control core for a four-wheel swerve robot, written in Rust, targeting an STM32F777
//! MCU. Each wheel station has a steering motor and a drive motor; this crate turns a body
//! velocity command into per-wheel steering and drive commands every control tick.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`control`] | Control algorithms (timing, filters, PID, swerve kinematics, chassis controller) |
//! | [`drivers`] | Device-level CAN motor drivers (GM6020/C6x0, VESC) |
//! | [`motors`] | The eight-motor bank of the chassis |
//! | [`protocol`] | Fixed-point codec and the upstream command link |
//! | `hw` | MCU-level wrappers around USART, CAN, timers (feature `firmware`) |
//!
//! ## Getting Started
//!
//! Run the host tests:
//!
//! ```bash
//! cargo test
//! ```
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release --features firmware --target thumbv7em-none-eabihf
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

pub mod control;
pub mod drivers;
#[cfg(feature = "firmware")]
pub mod hw;
pub mod motors;
pub mod protocol;
