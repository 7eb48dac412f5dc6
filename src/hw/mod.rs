// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Board Support
//!
//! MCU-level wrappers for the STM32F777 chassis controller. Only built with the `firmware`
//! feature.

pub mod buzzer;
pub mod can;
pub mod logger;
pub mod micros;
pub mod pins;
pub mod usart;

pub use buzzer::{ActiveLevel, Buzzer};
pub use can::CanBus;
pub use micros::Micros;
pub use pins::BoardPins;
pub use usart::Usart;
