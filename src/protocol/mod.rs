// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Wire Protocols
//!
//! - [`codec`] - Big-endian fixed-point buffer writer/reader used by the motor bus codecs.
//! - [`crc`] - CRC-8 for the upstream command link.
//! - [`messages`] - Velocity command, chassis mode and link frame types.
//! - [`parser`] - Link frame parser (byte stream and whole buffer) and frame encoder.
//! - [`link`] - Command link supervision: staleness, control flag, safe fallback.

pub mod codec;
pub mod crc;
pub mod link;
pub mod messages;
pub mod parser;

pub use link::CommandLink;
pub use messages::{ChassisMode, ChassisReport, LinkCommand, LinkError, VelocityCommand};
pub use parser::Parser;
