// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Common interface for motors that report telemetry over CAN.
//!
//! Telemetry is written by the bus-receive path and read by the control loop. Every field is its
//! own atomic, so a reader may see one field from a newer frame than another; the control loop
//! tolerates that for one tick. Decoding therefore takes `&self` and a motor can live in a
//! `static` shared between an interrupt handler and the main loop.

use bxcan::{Frame, Id};
use core::sync::atomic::{AtomicU32, Ordering};

/// Error type for telemetry decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Frame identifier belongs to some other device.
    ForeignId,
    /// Fewer data bytes than the packet layout needs.
    TooShort { len: usize },
    /// Identifier matched but the packet type is not one we decode.
    UnknownPacket(u8),
}

/// `f32` stored in an `AtomicU32` by bit pattern.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    /// An atomic holding `0.0`.
    pub const fn zero() -> Self {
        Self(AtomicU32::new(0))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::zero()
    }
}

/// A motor whose feedback arrives as CAN frames.
pub trait CanMotor {
    /// Bus role (controller id) of this motor, 1-based.
    fn role(&self) -> u8;

    /// Update telemetry from one received frame's identifier and data bytes.
    fn decode(&self, id: Id, data: &[u8]) -> Result<(), FrameError>;

    /// Shaft speed in the family's native unit (rpm for geared motors, eRPM for VESC).
    fn speed(&self) -> f32;

    /// Continuous output angle in degrees.
    fn angle(&self) -> f32;

    /// Torque current in the family's native unit.
    fn torque(&self) -> f32;

    /// Driver temperature, for models that report it.
    fn temperature(&self) -> Option<f32> {
        None
    }

    /// Update telemetry from a received frame. Remote frames carry no data and are rejected.
    fn on_frame(&self, frame: &Frame) -> Result<(), FrameError> {
        match frame.data() {
            Some(data) => self.decode(frame.id(), data),
            None => Err(FrameError::TooShort { len: 0 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_f32_round_trips_bit_patterns() {
        let a = AtomicF32::zero();
        assert_eq!(a.load(), 0.0);
        for &v in &[1.5f32, -273.15, f32::MAX, f32::MIN_POSITIVE] {
            a.store(v);
            assert_eq!(a.load(), v);
        }
    }
}
