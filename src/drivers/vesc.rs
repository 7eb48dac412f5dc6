// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! VESC brushless wheel drivers over CAN.
//!
//! VESC uses 29-bit extended identifiers: the low byte is the controller id and the next byte the
//! packet type. Each drive gets its own command frame every tick, there is no grouping.
//!
//! Only two status packets are decoded:
//! - `STATUS` — eRPM (`i32`), motor current (`i16`, 0.1 A), duty (`i16`, 0.1 %)
//! - `STATUS_4` — bytes 6–7 hold the PID position (`u16`, 1/50 °)

use crate::drivers::can_motor::{AtomicF32, CanMotor, FrameError};
use crate::protocol::codec::{Reader, Writer};

use bxcan::{Data, ExtendedId, Frame, Id};
use core::sync::atomic::{AtomicI32, Ordering};

/// VESC CAN packet types.
pub mod packet {
    pub const SET_DUTY: u8 = 0;
    pub const SET_CURRENT: u8 = 1;
    pub const SET_CURRENT_BRAKE: u8 = 2;
    pub const SET_RPM: u8 = 3;
    pub const SET_POS: u8 = 4;
    pub const STATUS: u8 = 9;
    pub const STATUS_4: u8 = 16;
}

/// One drive command. Units are what the caller thinks in; scaling happens on encode.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum VescCommand {
    /// Electrical rpm.
    Rpm(f32),
    /// Motor current, mA.
    Current(f32),
    /// Duty cycle, -1.0..=1.0.
    Duty(f32),
    /// Position, degrees.
    Position(f32),
    /// Braking current, A.
    BrakeCurrent(f32),
}

impl VescCommand {
    pub const fn packet(self) -> u8 {
        match self {
            VescCommand::Rpm(_) => packet::SET_RPM,
            VescCommand::Current(_) => packet::SET_CURRENT,
            VescCommand::Duty(_) => packet::SET_DUTY,
            VescCommand::Position(_) => packet::SET_POS,
            VescCommand::BrakeCurrent(_) => packet::SET_CURRENT_BRAKE,
        }
    }

    /// Value and fixed-point scale for the wire.
    fn scaled(self) -> (f32, f32) {
        match self {
            VescCommand::Rpm(v) => (v, 1.0),
            VescCommand::Current(v) => (v, 1.0),
            VescCommand::Duty(v) => (v, 100_000.0),
            VescCommand::Position(v) => (v, 1_000_000.0),
            VescCommand::BrakeCurrent(v) => (v, 1_000.0),
        }
    }

    /// Build the command frame for controller `controller_id`.
    pub fn to_frame(self, controller_id: u8) -> Option<Frame> {
        let id = ExtendedId::new(controller_id as u32 | ((self.packet() as u32) << 8))?;
        let mut buf = [0u8; 8];
        let (value, scale) = self.scaled();
        Writer::new(&mut buf).put_scaled_i32(value, scale).ok()?;
        Some(Frame::new_data(id, Data::new(&buf)?))
    }
}

impl Default for VescCommand {
    fn default() -> Self {
        VescCommand::Current(0.0)
    }
}

/// Telemetry of one VESC.
pub struct Vesc {
    controller_id: u8,
    erpm: AtomicI32,
    current: AtomicF32,
    duty: AtomicF32,
    angle: AtomicF32,
}

impl Vesc {
    pub const fn new(controller_id: u8) -> Self {
        Self {
            controller_id,
            erpm: AtomicI32::new(0),
            current: AtomicF32::zero(),
            duty: AtomicF32::zero(),
            angle: AtomicF32::zero(),
        }
    }

    /// Latest duty cycle.
    pub fn duty(&self) -> f32 {
        self.duty.load()
    }

    /// Command frame for this controller.
    pub fn command_frame(&self, cmd: VescCommand) -> Option<Frame> {
        cmd.to_frame(self.controller_id)
    }
}

impl CanMotor for Vesc {
    fn role(&self) -> u8 {
        self.controller_id
    }

    fn decode(&self, id: Id, data: &[u8]) -> Result<(), FrameError> {
        let raw = match id {
            Id::Extended(eid) => eid.as_raw(),
            Id::Standard(_) => return Err(FrameError::ForeignId),
        };
        if (raw & 0xFF) as u8 != self.controller_id {
            return Err(FrameError::ForeignId);
        }
        let too_short = FrameError::TooShort { len: data.len() };

        match ((raw >> 8) & 0xFF) as u8 {
            packet::STATUS => {
                let mut r = Reader::new(data);
                let erpm = r.get_i32().ok_or(too_short)?;
                let current = r.get_i16().ok_or(too_short)?;
                let duty = r.get_scaled_i16(1_000.0).ok_or(too_short)?;
                self.erpm.store(erpm, Ordering::Relaxed);
                self.current.store(current as f32 * 100.0);
                self.duty.store(duty);
                Ok(())
            }
            packet::STATUS_4 => {
                let angle = Reader::at(data, 6)
                    .get_scaled_u16(50.0)
                    .ok_or(too_short)?;
                self.angle.store(angle);
                Ok(())
            }
            other => Err(FrameError::UnknownPacket(other)),
        }
    }

    fn speed(&self) -> f32 {
        self.erpm.load(Ordering::Relaxed) as f32
    }

    fn angle(&self) -> f32 {
        self.angle.load()
    }

    /// Motor current, mA.
    fn torque(&self) -> f32 {
        self.current.load()
    }
}
