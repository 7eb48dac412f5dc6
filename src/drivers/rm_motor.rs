// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Geared brushless motors on the shared-identifier CAN protocol (C610, C620, GM6020).
//!
//! Each motor reports on `feedback_base + role` with a standard identifier:
//!
//! | Bytes | Field |
//! | ----- | ----- |
//! | 0–1 | raw encoder, `u16`, 0..8191 per shaft turn |
//! | 2–3 | speed, `i16` rpm |
//! | 4–5 | torque current, `i16` |
//! | 6 | temperature, °C (C620 and GM6020) |
//!
//! Commands for up to four motors share one frame: roles 1–4 go in the low group frame, roles
//! 5–8 in the high group frame, each as a big-endian `i16` at offset `2 * (role - 1) % 8`.

use crate::drivers::can_motor::{AtomicF32, CanMotor, FrameError};
use crate::protocol::codec::{Reader, Writer};

use bxcan::{Data, Frame, Id, StandardId};
use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU16, AtomicU8, Ordering};

/// Encoder ticks per shaft revolution.
pub const ENCODER_RANGE: i32 = 8192;

const HALF_RANGE: i32 = ENCODER_RANGE / 2;
const TICKS_PER_DEGREE: f32 = ENCODER_RANGE as f32 / 360.0;

/// Hardware model within the family.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RmModel {
    C610,
    C620,
    Gm6020,
}

impl RmModel {
    /// Feedback identifier of role 0; role `n` reports on `base + n`.
    pub const fn feedback_base(self) -> u16 {
        match self {
            RmModel::C610 | RmModel::C620 => 0x200,
            RmModel::Gm6020 => 0x204,
        }
    }

    /// Group command identifiers `(low, high)` for roles 1–4 and 5–8.
    pub const fn command_ids(self) -> (u16, u16) {
        match self {
            RmModel::C610 | RmModel::C620 => (0x200, 0x1FF),
            RmModel::Gm6020 => (0x1FF, 0x2FF),
        }
    }

    /// Largest command magnitude the driver accepts.
    pub const fn command_max(self) -> f32 {
        match self {
            RmModel::C610 => 10_000.0,
            RmModel::C620 => 16_384.0,
            RmModel::Gm6020 => 30_000.0,
        }
    }

    pub const fn has_temperature(self) -> bool {
        !matches!(self, RmModel::C610)
    }

    fn limit(self, value: f32) -> f32 {
        let max = self.command_max();
        if value > max {
            max
        } else if value < -max {
            -max
        } else {
            value
        }
    }

    const fn feedback_len(self) -> usize {
        if self.has_temperature() {
            7
        } else {
            6
        }
    }
}

/// One motor's telemetry and encoder unwrap state.
pub struct RmMotor {
    model: RmModel,
    role: u8,

    raw_encoder: AtomicU16,
    last_encoder: AtomicU16,
    offset: AtomicU16,
    rounds: AtomicI32,
    seeded: AtomicBool,

    angle: AtomicF32,
    speed: AtomicI32,
    torque: AtomicI32,
    temperature: AtomicU8,
}

impl RmMotor {
    pub const fn new(model: RmModel, role: u8) -> Self {
        Self {
            model,
            role,

            raw_encoder: AtomicU16::new(0),
            last_encoder: AtomicU16::new(0),
            offset: AtomicU16::new(0),
            rounds: AtomicI32::new(0),
            seeded: AtomicBool::new(false),

            angle: AtomicF32::zero(),
            speed: AtomicI32::new(0),
            torque: AtomicI32::new(0),
            temperature: AtomicU8::new(0),
        }
    }

    #[inline]
    pub fn model(&self) -> RmModel {
        self.model
    }

    /// Standard identifier this motor reports on.
    #[inline]
    pub fn feedback_id(&self) -> u16 {
        self.model.feedback_base() + self.role as u16
    }

    /// Raw encoder value from the latest frame.
    #[inline]
    pub fn raw_encoder(&self) -> u16 {
        self.raw_encoder.load(Ordering::Relaxed)
    }

    /// Preset the encoder zero.
    ///
    /// The next frame is unwrapped against `offset` instead of seeding a new zero from itself.
    pub fn set_encoder_offset(&self, offset: u16) {
        self.offset.store(offset, Ordering::Relaxed);
        self.last_encoder.store(offset, Ordering::Relaxed);
        self.rounds.store(0, Ordering::Relaxed);
        self.seeded.store(true, Ordering::Relaxed);
    }

    /// Clamp a command to this model's range.
    pub fn limit_command(&self, value: f32) -> i16 {
        self.model.limit(value) as i16
    }

    fn unwrap_encoder(&self, encoder: u16) {
        if self.seeded.load(Ordering::Relaxed) {
            let last = self.last_encoder.load(Ordering::Relaxed) as i32;
            let delta = encoder as i32 - last;
            if delta < -HALF_RANGE {
                self.rounds.fetch_add(1, Ordering::Relaxed);
            } else if delta > HALF_RANGE {
                self.rounds.fetch_sub(1, Ordering::Relaxed);
            }
        } else {
            self.offset.store(encoder, Ordering::Relaxed);
            self.seeded.store(true, Ordering::Relaxed);
        }
        self.last_encoder.store(encoder, Ordering::Relaxed);

        let total = self.rounds.load(Ordering::Relaxed) * ENCODER_RANGE + encoder as i32
            - self.offset.load(Ordering::Relaxed) as i32;
        self.angle.store(total as f32 / TICKS_PER_DEGREE);
    }
}

impl CanMotor for RmMotor {
    fn role(&self) -> u8 {
        self.role
    }

    fn decode(&self, id: Id, data: &[u8]) -> Result<(), FrameError> {
        match id {
            Id::Standard(sid) if sid.as_raw() == self.feedback_id() => {}
            _ => return Err(FrameError::ForeignId),
        }
        if data.len() < self.model.feedback_len() {
            return Err(FrameError::TooShort { len: data.len() });
        }

        let mut r = Reader::new(data);
        let too_short = FrameError::TooShort { len: data.len() };
        let encoder = r.get_u16().ok_or(too_short)?;
        let speed = r.get_i16().ok_or(too_short)?;
        let torque = r.get_i16().ok_or(too_short)?;

        self.raw_encoder.store(encoder, Ordering::Relaxed);
        self.unwrap_encoder(encoder);
        self.speed.store(speed as i32, Ordering::Relaxed);
        self.torque.store(torque as i32, Ordering::Relaxed);
        if self.model.has_temperature() {
            if let Some(t) = r.get_u8() {
                self.temperature.store(t, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    fn speed(&self) -> f32 {
        self.speed.load(Ordering::Relaxed) as f32
    }

    fn angle(&self) -> f32 {
        self.angle.load()
    }

    fn torque(&self) -> f32 {
        self.torque.load(Ordering::Relaxed) as f32
    }

    fn temperature(&self) -> Option<f32> {
        if self.model.has_temperature() {
            Some(self.temperature.load(Ordering::Relaxed) as f32)
        } else {
            None
        }
    }
}

/// Command value for one motor of a group.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GroupCommand {
    pub role: u8,
    pub value: f32,
}

/// Pack group commands into the low and high group frames.
///
/// Values are clamped to the model's range. A group frame is only produced when at least one
/// command falls in it; unused slots are zero. Roles outside 1..=8 are ignored.
pub fn group_frames(model: RmModel, commands: &[GroupCommand]) -> [Option<Frame>; 2] {
    let mut bufs = [[0u8; 8]; 2];
    let mut used = [false; 2];

    for cmd in commands {
        let (group, slot) = match cmd.role {
            1..=4 => (0, cmd.role - 1),
            5..=8 => (1, cmd.role - 5),
            _ => continue,
        };
        let value = model.limit(cmd.value);
        let offset = 2 * slot as usize;
        if Writer::new(&mut bufs[group][offset..])
            .put_i16(value as i16)
            .is_ok()
        {
            used[group] = true;
        }
    }

    let (low, high) = model.command_ids();
    [
        group_frame(used[0], low, &bufs[0]),
        group_frame(used[1], high, &bufs[1]),
    ]
}

fn group_frame(used: bool, id: u16, buf: &[u8; 8]) -> Option<Frame> {
    if !used {
        return None;
    }
    let id = StandardId::new(id)?;
    let data = Data::new(buf)?;
    Some(Frame::new_data(id, data))
}
