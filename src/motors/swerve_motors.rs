// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! The eight motors of a swerve base.
//!
//! Each wheel station has a GM6020 steering motor on the steering bus and a VESC-driven wheel
//! motor on the drive bus, both addressed by the station number (1..=4). Telemetry is decoded in
//! place, so a `SwerveMotors` can live in a `static` fed from the CAN receive path.

use crate::control::chassis::{ChassisCommand, WheelFeedback};
use crate::control::kinematics::Corner;
use crate::drivers::can_motor::{CanMotor, FrameError};
use crate::drivers::rm_motor::{group_frames, GroupCommand, RmModel, RmMotor, ENCODER_RANGE};
use crate::drivers::vesc::Vesc;

use bxcan::Frame;
use log::trace;

/// Steering motor model.
pub const STEER_MODEL: RmModel = RmModel::Gm6020;

/// Encoder ticks for a mounting offset given in whole degrees.
pub const fn steer_offset_from_degrees(deg: u32) -> u16 {
    (deg * ENCODER_RANGE as u32 / 360) as u16
}

/// Encoder value at which each steering motor points its wheel straight ahead.
pub const STEER_ENCODER_OFFSETS: [u16; 4] = [
    steer_offset_from_degrees(53 + 15 + 180),
    steer_offset_from_degrees(53 + 60 + 180),
    steer_offset_from_degrees(53 + 120),
    steer_offset_from_degrees(53),
];

pub struct SwerveMotors {
    steer: [RmMotor; 4],
    drive: [Vesc; 4],
}

impl Default for SwerveMotors {
    fn default() -> Self {
        Self::new()
    }
}

impl SwerveMotors {
    pub const fn new() -> Self {
        Self {
            steer: [
                RmMotor::new(STEER_MODEL, Corner::LeftFront.station()),
                RmMotor::new(STEER_MODEL, Corner::RightFront.station()),
                RmMotor::new(STEER_MODEL, Corner::RightRear.station()),
                RmMotor::new(STEER_MODEL, Corner::LeftRear.station()),
            ],
            drive: [
                Vesc::new(Corner::LeftFront.station()),
                Vesc::new(Corner::RightFront.station()),
                Vesc::new(Corner::RightRear.station()),
                Vesc::new(Corner::LeftRear.station()),
            ],
        }
    }

    #[inline]
    pub fn steer(&self, corner: Corner) -> &RmMotor {
        &self.steer[corner.index()]
    }

    #[inline]
    pub fn drive(&self, corner: Corner) -> &Vesc {
        &self.drive[corner.index()]
    }

    /// Preset the steering zero of every station.
    pub fn set_steer_offsets(&self, offsets: &[u16; 4]) {
        for (motor, &offset) in self.steer.iter().zip(offsets) {
            motor.set_encoder_offset(offset);
        }
    }

    /// Route a frame from the steering bus. Returns `false` if no steering motor claims it.
    pub fn on_steer_frame(&self, frame: &Frame) -> bool {
        dispatch(&self.steer, frame)
    }

    /// Route a frame from the drive bus. Returns `false` if no drive claims it.
    pub fn on_drive_frame(&self, frame: &Frame) -> bool {
        dispatch(&self.drive, frame)
    }

    /// Group frames carrying this tick's steering outputs.
    pub fn steer_frames(&self, cmd: &ChassisCommand) -> [Option<Frame>; 2] {
        let commands = Corner::ALL.map(|c| GroupCommand {
            role: c.station(),
            value: cmd.steer[c.index()],
        });
        group_frames(STEER_MODEL, &commands)
    }

    /// One command frame per drive for this tick.
    pub fn drive_frames(&self, cmd: &ChassisCommand) -> [Option<Frame>; 4] {
        Corner::ALL.map(|c| self.drive[c.index()].command_frame(cmd.drive[c.index()]))
    }
}

fn dispatch<M: CanMotor>(motors: &[M], frame: &Frame) -> bool {
    for motor in motors {
        match motor.on_frame(frame) {
            Ok(()) => return true,
            Err(FrameError::ForeignId) => continue,
            Err(e) => {
                trace!("motor {} dropped frame: {:?}", motor.role(), e);
                return false;
            }
        }
    }
    false
}

impl WheelFeedback for SwerveMotors {
    fn steer_angle(&self, corner: Corner) -> f32 {
        self.steer(corner).angle()
    }

    fn steer_speed(&self, corner: Corner) -> f32 {
        self.steer(corner).speed()
    }

    fn drive_speed(&self, corner: Corner) -> f32 {
        self.drive(corner).speed()
    }

    fn drive_current(&self, corner: Corner) -> f32 {
        self.drive(corner).torque()
    }
}
