// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Message types for the chassis and its upstream command link.
//!
//! Link frame layout:
//!
//! | Offset | Size | Field |
//! | ------ | ---- | ----- |
//! | 0 | 2 | header `55 AA` |
//! | 2 | 1 | payload length `n` |
//! | 3 | n | payload |
//! | 3 + n | 1 | CRC-8 over header, length and payload |
//! | 4 + n | 2 | trailer `0D 0A` |
//!
//! The command payload is 19 bytes: `x`, `y`, `z` as little-endian `f32`, then `ctrl_mode`,
//! `ctrl_flag`, `chassis_init` and four status bytes.

use byteorder::{ByteOrder, LittleEndian};

/// Frame header bytes.
pub const HEADER: [u8; 2] = [0x55, 0xAA];
/// Frame trailer bytes.
pub const TRAILER: [u8; 2] = [0x0D, 0x0A];
/// Header + length + CRC + trailer.
pub const FRAME_OVERHEAD: usize = 6;
/// Largest payload the link accepts.
pub const MAX_PAYLOAD: usize = 64;

pub const COMMAND_PAYLOAD_LEN: usize = 19;
pub const COMMAND_FRAME_LEN: usize = COMMAND_PAYLOAD_LEN + FRAME_OVERHEAD;

/// Error type for link frame decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Frame does not start with the header.
    BadHeader,
    /// Trailer missing or wrong.
    BadTrailer,
    /// Declared length unsupported or larger than the received data.
    BadLength(u8),
    /// CRC mismatch. `expected` is computed locally, `found` is the received byte.
    BadCrc { expected: u8, found: u8 },
}

/// Steering mode selector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ChassisMode {
    /// All wheels point along x.
    LockX,
    /// All wheels point along y.
    LockY,
    /// Full swerve kinematics.
    #[default]
    Normal,
}

impl ChassisMode {
    /// Unknown values fall back to `Normal`.
    pub const fn from_wire(b: u8) -> Self {
        match b {
            0 => ChassisMode::LockX,
            1 => ChassisMode::LockY,
            _ => ChassisMode::Normal,
        }
    }

    pub const fn to_wire(self) -> u8 {
        match self {
            ChassisMode::LockX => 0,
            ChassisMode::LockY => 1,
            ChassisMode::Normal => 2,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Body velocity command. Linear in m/s, angular in rad/s; only `angular.z` is used.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VelocityCommand {
    pub linear: Vector3,
    pub angular: Vector3,
    pub mode: ChassisMode,
}

impl VelocityCommand {
    /// All zero, `Normal` mode.
    pub const fn zero() -> Self {
        Self::planar(0.0, 0.0, 0.0, ChassisMode::Normal)
    }

    pub const fn planar(vx: f32, vy: f32, wz: f32, mode: ChassisMode) -> Self {
        Self {
            linear: Vector3 {
                x: vx,
                y: vy,
                z: 0.0,
            },
            angular: Vector3 {
                x: 0.0,
                y: 0.0,
                z: wz,
            },
            mode,
        }
    }
}

/// Status bytes relayed by the host, passed through untouched.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RobotStatus {
    pub robot_init: u8,
    pub path_mode: u8,
    pub sensor: u8,
    pub control_mode: u8,
}

/// Decoded command payload.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinkCommand {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub mode: ChassisMode,
    /// The host has control only while this is 1.
    pub ctrl_flag: u8,
    pub chassis_init: u8,
    pub status: RobotStatus,
}

impl Default for LinkCommand {
    fn default() -> Self {
        Self::safe_default()
    }
}

impl LinkCommand {
    /// What a malformed frame is replaced with: zero velocity, `Normal`, no control.
    pub const fn safe_default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            mode: ChassisMode::Normal,
            ctrl_flag: 0,
            chassis_init: 0,
            status: RobotStatus {
                robot_init: 0,
                path_mode: 0,
                sensor: 0,
                control_mode: 0,
            },
        }
    }

    #[inline]
    pub fn has_control(&self) -> bool {
        self.ctrl_flag == 1
    }

    pub fn velocity(&self) -> VelocityCommand {
        VelocityCommand::planar(self.x, self.y, self.z, self.mode)
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, LinkError> {
        if payload.len() != COMMAND_PAYLOAD_LEN {
            return Err(LinkError::BadLength(payload.len() as u8));
        }
        Ok(Self {
            x: LittleEndian::read_f32(&payload[0..4]),
            y: LittleEndian::read_f32(&payload[4..8]),
            z: LittleEndian::read_f32(&payload[8..12]),
            mode: ChassisMode::from_wire(payload[12]),
            ctrl_flag: payload[13],
            chassis_init: payload[14],
            status: RobotStatus {
                robot_init: payload[15],
                path_mode: payload[16],
                sensor: payload[17],
                control_mode: payload[18],
            },
        })
    }

    pub fn to_payload(&self) -> [u8; COMMAND_PAYLOAD_LEN] {
        let mut p = [0u8; COMMAND_PAYLOAD_LEN];
        LittleEndian::write_f32(&mut p[0..4], self.x);
        LittleEndian::write_f32(&mut p[4..8], self.y);
        LittleEndian::write_f32(&mut p[8..12], self.z);
        p[12] = self.mode.to_wire();
        p[13] = self.ctrl_flag;
        p[14] = self.chassis_init;
        p[15] = self.status.robot_init;
        p[16] = self.status.path_mode;
        p[17] = self.status.sensor;
        p[18] = self.status.control_mode;
        p
    }
}

/// One-byte chassis report sent back over the link.
///
/// Bit 0 is set once the startup self-test is complete, bit 1 while drive output is cut by the
/// overcurrent monitor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChassisReport {
    pub ready: bool,
    pub drive_fault: bool,
}

impl ChassisReport {
    pub const PAYLOAD_LEN: usize = 1;

    pub const fn to_payload(self) -> [u8; Self::PAYLOAD_LEN] {
        [(self.ready as u8) | ((self.drive_fault as u8) << 1)]
    }

    pub const fn from_payload(payload: [u8; Self::PAYLOAD_LEN]) -> Self {
        Self {
            ready: payload[0] & 0x01 != 0,
            drive_fault: payload[0] & 0x02 != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_wire_values() {
        assert_eq!(ChassisMode::from_wire(0), ChassisMode::LockX);
        assert_eq!(ChassisMode::from_wire(1), ChassisMode::LockY);
        assert_eq!(ChassisMode::from_wire(2), ChassisMode::Normal);
        assert_eq!(ChassisMode::from_wire(0xEE), ChassisMode::Normal);
        assert_eq!(ChassisMode::LockY.to_wire(), 1);
    }

    #[test]
    fn payload_fields_are_little_endian() {
        let mut p = [0u8; COMMAND_PAYLOAD_LEN];
        p[0..4].copy_from_slice(&1.5f32.to_le_bytes());
        p[8..12].copy_from_slice(&(-0.5f32).to_le_bytes());
        p[12] = 1;
        p[13] = 1;
        p[18] = 7;
        let cmd = LinkCommand::from_payload(&p).unwrap();
        assert_eq!(cmd.x, 1.5);
        assert_eq!(cmd.y, 0.0);
        assert_eq!(cmd.z, -0.5);
        assert_eq!(cmd.mode, ChassisMode::LockY);
        assert!(cmd.has_control());
        assert_eq!(cmd.status.control_mode, 7);
        assert_eq!(cmd.to_payload(), p);

        let v = cmd.velocity();
        assert_eq!(v.linear.x, 1.5);
        assert_eq!(v.angular.z, -0.5);
        assert_eq!(v.mode, ChassisMode::LockY);
    }

    #[test]
    fn wrong_payload_length_is_rejected() {
        assert_eq!(
            LinkCommand::from_payload(&[0; 12]),
            Err(LinkError::BadLength(12))
        );
    }

    #[test]
    fn safe_default_has_no_control() {
        let d = LinkCommand::safe_default();
        assert!(!d.has_control());
        assert_eq!(d.velocity(), VelocityCommand::zero());
    }

    #[test]
    fn report_bits() {
        let r = ChassisReport {
            ready: true,
            drive_fault: true,
        };
        assert_eq!(r.to_payload(), [0x03]);
        assert_eq!(ChassisReport::default().to_payload(), [0x00]);
        assert_eq!(
            ChassisReport::from_payload([0x02]),
            ChassisReport {
                ready: false,
                drive_fault: true
            }
        );
    }
}
