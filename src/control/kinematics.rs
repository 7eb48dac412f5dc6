// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Swerve drive kinematics.
//!
//! Pure functions from a body velocity to per-wheel `(speed, angle)` targets, plus the steering
//! angle resolution that keeps each steering motor within a quarter turn of where it already is.
//!
//! Angles are in degrees and unbounded: a steering angle of 725° is two full turns plus 5°. Speeds
//! are motor-shaft rpm equivalents (see [`mps_to_motor_rpm`]).

use core::f32::consts::PI;
use micromath::F32Ext;

/// One wheel station. Stations are numbered 1..=4 around the chassis.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Corner {
    LeftFront,
    RightFront,
    RightRear,
    LeftRear,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::LeftFront,
        Corner::RightFront,
        Corner::RightRear,
        Corner::LeftRear,
    ];

    /// Zero-based array index.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Corner::LeftFront => 0,
            Corner::RightFront => 1,
            Corner::RightRear => 2,
            Corner::LeftRear => 3,
        }
    }

    /// One-based station number, which is also the motor role on both buses.
    #[inline]
    pub const fn station(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Signs applied to the rotational `(x, y)` contribution at this corner.
    const fn rotation_signs(self) -> (f32, f32) {
        match self {
            Corner::LeftFront => (1.0, 1.0),
            Corner::RightFront => (-1.0, 1.0),
            Corner::RightRear => (-1.0, -1.0),
            Corner::LeftRear => (1.0, -1.0),
        }
    }

    /// Sign of the half-angle used as this corner's parking angle.
    const fn lock_sign(self) -> f32 {
        match self {
            Corner::LeftFront | Corner::RightRear => 1.0,
            Corner::RightFront | Corner::LeftRear => -1.0,
        }
    }
}

/// A per-wheel setpoint.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct WheelTarget {
    /// Drive speed, motor rpm equivalent.
    pub speed: f32,
    /// Steering angle, degrees.
    pub angle: f32,
}

/// Conversion factor from wheel linear speed (m/s) to motor shaft rpm.
///
/// `ratio` is the factor from wheel revolutions to the commanded motor unit (gear ratio times
/// pole pairs for an eRPM-commanded drive).
#[inline]
pub fn mps_to_motor_rpm(wheel_radius: f32, ratio: f32) -> f32 {
    60.0 * ratio / (2.0 * PI * wheel_radius)
}

/// Inverse of [`mps_to_motor_rpm`] applied to a speed.
#[inline]
pub fn motor_rpm_to_mps(rpm: f32, wheel_radius: f32, ratio: f32) -> f32 {
    rpm / mps_to_motor_rpm(wheel_radius, ratio)
}

/// Rotate a robot-frame velocity into the world frame given the current yaw in degrees.
pub fn robot_to_world(vx: f32, vy: f32, yaw_deg: f32) -> (f32, f32) {
    let yaw = yaw_deg * PI / 180.0;
    let (s, c) = (yaw.sin(), yaw.cos());
    (vx * c + vy * s, -(vx * s - vy * c))
}

/// Index of the 360° band an angle lies in.
///
/// Non-negative angles use `trunc(a / 360)`; negative angles use `trunc(a / 360) - 1`.
#[inline]
pub fn period_index(angle: f32) -> i32 {
    let n = (angle / 360.0) as i32;
    if angle >= 0.0 {
        n
    } else {
        n - 1
    }
}

/// Pick the steering target closest to `current` that points the wheel along `target`.
///
/// The target is first moved into the same 360° band as `current`. If the remaining rotation is
/// more than 270° the target is wrapped by a full turn; if it is more than 90° the target is
/// flipped by half a turn and the drive speed is negated.
pub fn resolve_steering(current: f32, target: f32, speed: f32) -> WheelTarget {
    let shift = period_index(current) - period_index(target);
    let mut angle = target + shift as f32 * 360.0;
    let mut speed = speed;

    let error = (angle - current).abs();
    let dir = if angle < current { 1.0 } else { -1.0 };

    if error > 270.0 {
        angle += dir * 360.0;
    } else if error > 90.0 {
        angle += dir * 180.0;
        speed = -speed;
    }

    WheelTarget { speed, angle }
}

/// Geometry of a square four-corner swerve base.
#[derive(Copy, Clone, Debug)]
pub struct SwerveKinematics {
    chassis_radius: f32,
    theta_deg: f32,
    half_sin: f32,
    half_cos: f32,
    rpm_per_mps: f32,
}

impl SwerveKinematics {
    /// `chassis_radius` is the distance from the chassis centre to each wheel (m), `theta_deg` the
    /// angle between the diagonals, `wheel_radius` in metres, `drive_ratio` as for
    /// [`mps_to_motor_rpm`].
    pub fn new(chassis_radius: f32, theta_deg: f32, wheel_radius: f32, drive_ratio: f32) -> Self {
        let half = theta_deg / 2.0 * PI / 180.0;
        Self {
            chassis_radius,
            theta_deg,
            half_sin: half.sin(),
            half_cos: half.cos(),
            rpm_per_mps: mps_to_motor_rpm(wheel_radius, drive_ratio),
        }
    }

    #[inline]
    pub fn rpm_per_mps(&self) -> f32 {
        self.rpm_per_mps
    }

    #[inline]
    pub fn theta_deg(&self) -> f32 {
        self.theta_deg
    }

    /// Steering angle a corner parks at when the chassis is locked.
    #[inline]
    pub fn lock_angle(&self, corner: Corner) -> f32 {
        corner.lock_sign() * self.theta_deg / 2.0
    }

    /// Wheel velocity components (m/s) at `corner` for a body command.
    pub fn wheel_velocity(&self, corner: Corner, vx: f32, vy: f32, wz: f32) -> (f32, f32) {
        let (sx, sy) = corner.rotation_signs();
        (
            vx + sx * self.chassis_radius * self.half_sin * wz,
            vy + sy * self.chassis_radius * self.half_cos * wz,
        )
    }

    /// Inverse kinematics for one corner. The angle is in `(-180, 180]`.
    pub fn solve(&self, corner: Corner, vx: f32, vy: f32, wz: f32) -> WheelTarget {
        let (wx, wy) = self.wheel_velocity(corner, vx, vy, wz);
        WheelTarget {
            speed: (wx * wx + wy * wy).sqrt() * self.rpm_per_mps,
            angle: wy.atan2(wx) * 180.0 / PI,
        }
    }
}
