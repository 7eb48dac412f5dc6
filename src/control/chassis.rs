// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Swerve chassis controller.
//!
//! Turns one [`VelocityCommand`] per tick into steering outputs and drive commands for the four
//! wheel stations:
//!
//! 1. Startup self-test: hold for 1 s, spin clockwise for 2 s, spin counter-clockwise for 2 s.
//! 2. Clamp the command and solve kinematics for the selected [`ChassisMode`].
//! 3. With a near-zero command, brake and park the wheels at their lock angles once they have
//!    been still for 2 s.
//! 4. Resolve each steering target to the shortest rotation, reversing the drive if needed.
//! 5. Ramp drive speed, and refuse to reverse a wheel that is still spinning fast.
//! 6. Run the steering position → speed PID cascade.
//! 7. Cut drive output while the overcurrent monitor is faulted.
//!
//! The controller never fails: every path produces a bounded command.

use crate::control::kinematics::{resolve_steering, Corner, SwerveKinematics, WheelTarget};
use crate::control::pid::{limit, Pid};
use crate::control::safety::{OvercurrentMonitor, SafetyState};
use crate::control::timer::{elapsed_us, MicrosClock, Stopwatch};
use crate::drivers::vesc::VescCommand;
use crate::protocol::messages::{ChassisMode, VelocityCommand};

use log::info;
use micromath::F32Ext;

/// Telemetry the controller reads each tick.
pub trait WheelFeedback {
    /// Continuous steering angle, degrees.
    fn steer_angle(&self, corner: Corner) -> f32;
    /// Steering motor speed, rpm.
    fn steer_speed(&self, corner: Corner) -> f32;
    /// Drive motor speed, eRPM.
    fn drive_speed(&self, corner: Corner) -> f32;
    /// Drive motor current, mA.
    fn drive_current(&self, corner: Corner) -> f32;
}

/// The three loops each wheel station owns.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PidLoop {
    SteerSpeed,
    SteerPosition,
    DriveSpeed,
}

impl PidLoop {
    #[inline]
    const fn index(self) -> usize {
        match self {
            PidLoop::SteerSpeed => 0,
            PidLoop::SteerPosition => 1,
            PidLoop::DriveSpeed => 2,
        }
    }
}

/// Startup sequence state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    SelfTestHold,
    SelfTestSpinCw,
    SelfTestSpinCcw,
    Ready,
}

/// Buzzer request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AlarmTone {
    pub freq_hz: u32,
    pub duty_percent: u8,
}

impl AlarmTone {
    pub const OVERCURRENT: AlarmTone = AlarmTone {
        freq_hz: 5,
        duty_percent: 50,
    };
}

/// Output of one controller tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChassisCommand {
    /// Steering motor commands, in the steering driver's native unit.
    pub steer: [f32; 4],
    pub drive: [VescCommand; 4],
    /// Set on the tick the overcurrent monitor trips.
    pub alarm: Option<AlarmTone>,
    pub safety: SafetyState,
}

impl ChassisCommand {
    /// Zero steering, zero drive current.
    pub const fn idle() -> Self {
        Self {
            steer: [0.0; 4],
            drive: [VescCommand::Current(0.0); 4],
            alarm: None,
            safety: SafetyState::Nominal,
        }
    }
}

impl Default for ChassisCommand {
    fn default() -> Self {
        Self::idle()
    }
}

/// Tuning and geometry.
#[derive(Copy, Clone, Debug)]
pub struct ChassisConfig {
    /// Drive wheel radius, m.
    pub wheel_radius: f32,
    /// Centre-to-wheel distance, m.
    pub chassis_radius: f32,
    /// Angle between the chassis diagonals, degrees.
    pub theta_deg: f32,
    /// Wheel revolutions to drive eRPM (gear ratio × pole pairs).
    pub drive_ratio: f32,

    /// Symmetric command limits: vx, vy (m/s), wz (rad/s).
    pub max_vx: f32,
    pub max_vy: f32,
    pub max_wz: f32,

    /// Wheel acceleration limit, m/s². `None` disables ramping.
    pub accel_limit: Option<f32>,

    /// Per-axis magnitude at or below which a command counts as stop.
    pub stop_deadband: f32,
    /// Braking current while stopped, A.
    pub brake_current: f32,
    /// Drive speed (eRPM) below which a wheel counts as still.
    pub lock_speed: f32,
    /// How long a wheel must be still before it parks at its lock angle.
    pub lock_delay_us: u32,
    /// Drive speed (eRPM) above which a wheel may not be reversed.
    pub reverse_guard_speed: f32,

    /// Drive current limit for closed-loop drive, mA.
    pub drive_current_max: f32,
    /// Drive through the speed PID and current commands instead of eRPM.
    pub drive_closed_loop: bool,

    /// Overcurrent ceiling, mA.
    pub overcurrent_ceiling: f32,
    pub overcurrent_hold_us: u32,
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            wheel_radius: 0.055,
            chassis_radius: 0.321,
            theta_deg: 99.26,
            drive_ratio: 21.0,

            max_vx: 3.0,
            max_vy: 3.0,
            max_wz: 4.0,

            accel_limit: Some(1.5),

            stop_deadband: 0.02,
            brake_current: 10.0,
            lock_speed: 100.0,
            lock_delay_us: 2_000_000,
            reverse_guard_speed: 1_000.0,

            drive_current_max: 20_000.0,
            drive_closed_loop: false,

            overcurrent_ceiling: 25_000.0,
            overcurrent_hold_us: OvercurrentMonitor::DEFAULT_HOLD_US,
        }
    }
}

/// Steering motor speed loop (rpm in, motor command out).
pub fn default_steer_speed_pid() -> Pid {
    Pid::new(12.0, 0.1, 0.0)
        .with_integral_limit(400.0)
        .with_output_limit(30_000.0)
        .with_dead_zone(0.0)
        .with_filters(0.8, 1.0)
        .with_derivative_on_measurement(true)
        .with_increment_output(true)
}

/// Steering angle loop (degrees in, rpm target out).
pub fn default_steer_position_pid() -> Pid {
    Pid::new(120.0, 0.0, 0.2)
        .with_integral_limit(400.0)
        .with_output_limit(2_000.0)
        .with_dead_zone(0.2)
        .with_filters(0.8, 0.1)
        .with_derivative_on_measurement(true)
        .with_increment_output(false)
}

/// Drive speed loop for closed-loop drive (eRPM in, mA out).
pub fn default_drive_speed_pid() -> Pid {
    Pid::new(2.0, 0.5, 0.0)
        .with_integral_limit(5_000.0)
        .with_output_limit(20_000.0)
        .with_filters(1.0, 1.0)
}

/// Per-station state.
#[derive(Copy, Clone, Debug, Default)]
pub struct WheelState {
    /// Setpoint sent this tick.
    pub target: WheelTarget,
    /// Last resolved steering angle, degrees, unbounded.
    pub current_angle: f32,
    /// Ramp output from the previous tick.
    last_speed: f32,
    /// Last speed the reverse guard let through.
    prev_command: f32,
    /// When this wheel became still under a stop command.
    lock_since: Option<u32>,
}

pub struct SwerveChassis<C: MicrosClock> {
    config: ChassisConfig,
    kin: SwerveKinematics,
    clock: Option<C>,

    phase: Phase,
    started_at: Option<u32>,
    stopwatch: Stopwatch,

    wheels: [WheelState; 4],
    pids: [[Pid; 3]; 4],
    monitor: OvercurrentMonitor,
}

impl<C: MicrosClock> SwerveChassis<C> {
    const HOLD_END_US: u32 = 1_000_000;
    const SPIN_CW_END_US: u32 = 3_000_000;
    const SPIN_CCW_END_US: u32 = 5_000_000;

    /// Build a controller with the default PID tuning. Without a clock it stays uninitialized and
    /// outputs [`ChassisCommand::idle`].
    pub fn new(config: ChassisConfig, clock: Option<C>) -> Self {
        let steer_speed = default_steer_speed_pid();
        let steer_position = default_steer_position_pid();
        let drive_speed = default_drive_speed_pid();

        Self {
            config,
            kin: SwerveKinematics::new(
                config.chassis_radius,
                config.theta_deg,
                config.wheel_radius,
                config.drive_ratio,
            ),
            clock,

            phase: Phase::Uninitialized,
            started_at: None,
            stopwatch: Stopwatch::new(),

            wheels: [WheelState::default(); 4],
            pids: core::array::from_fn(|_| {
                [
                    steer_speed.clone(),
                    steer_position.clone(),
                    drive_speed.clone(),
                ]
            }),
            monitor: OvercurrentMonitor::new(
                config.overcurrent_ceiling,
                config.overcurrent_hold_us,
            ),
        }
    }

    /// Install a tick source. Every timer restarts on the new time base: the first tick after this
    /// runs every loop with no `dt`, and an unfinished self-test starts over.
    pub fn register_clock(&mut self, clock: C) {
        self.clock = Some(clock);
        self.stopwatch.reset();
        self.monitor.restart_timer();
        if self.phase != Phase::Ready {
            self.started_at = None;
        }
        for wheel in self.wheels.iter_mut() {
            wheel.lock_since = None;
        }
        for pid in self.pids.iter_mut().flatten() {
            pid.reset();
        }
    }

    /// Restart the self-test sequence.
    pub fn rearm(&mut self) {
        info!("chassis re-armed, restarting self-test");
        self.phase = Phase::Uninitialized;
        self.started_at = None;
        self.stopwatch.reset();
        for wheel in self.wheels.iter_mut() {
            wheel.last_speed = 0.0;
            wheel.prev_command = 0.0;
            wheel.lock_since = None;
        }
        for pid in self.pids.iter_mut().flatten() {
            pid.reset();
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    #[inline]
    pub fn config(&self) -> &ChassisConfig {
        &self.config
    }

    #[inline]
    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kin
    }

    #[inline]
    pub fn wheel(&self, corner: Corner) -> &WheelState {
        &self.wheels[corner.index()]
    }

    /// Direct access to one loop's controller for tuning.
    pub fn pid_mut(&mut self, corner: Corner, pid_loop: PidLoop) -> &mut Pid {
        &mut self.pids[corner.index()][pid_loop.index()]
    }

    /// Run one control tick.
    pub fn tick<F: WheelFeedback>(&mut self, cmd: &VelocityCommand, fb: &F) -> ChassisCommand {
        let now = self.clock.as_ref().map(|c| c.micros());
        let dt = self.stopwatch.lap(now);

        let currents = Corner::ALL.map(|c| fb.drive_current(c));
        let safety = self.monitor.check(now, &currents);

        let mut out = ChassisCommand::idle();
        self.advance_phase(now);

        match self.phase {
            Phase::Uninitialized | Phase::SelfTestHold => {}
            Phase::SelfTestSpinCw => self.self_test_spin(1.0, now, fb, &mut out),
            Phase::SelfTestSpinCcw => self.self_test_spin(-1.0, now, fb, &mut out),
            Phase::Ready => self.drive(cmd, now, dt, fb, &mut out),
        }

        if safety.is_fault() {
            out.drive = [VescCommand::Current(0.0); 4];
            // Output resumes from standstill once the fault clears.
            for (wheel, pids) in self.wheels.iter_mut().zip(self.pids.iter_mut()) {
                wheel.last_speed = 0.0;
                wheel.prev_command = 0.0;
                pids[PidLoop::DriveSpeed.index()].reset();
            }
        }
        if safety == SafetyState::Tripped {
            out.alarm = Some(AlarmTone::OVERCURRENT);
        }
        out.safety = safety;
        out
    }

    fn advance_phase(&mut self, now: Option<u32>) {
        if self.phase == Phase::Ready {
            return;
        }
        let now = match now {
            Some(now) => now,
            None => return,
        };
        let start = *self.started_at.get_or_insert(now);
        let elapsed = elapsed_us(now, start);

        let next = if elapsed < Self::HOLD_END_US {
            Phase::SelfTestHold
        } else if elapsed < Self::SPIN_CW_END_US {
            Phase::SelfTestSpinCw
        } else if elapsed < Self::SPIN_CCW_END_US {
            Phase::SelfTestSpinCcw
        } else {
            Phase::Ready
        };

        if next != self.phase {
            info!("chassis {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }
    }

    fn self_test_spin<F: WheelFeedback>(
        &mut self,
        wz: f32,
        now: Option<u32>,
        fb: &F,
        out: &mut ChassisCommand,
    ) {
        for corner in Corner::ALL {
            let i = corner.index();
            let solved = self.kin.solve(corner, 0.0, 0.0, wz);
            let resolved = resolve_steering(self.wheels[i].current_angle, solved.angle, solved.speed);

            self.wheels[i].current_angle = resolved.angle;
            self.wheels[i].target = resolved;
            out.drive[i] = VescCommand::Rpm(resolved.speed);
            out.steer[i] = self.steer_cascade(corner, resolved.angle, now, fb);
        }
    }

    fn drive<F: WheelFeedback>(
        &mut self,
        cmd: &VelocityCommand,
        now: Option<u32>,
        dt: Option<f32>,
        fb: &F,
        out: &mut ChassisCommand,
    ) {
        let vx = limit(cmd.linear.x, self.config.max_vx);
        let vy = limit(cmd.linear.y, self.config.max_vy);
        let wz = limit(cmd.angular.z, self.config.max_wz);

        let deadband = self.config.stop_deadband;
        let stopped = vx.abs() <= deadband && vy.abs() <= deadband && wz.abs() <= deadband;
        let k = self.kin.rpm_per_mps();

        for corner in Corner::ALL {
            let i = corner.index();
            let measured = fb.drive_speed(corner);

            let (target, braking) = match cmd.mode {
                ChassisMode::Normal if stopped => {
                    let solved = self.kin.solve(corner, vx, vy, wz);
                    (self.park(corner, solved, measured, now), true)
                }
                ChassisMode::Normal => {
                    self.wheels[i].lock_since = None;
                    (self.kin.solve(corner, vx, vy, wz), false)
                }
                ChassisMode::LockX => {
                    self.wheels[i].lock_since = None;
                    let t = WheelTarget {
                        speed: vx * k,
                        angle: 0.0,
                    };
                    (t, false)
                }
                ChassisMode::LockY => {
                    self.wheels[i].lock_since = None;
                    let t = WheelTarget {
                        speed: vy * k,
                        angle: 90.0,
                    };
                    (t, false)
                }
            };

            let resolved = resolve_steering(self.wheels[i].current_angle, target.angle, target.speed);
            let wheel = &mut self.wheels[i];
            wheel.current_angle = resolved.angle;

            let drive_cmd = if braking {
                wheel.last_speed = 0.0;
                wheel.prev_command = 0.0;
                wheel.target = WheelTarget {
                    speed: 0.0,
                    angle: resolved.angle,
                };
                self.pids[i][PidLoop::DriveSpeed.index()].reset();
                VescCommand::BrakeCurrent(self.config.brake_current)
            } else {
                let speed = match self.config.accel_limit {
                    Some(accel) => ramp(wheel.last_speed, resolved.speed, accel * dt.unwrap_or(0.0) * k),
                    None => resolved.speed,
                };
                wheel.last_speed = speed;

                let reversing = wheel.prev_command * speed < 0.0;
                let guarded = if reversing && measured.abs() >= self.config.reverse_guard_speed {
                    0.0
                } else {
                    wheel.prev_command = speed;
                    speed
                };
                wheel.target = WheelTarget {
                    speed: guarded,
                    angle: resolved.angle,
                };

                if self.config.drive_closed_loop {
                    let current = self.pids[i][PidLoop::DriveSpeed.index()].adjust(guarded, measured, now);
                    VescCommand::Current(limit(current, self.config.drive_current_max))
                } else {
                    VescCommand::Rpm(guarded)
                }
            };

            out.drive[i] = drive_cmd;
            out.steer[i] = self.steer_cascade(corner, resolved.angle, now, fb);
        }
    }

    /// Steering target for a wheel under a stop command.
    ///
    /// A wheel that has been still for longer than the lock delay parks at its lock angle.
    /// Otherwise a slow wheel keeps its current steering angle.
    fn park(
        &mut self,
        corner: Corner,
        solved: WheelTarget,
        measured: f32,
        now: Option<u32>,
    ) -> WheelTarget {
        let wheel = &mut self.wheels[corner.index()];
        let still = measured.abs() < self.config.lock_speed;
        if !still {
            wheel.lock_since = None;
        }

        let still_for = match (still, now) {
            (true, Some(now)) => Some(elapsed_us(now, *wheel.lock_since.get_or_insert(now))),
            _ => None,
        };

        let mut target = solved;
        match still_for {
            Some(us) if us > self.config.lock_delay_us => {
                target.angle = self.kin.lock_angle(corner);
            }
            _ => {
                if target.speed.abs() < self.config.lock_speed {
                    target.angle = wheel.current_angle;
                }
            }
        }
        target
    }

    fn steer_cascade<F: WheelFeedback>(
        &mut self,
        corner: Corner,
        angle: f32,
        now: Option<u32>,
        fb: &F,
    ) -> f32 {
        let pids = &mut self.pids[corner.index()];
        let speed_target =
            pids[PidLoop::SteerPosition.index()].adjust(angle, fb.steer_angle(corner), now);
        pids[PidLoop::SteerSpeed.index()].adjust(speed_target, fb.steer_speed(corner), now)
    }
}

/// Limit growth of `|target|` relative to `last` to `step`. Shrinking passes through.
fn ramp(last: f32, target: f32, step: f32) -> f32 {
    if target > 0.0 && target >= last {
        target.min(last + step)
    } else if target < 0.0 && target <= last {
        target.max(last - step)
    } else {
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct FakeClock(Cell<u32>);

    impl FakeClock {
        fn new() -> Self {
            Self(Cell::new(0))
        }
        fn set(&self, t: u32) {
            self.0.set(t);
        }
    }

    impl MicrosClock for FakeClock {
        fn micros(&self) -> u32 {
            self.0.get()
        }
    }

    #[derive(Default)]
    struct FakeWheels {
        steer_angle: [f32; 4],
        steer_speed: [f32; 4],
        drive_speed: [f32; 4],
        drive_current: [f32; 4],
    }

    impl WheelFeedback for FakeWheels {
        fn steer_angle(&self, c: Corner) -> f32 {
            self.steer_angle[c.index()]
        }
        fn steer_speed(&self, c: Corner) -> f32 {
            self.steer_speed[c.index()]
        }
        fn drive_speed(&self, c: Corner) -> f32 {
            self.drive_speed[c.index()]
        }
        fn drive_current(&self, c: Corner) -> f32 {
            self.drive_current[c.index()]
        }
    }

    const TICK_US: u32 = 1_000;

    fn close(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() < tol
    }

    /// Tick every millisecond over `[from, to)` and return the last output.
    fn run(
        chassis: &mut SwerveChassis<&FakeClock>,
        clock: &FakeClock,
        cmd: &VelocityCommand,
        fb: &FakeWheels,
        from: u32,
        to: u32,
    ) -> ChassisCommand {
        let mut out = ChassisCommand::idle();
        let mut t = from;
        while t < to {
            clock.set(t);
            out = chassis.tick(cmd, fb);
            t += TICK_US;
        }
        out
    }

    fn ready_chassis<'a>(
        clock: &'a FakeClock,
        config: ChassisConfig,
        fb: &FakeWheels,
    ) -> SwerveChassis<&'a FakeClock> {
        let mut chassis = SwerveChassis::new(config, Some(clock));
        run(&mut chassis, clock, &VelocityCommand::zero(), fb, 0, 5_000_000);
        assert_eq!(chassis.phase(), Phase::SelfTestSpinCcw);
        chassis
    }

    fn no_ramp() -> ChassisConfig {
        ChassisConfig {
            accel_limit: None,
            ..ChassisConfig::default()
        }
    }

    #[test]
    fn without_clock_stays_uninitialized() {
        let clock = FakeClock::new();
        let fb = FakeWheels::default();
        let mut chassis: SwerveChassis<&FakeClock> = SwerveChassis::new(ChassisConfig::default(), None);
        let cmd = VelocityCommand::planar(1.0, 0.0, 0.0, ChassisMode::Normal);
        for _ in 0..100 {
            assert_eq!(chassis.tick(&cmd, &fb), ChassisCommand::idle());
        }
        assert_eq!(chassis.phase(), Phase::Uninitialized);

        chassis.register_clock(&clock);
        chassis.tick(&cmd, &fb);
        assert_eq!(chassis.phase(), Phase::SelfTestHold);
    }

    #[test]
    fn self_test_timeline() {
        let clock = FakeClock::new();
        let fb = FakeWheels::default();
        let mut chassis = SwerveChassis::new(ChassisConfig::default(), Some(&clock));
        let cmd = VelocityCommand::planar(2.0, 0.0, 0.0, ChassisMode::Normal);

        let out = run(&mut chassis, &clock, &cmd, &fb, 0, 1_000_000);
        assert_eq!(chassis.phase(), Phase::SelfTestHold);
        assert_eq!(out.drive, [VescCommand::Current(0.0); 4]);
        assert_eq!(out.steer, [0.0; 4]);

        let spin_rpm = 0.321 * chassis.kinematics().rpm_per_mps();
        let out = run(&mut chassis, &clock, &cmd, &fb, 1_000_000, 3_000_000);
        assert_eq!(chassis.phase(), Phase::SelfTestSpinCw);
        for d in out.drive {
            match d {
                VescCommand::Rpm(v) => assert!(close(v.abs(), spin_rpm, 1.0)),
                other => panic!("unexpected drive command {other:?}"),
            }
        }
        // Clockwise spin leaves the wheels tangent to the footprint.
        assert!(close(chassis.wheel(Corner::LeftFront).current_angle, 40.37, 0.01));
        assert!(close(chassis.wheel(Corner::RightFront).current_angle, -40.37, 0.01));
        assert!(close(chassis.wheel(Corner::RightRear).current_angle, 40.37, 0.01));
        assert!(close(chassis.wheel(Corner::LeftRear).current_angle, -40.37, 0.01));

        run(&mut chassis, &clock, &cmd, &fb, 3_000_000, 5_000_000);
        assert_eq!(chassis.phase(), Phase::SelfTestSpinCcw);
        assert!(!chassis.is_ready());

        // The first tick after 5 s is already a normal tick.
        clock.set(5_000_000);
        let out = chassis.tick(&cmd, &fb);
        assert!(chassis.is_ready());
        assert!(matches!(out.drive[0], VescCommand::Rpm(v) if v > 0.0));
    }

    #[test]
    fn stop_command_brakes_then_parks_at_lock_angles() {
        let clock = FakeClock::new();
        let fb = FakeWheels::default();
        let mut chassis = ready_chassis(&clock, ChassisConfig::default(), &fb);
        let stop = VelocityCommand::zero();

        let out = run(&mut chassis, &clock, &stop, &fb, 5_000_000, 6_900_000);
        assert!(chassis.is_ready());
        assert_eq!(out.drive, [VescCommand::BrakeCurrent(10.0); 4]);
        // Before the lock delay the wheels hold where the self-test left them.
        assert!(close(chassis.wheel(Corner::LeftFront).target.angle, 40.37, 0.01));
        assert!(close(chassis.wheel(Corner::RightFront).target.angle, -40.37, 0.01));

        run(&mut chassis, &clock, &stop, &fb, 6_900_000, 7_100_000);
        let lock = 99.26 / 2.0;
        assert!(close(chassis.wheel(Corner::LeftFront).target.angle, lock, 1e-3));
        assert!(close(chassis.wheel(Corner::RightFront).target.angle, -lock, 1e-3));
        assert!(close(chassis.wheel(Corner::RightRear).target.angle, lock, 1e-3));
        assert!(close(chassis.wheel(Corner::LeftRear).target.angle, -lock, 1e-3));
    }

    #[test]
    fn moving_wheel_does_not_park() {
        let clock = FakeClock::new();
        let mut fb = FakeWheels::default();
        let mut chassis = ready_chassis(&clock, ChassisConfig::default(), &fb);
        fb.drive_speed = [0.0, 150.0, 0.0, 0.0];

        run(&mut chassis, &clock, &VelocityCommand::zero(), &fb, 5_000_000, 8_000_000);
        assert!(close(chassis.wheel(Corner::LeftFront).target.angle, 49.63, 1e-3));
        assert!(close(chassis.wheel(Corner::RightFront).target.angle, -40.37, 0.01));
    }

    #[test]
    fn lock_modes_fix_the_steering_axis() {
        let clock = FakeClock::new();
        let fb = FakeWheels::default();
        let mut chassis = ready_chassis(&clock, no_ramp(), &fb);
        let k = chassis.kinematics().rpm_per_mps();

        // Wheel velocity in the body frame, whichever way the steering resolved.
        let along = |w: &WheelState| {
            let a = w.target.angle.to_radians();
            (w.target.speed * a.cos(), w.target.speed * a.sin())
        };

        let cmd = VelocityCommand::planar(0.0, 1.0, 3.0, ChassisMode::LockY);
        clock.set(5_000_000);
        let out = chassis.tick(&cmd, &fb);
        assert!(close(chassis.wheel(Corner::LeftFront).target.angle, 90.0, 1e-3));
        assert!(close(chassis.wheel(Corner::RightFront).target.angle, -90.0, 1e-3));
        for corner in Corner::ALL {
            let (x, y) = along(chassis.wheel(corner));
            assert!(close(x, 0.0, 0.5));
            assert!(close(y, k, 0.5));
        }
        assert!(matches!(out.drive[0], VescCommand::Rpm(v) if close(v, k, 0.5)));
        assert!(matches!(out.drive[1], VescCommand::Rpm(v) if close(v, -k, 0.5)));

        let cmd = VelocityCommand::planar(-0.5, 1.0, 0.0, ChassisMode::LockX);
        clock.set(5_001_000);
        chassis.tick(&cmd, &fb);
        for corner in Corner::ALL {
            let (x, y) = along(chassis.wheel(corner));
            assert!(close(x, -0.5 * k, 0.5));
            assert!(close(y, 0.0, 0.5));
        }
    }

    #[test]
    fn command_is_clamped_per_axis() {
        let clock = FakeClock::new();
        let fb = FakeWheels::default();
        let mut chassis = ready_chassis(&clock, no_ramp(), &fb);
        let k = chassis.kinematics().rpm_per_mps();

        clock.set(5_000_000);
        chassis.tick(&VelocityCommand::planar(10.0, 0.0, 0.0, ChassisMode::Normal), &fb);
        assert!(close(chassis.wheel(Corner::LeftFront).target.speed, 3.0 * k, 1.0));

        clock.set(5_001_000);
        chassis.tick(&VelocityCommand::planar(-10.0, 0.0, 0.0, ChassisMode::Normal), &fb);
        // Reversing flips the drive, not the steering.
        assert!(close(chassis.wheel(Corner::LeftFront).target.speed, -3.0 * k, 1.0));
    }

    #[test]
    fn reverse_guard_waits_for_the_wheel_to_slow() {
        let clock = FakeClock::new();
        let mut fb = FakeWheels::default();
        let mut chassis = ready_chassis(&clock, no_ramp(), &fb);
        let k = chassis.kinematics().rpm_per_mps();

        let forward = VelocityCommand::planar(1.0, 0.0, 0.0, ChassisMode::Normal);
        let back = VelocityCommand::planar(-1.0, 0.0, 0.0, ChassisMode::Normal);

        run(&mut chassis, &clock, &forward, &fb, 5_000_000, 5_010_000);
        fb.drive_speed = [3_000.0; 4];

        clock.set(5_010_000);
        let out = chassis.tick(&back, &fb);
        assert_eq!(out.drive, [VescCommand::Rpm(0.0); 4]);

        // Still fast: still held.
        clock.set(5_011_000);
        let out = chassis.tick(&back, &fb);
        assert_eq!(out.drive[0], VescCommand::Rpm(0.0));

        fb.drive_speed = [500.0; 4];
        clock.set(5_012_000);
        let out = chassis.tick(&back, &fb);
        assert!(matches!(out.drive[0], VescCommand::Rpm(v) if close(v, -k, 0.5)));
    }

    #[test]
    fn acceleration_is_ramped_but_braking_is_not() {
        let clock = FakeClock::new();
        let fb = FakeWheels::default();
        let mut chassis = ready_chassis(&clock, ChassisConfig::default(), &fb);
        let k = chassis.kinematics().rpm_per_mps();
        let step = 1.5 * 0.001 * k;

        let forward = VelocityCommand::planar(1.0, 0.0, 0.0, ChassisMode::Normal);
        run(&mut chassis, &clock, &forward, &fb, 5_000_000, 5_100_000);
        let speed = chassis.wheel(Corner::LeftFront).target.speed;
        assert!(close(speed, 100.0 * step, 1.0), "speed {speed}");

        clock.set(5_100_000);
        let out = chassis.tick(&VelocityCommand::zero(), &fb);
        assert_eq!(out.drive[0], VescCommand::BrakeCurrent(10.0));
        assert_eq!(chassis.wheel(Corner::LeftFront).target.speed, 0.0);
    }

    #[test]
    fn overcurrent_trips_after_two_seconds_and_cuts_drive() {
        let clock = FakeClock::new();
        let mut fb = FakeWheels::default();
        fb.drive_current = [0.0, 0.0, 25_001.0, 0.0];
        let mut chassis = SwerveChassis::new(ChassisConfig::default(), Some(&clock));
        let cmd = VelocityCommand::zero();

        // 1.9 s of overcurrent: self-test spin still drives the wheels.
        let out = run(&mut chassis, &clock, &cmd, &fb, 0, 1_900_000);
        assert_eq!(out.safety, SafetyState::Pending);
        assert!(matches!(out.drive[0], VescCommand::Rpm(_)));

        let mut alarms = 0;
        let mut t = 1_900_000;
        while t < 2_500_000 {
            clock.set(t);
            let out = chassis.tick(&cmd, &fb);
            if out.alarm.is_some() {
                alarms += 1;
                assert_eq!(out.alarm, Some(AlarmTone::OVERCURRENT));
            }
            if t > 2_000_000 {
                assert!(out.safety.is_fault());
                assert_eq!(out.drive, [VescCommand::Current(0.0); 4]);
            }
            t += TICK_US;
        }
        assert_eq!(alarms, 1);

        fb.drive_current = [0.0; 4];
        clock.set(2_500_000);
        let out = chassis.tick(&cmd, &fb);
        assert_eq!(out.safety, SafetyState::Nominal);
        assert!(matches!(out.drive[0], VescCommand::Rpm(_)));
    }

    #[test]
    fn drive_resumes_from_standstill_after_fault_clears() {
        let clock = FakeClock::new();
        let mut fb = FakeWheels::default();
        let mut chassis = ready_chassis(&clock, ChassisConfig::default(), &fb);
        let step = 1.5 * 0.001 * chassis.kinematics().rpm_per_mps();
        let forward = VelocityCommand::planar(1.0, 0.0, 0.0, ChassisMode::Normal);

        fb.drive_current = [25_001.0, 0.0, 0.0, 0.0];
        let out = run(&mut chassis, &clock, &forward, &fb, 5_000_000, 7_500_000);
        assert!(out.safety.is_fault());
        assert_eq!(out.drive, [VescCommand::Current(0.0); 4]);

        fb.drive_current = [0.0; 4];
        clock.set(7_500_000);
        let out = chassis.tick(&forward, &fb);
        assert_eq!(out.safety, SafetyState::Nominal);
        assert!(matches!(out.drive[0], VescCommand::Rpm(v) if close(v, step, 0.1)), "{:?}", out.drive[0]);
    }

    #[test]
    fn clock_swap_restarts_every_timer() {
        let clock = FakeClock::new();
        let spare = FakeClock::new();
        let fb = FakeWheels::default();
        let mut chassis = ready_chassis(&clock, ChassisConfig::default(), &fb);
        let step = 1.5 * 0.001 * chassis.kinematics().rpm_per_mps();
        let cmd = VelocityCommand::planar(0.0, 1.0, 0.0, ChassisMode::LockY);

        run(&mut chassis, &clock, &cmd, &fb, 5_000_000, 5_010_000);
        let before = Corner::ALL.map(|c| chassis.wheel(c).target.speed);

        spare.set(10);
        chassis.register_clock(&spare);
        let out = chassis.tick(&cmd, &fb);
        assert!(chassis.is_ready());
        // No dt on the new base: no ramp step, no PID output.
        assert_eq!(out.steer, [0.0; 4]);
        for corner in Corner::ALL {
            let i = corner.index();
            assert_eq!(out.drive[i], VescCommand::Rpm(before[i]));
        }

        spare.set(1_010);
        let out = chassis.tick(&cmd, &fb);
        for corner in Corner::ALL {
            let i = corner.index();
            match out.drive[i] {
                VescCommand::Rpm(v) => assert!(close(v.abs(), before[i].abs() + step, 0.1)),
                other => panic!("unexpected drive command {other:?}"),
            }
        }
    }

    #[test]
    fn braking_restarts_the_drive_loop() {
        let clock = FakeClock::new();
        let fb = FakeWheels::default();
        let config = ChassisConfig {
            accel_limit: None,
            drive_closed_loop: true,
            ..ChassisConfig::default()
        };
        let mut chassis = ready_chassis(&clock, config, &fb);
        let forward = VelocityCommand::planar(2.0, 0.0, 0.0, ChassisMode::Normal);

        run(&mut chassis, &clock, &forward, &fb, 5_000_000, 5_010_000);
        run(&mut chassis, &clock, &VelocityCommand::zero(), &fb, 5_010_000, 8_000_000);

        clock.set(8_000_000);
        let out = chassis.tick(&forward, &fb);
        assert_eq!(out.drive[0], VescCommand::Current(0.0));

        clock.set(8_001_000);
        chassis.tick(&forward, &fb);
        // One 1 ms step of error, not three seconds of it.
        let target = 2.0 * chassis.kinematics().rpm_per_mps();
        let integral = chassis.pid_mut(Corner::LeftFront, PidLoop::DriveSpeed).integral();
        assert!(close(integral, target * 0.001, 0.1), "integral {integral}");
    }

    #[test]
    fn closed_loop_drive_commands_bounded_current() {
        let clock = FakeClock::new();
        let fb = FakeWheels::default();
        let config = ChassisConfig {
            accel_limit: None,
            drive_closed_loop: true,
            ..ChassisConfig::default()
        };
        let mut chassis = ready_chassis(&clock, config, &fb);
        let forward = VelocityCommand::planar(2.0, 0.0, 0.0, ChassisMode::Normal);

        let out = run(&mut chassis, &clock, &forward, &fb, 5_000_000, 5_010_000);
        match out.drive[0] {
            VescCommand::Current(i) => assert!(i > 0.0 && i <= 20_000.0),
            other => panic!("unexpected drive command {other:?}"),
        }
    }

    #[test]
    fn steer_cascade_drives_toward_target() {
        let clock = FakeClock::new();
        let fb = FakeWheels::default();
        let mut chassis = ready_chassis(&clock, no_ramp(), &fb);

        // Wheels report 0° while the targets are ±90°: steering output follows the error sign.
        let cmd = VelocityCommand::planar(0.0, 1.0, 0.0, ChassisMode::LockY);
        let out = run(&mut chassis, &clock, &cmd, &fb, 5_000_000, 5_005_000);
        for corner in Corner::ALL {
            let s = out.steer[corner.index()];
            assert!(s * chassis.wheel(corner).target.angle > 0.0, "{corner:?} {s}");
            assert!(s.abs() <= 30_000.0);
        }
    }

    #[test]
    fn rearm_restarts_self_test() {
        let clock = FakeClock::new();
        let fb = FakeWheels::default();
        let mut chassis = ready_chassis(&clock, ChassisConfig::default(), &fb);
        clock.set(5_000_000);
        chassis.tick(&VelocityCommand::zero(), &fb);
        assert!(chassis.is_ready());

        chassis.rearm();
        assert_eq!(chassis.phase(), Phase::Uninitialized);
        clock.set(6_000_000);
        chassis.tick(&VelocityCommand::zero(), &fb);
        assert_eq!(chassis.phase(), Phase::SelfTestHold);
        clock.set(7_000_000);
        chassis.tick(&VelocityCommand::zero(), &fb);
        assert_eq!(chassis.phase(), Phase::SelfTestSpinCw);
    }

    #[test]
    fn pid_access_is_per_corner_and_loop() {
        let clock = FakeClock::new();
        let mut chassis = SwerveChassis::new(ChassisConfig::default(), Some(&clock));
        chassis
            .pid_mut(Corner::RightRear, PidLoop::DriveSpeed)
            .set_gains(9.0, 0.0, 0.0);
        assert_eq!(
            chassis.pid_mut(Corner::LeftFront, PidLoop::SteerSpeed).output_mode(),
            crate::control::pid::OutputMode::Increment
        );
        assert_eq!(
            chassis.pid_mut(Corner::LeftFront, PidLoop::SteerPosition).output_mode(),
            crate::control::pid::OutputMode::Position
        );
    }
}
