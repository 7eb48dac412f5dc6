// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Chassis controller firmware: board bring-up and the 1 ms control loop.
//!
//! - CAN1 carries the GM6020 steering motors, CAN2 the VESC wheel drives.
//! - USART2 is the upstream command link, USART1 the debug terminal carrying log output.
//! - Between ticks the loop drains both CAN receive FIFOs and the link UART.

#![no_main]
#![no_std]

use cortex_m_rt::entry;
use panic_halt as _;

use hal::{
    can::Can,
    pac,
    prelude::*,
    serial::{Config, Serial},
};
use log::{info, LevelFilter};
use stm32f7xx_hal as hal;

use swerve_core::control::{ChassisConfig, MicrosClock, SwerveChassis};
use swerve_core::hw::{can::BTR_1MBPS, logger, ActiveLevel, BoardPins, Buzzer, CanBus, Micros, Usart};
use swerve_core::motors::{SwerveMotors, STEER_ENCODER_OFFSETS};
use swerve_core::protocol::messages::FRAME_OVERHEAD;
use swerve_core::protocol::parser::encode_frame;
use swerve_core::protocol::{ChassisReport, CommandLink};

/// Written from the bus-receive path, read by the control tick.
static MOTORS: SwerveMotors = SwerveMotors::new();

const TICK_US: u32 = 1_000;
/// Ticks between chassis reports on the link.
const REPORT_EVERY: u32 = 20;

fn halt() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

#[entry]
fn main() -> ! {
    // Peripherals
    let Some(dp) = pac::Peripherals::take() else {
        halt()
    };

    // Clocks: 216 MHz core, 54 MHz APB1 for the CAN bit timing.
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.sysclk(216.MHz()).pclk1(54.MHz()).freeze();
    let mut apb1 = rcc.apb1;

    let pins = BoardPins::new(dp.GPIOA, dp.GPIOB, dp.GPIOD);

    // USART1 (DBG)
    let usart_cfg = Config {
        baud_rate: 115_200.bps(),
        ..Default::default()
    };
    let serial = Serial::new(dp.USART1, (pins.usart1.tx, pins.usart1.rx), &clocks, usart_cfg);
    if logger::init(Usart::new(serial), LevelFilter::Info).is_err() {
        halt()
    }

    // USART2 (command link)
    let link_cfg = Config {
        baud_rate: 115_200.bps(),
        ..Default::default()
    };
    let serial = Serial::new(dp.USART2, (pins.usart2.tx, pins.usart2.rx), &clocks, link_cfg);
    let mut link_port = Usart::new(serial);

    // CAN1 (steering) and CAN2 (drive)
    let mut steer_bus = CanBus::new(
        Can::new(dp.CAN1, &mut apb1, (pins.can1.tx, pins.can1.rx)),
        BTR_1MBPS,
    );
    let mut drive_bus = CanBus::new(
        Can::new(dp.CAN2, &mut apb1, (pins.can2.tx, pins.can2.rx)),
        BTR_1MBPS,
    );
    steer_bus.accept_all_on_both_buses(&mut drive_bus);

    let clock = Micros::tim2(dp.TIM2, &clocks);
    let mut buzzer = Buzzer::new(pins.buzzer, ActiveLevel::High);

    MOTORS.set_steer_offsets(&STEER_ENCODER_OFFSETS);
    let mut link = CommandLink::new();
    let mut chassis = SwerveChassis::new(ChassisConfig::default(), Some(&clock));

    info!("chassis controller up, sysclk {} Hz", clocks.sysclk().raw());

    let mut next_tick = clock.micros();
    let mut ticks: u32 = 0;

    loop {
        while let Some(frame) = steer_bus.try_receive() {
            MOTORS.on_steer_frame(&frame);
        }
        while let Some(frame) = drive_bus.try_receive() {
            MOTORS.on_drive_frame(&frame);
        }
        while let Some(b) = link_port.read_byte() {
            link.push_byte(b, clock.micros());
        }

        let now = clock.micros();
        if (now.wrapping_sub(next_tick) as i32) < 0 {
            continue;
        }
        next_tick = next_tick.wrapping_add(TICK_US);

        let cmd = link.command(now);
        let out = chassis.tick(&cmd, &MOTORS);

        steer_bus.transmit_all(&MOTORS.steer_frames(&out));
        drive_bus.transmit_all(&MOTORS.drive_frames(&out));

        if let Some(tone) = out.alarm {
            buzzer.sound(tone, now);
        } else if !out.safety.is_fault() && buzzer.is_sounding() {
            buzzer.silence();
        }
        buzzer.update(now);

        ticks = ticks.wrapping_add(1);
        if ticks % REPORT_EVERY == 0 {
            let report = ChassisReport {
                ready: chassis.is_ready(),
                drive_fault: out.safety.is_fault(),
            };
            let mut buf = [0u8; ChassisReport::PAYLOAD_LEN + FRAME_OVERHEAD];
            if let Ok(n) = encode_frame(&report.to_payload(), &mut buf) {
                link_port.write_bytes(&buf[..n]);
            }
        }
    }
}
