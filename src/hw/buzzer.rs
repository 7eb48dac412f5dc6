// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Alarm buzzer on a GPIO.
//!
//! Tones are produced by switching the pin from the control loop, which is plenty for the few-Hz
//! patterns an alarm uses.

use crate::control::chassis::AlarmTone;
use crate::control::timer::elapsed_us;
use embedded_hal::digital::v2::OutputPin;

/// Whether the buzzer is driven active-high or active-low on the board wiring.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActiveLevel {
    High,
    Low,
}

pub struct Buzzer<PIN: OutputPin> {
    pin: PIN,
    active: ActiveLevel,
    tone: Option<(AlarmTone, u32)>,
    is_on: bool,
}

impl<PIN: OutputPin> Buzzer<PIN> {
    /// Create a buzzer wrapper, initially silent.
    pub fn new(pin: PIN, active: ActiveLevel) -> Self {
        let mut buzzer = Self {
            pin,
            active,
            tone: None,
            is_on: true,
        };
        buzzer.drive(false);
        buzzer
    }

    fn drive(&mut self, on: bool) {
        if on == self.is_on {
            return;
        }
        match (self.active, on) {
            (ActiveLevel::High, true) | (ActiveLevel::Low, false) => self.pin.set_high().ok(),
            (ActiveLevel::High, false) | (ActiveLevel::Low, true) => self.pin.set_low().ok(),
        };
        self.is_on = on;
    }

    /// Start sounding `tone`, with its period starting at `now_us`.
    pub fn sound(&mut self, tone: AlarmTone, now_us: u32) {
        self.tone = Some((tone, now_us));
    }

    pub fn silence(&mut self) {
        self.tone = None;
        self.drive(false);
    }

    #[inline]
    pub fn is_sounding(&self) -> bool {
        self.tone.is_some()
    }

    /// Advance the tone pattern. Call every loop tick.
    pub fn update(&mut self, now_us: u32) {
        let on = match self.tone {
            Some((tone, since)) if tone.freq_hz > 0 => {
                let period = 1_000_000 / tone.freq_hz;
                let high = period / 100 * tone.duty_percent.min(100) as u32;
                elapsed_us(now_us, since) % period < high
            }
            _ => false,
        };
        self.drive(on);
    }

    pub fn free(self) -> PIN {
        self.pin
    }
}
