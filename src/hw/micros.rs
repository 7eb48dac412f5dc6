// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Free-running microsecond counter on TIM2.
//!
//! TIM2 is 32 bits wide, so with a 1 MHz count rate the counter wraps every 2^32 µs, exactly
//! what [`MicrosClock`] consumers expect.

use crate::control::timer::MicrosClock;
use stm32f7xx_hal::{pac, rcc::Clocks};

pub struct Micros {
    tim: pac::TIM2,
}

impl Micros {
    /// Start TIM2 counting up at 1 MHz from zero.
    pub fn tim2(tim: pac::TIM2, clocks: &Clocks) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim2en().set_bit());

        // Disable counter while configuring
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        let prescaler = clocks.timclk1().raw() / 1_000_000 - 1;
        tim.psc.write(|w| w.psc().bits(prescaler as u16));
        tim.arr.write(|w| w.bits(0xFFFF_FFFF));

        // Load the prescaler now rather than at the first overflow.
        tim.egr.write(|w| w.ug().set_bit());
        tim.cnt.write(|w| w.bits(0));

        tim.cr1.modify(|_, w| w.cen().set_bit());

        Self { tim }
    }

    /// Consume the wrapper and return the underlying timer peripheral.
    #[inline]
    pub fn free(self) -> pac::TIM2 {
        self.tim
    }
}

impl MicrosClock for Micros {
    #[inline]
    fn micros(&self) -> u32 {
        self.tim.cnt.read().bits()
    }
}
