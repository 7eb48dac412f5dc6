// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Controller Area Network (CAN) abstraction layer.
//!
//! - `CanBus` wraps a HAL `can::Can` instance in `bxcan::Can`.
//! - Receive is non-blocking so the control loop can drain both buses every tick.

use core::convert::Infallible;
use nb::block;

use bxcan::{self, Frame, TransmitStatus};
use log::{trace, warn};
use stm32f7xx_hal::can as hal_can;

/// Bit timing for 1 Mbit/s with a 54 MHz APB1 clock: prescaler 3, 18 quanta, sample point 78%.
pub const BTR_1MBPS: u32 = 0x003C_0002;

/// Wrapper around a bxcan CAN instance built from a HAL CAN peripheral.
pub struct CanBus<I>
where
    hal_can::Can<I>: bxcan::Instance,
{
    can: bxcan::Can<hal_can::Can<I>>,
}

impl<I> CanBus<I>
where
    hal_can::Can<I>: bxcan::Instance,
{
    /// Create and enable a bxcan instance from a HAL CAN peripheral.
    ///
    /// * `hal_can` – the HAL CAN wrapper
    /// * `btr` – value for the CAN_BTR register (bit timing)
    pub fn new(hal_can: hal_can::Can<I>, btr: u32) -> Self {
        let can = bxcan::Can::builder(hal_can)
            .set_bit_timing(btr)
            .set_loopback(false)
            .set_silent(false)
            .enable();

        Self { can }
    }

    /// Transmit a pre-built CAN frame, waiting for a free mailbox.
    pub fn transmit_frame(&mut self, frame: &Frame) -> Result<TransmitStatus, Infallible> {
        block!(self.can.transmit(frame))
    }

    /// Transmit every frame that is present.
    ///
    /// A lower-priority frame pushed out of its mailbox is queued again. Each displaced frame has
    /// a lower priority than the one that replaced it, so the chain ends.
    pub fn transmit_all(&mut self, frames: &[Option<Frame>]) {
        for frame in frames.iter().flatten() {
            let mut pending = Some(frame.clone());
            while let Some(f) = pending.take() {
                let status = match self.transmit_frame(&f) {
                    Ok(status) => status,
                    Err(never) => match never {},
                };
                if let Some(displaced) = status.dequeued_frame() {
                    trace!("CAN frame {:?} displaced, queueing again", displaced.id());
                    pending = Some(displaced.clone());
                }
            }
        }
    }

    /// Take one frame from the receive FIFO if one is waiting.
    pub fn try_receive(&mut self) -> Option<Frame> {
        match self.can.receive() {
            Ok(frame) => Some(frame),
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(_overrun)) => {
                warn!("CAN receive FIFO overrun");
                None
            }
        }
    }
}

/// Extra helpers for CAN instances that own filters (CAN1 on STM32F7).
impl<I> CanBus<I>
where
    hal_can::Can<I>: bxcan::Instance + bxcan::FilterOwner,
{
    /// Configure CAN1 and CAN2 filters so that both accept all frames on FIFO0.
    ///
    /// This must be called on CAN1 (the filter owner).
    pub fn accept_all_on_both_buses<I2>(&mut self, _can2: &mut CanBus<I2>)
    where
        hal_can::Can<I2>: bxcan::Instance,
    {
        let regs = unsafe { &*stm32f7xx_hal::pac::CAN1::ptr() };

        // Enter filter init mode
        regs.fmr.modify(|_, w| w.finit().set_bit());

        // Banks 0-13 belong to CAN1, 14-27 to CAN2.
        regs.fmr.modify(|_, w| unsafe { w.can2sb().bits(14) });

        regs.fa1r.reset();
        regs.fm1r.reset();
        regs.fs1r.reset();
        regs.ffa1r.reset();

        // 32-bit mask mode, FIFO0
        regs.fs1r.modify(|_, w| unsafe { w.bits(0x0FFF_FFFF) });
        regs.fm1r.modify(|_, w| unsafe { w.bits(0x0000_0000) });
        regs.ffa1r.modify(|_, w| unsafe { w.bits(0x0000_0000) });

        // Zero id and zero mask: accept everything.
        for bank in [0, 14] {
            regs.fb[bank].fr1.write(|w| unsafe { w.bits(0) });
            regs.fb[bank].fr2.write(|w| unsafe { w.bits(0) });
        }

        regs.fa1r
            .modify(|r, w| unsafe { w.bits(r.bits() | ((1 << 0) | (1 << 14))) });

        // Leave filter init mode
        regs.fmr.modify(|_, w| w.finit().clear_bit());
    }
}
