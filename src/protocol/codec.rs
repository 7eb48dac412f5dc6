// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Big-endian fixed-point buffer helpers shared by the motor bus codecs.
//!
//! [`Writer`] and [`Reader`] walk a byte slice with a cursor. Out-of-range access returns an
//! error instead of panicking. Scaled helpers convert `f32` to and from fixed point: the value is
//! multiplied by `scale` before the (saturating) integer cast on write and divided by it on read.

use byteorder::{BigEndian, ByteOrder};

/// Not enough room left in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow;

/// Sequential big-endian writer over a mutable byte slice.
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn claim(&mut self, n: usize) -> Result<&mut [u8], Overflow> {
        let end = self.pos.checked_add(n).ok_or(Overflow)?;
        let slot = self.buf.get_mut(self.pos..end).ok_or(Overflow)?;
        self.pos = end;
        Ok(slot)
    }

    pub fn put_u8(&mut self, v: u8) -> Result<(), Overflow> {
        self.claim(1)?[0] = v;
        Ok(())
    }

    pub fn put_bytes(&mut self, v: &[u8]) -> Result<(), Overflow> {
        self.claim(v.len())?.copy_from_slice(v);
        Ok(())
    }

    pub fn put_i16(&mut self, v: i16) -> Result<(), Overflow> {
        BigEndian::write_i16(self.claim(2)?, v);
        Ok(())
    }

    pub fn put_u16(&mut self, v: u16) -> Result<(), Overflow> {
        BigEndian::write_u16(self.claim(2)?, v);
        Ok(())
    }

    pub fn put_i32(&mut self, v: i32) -> Result<(), Overflow> {
        BigEndian::write_i32(self.claim(4)?, v);
        Ok(())
    }

    pub fn put_u32(&mut self, v: u32) -> Result<(), Overflow> {
        BigEndian::write_u32(self.claim(4)?, v);
        Ok(())
    }

    pub fn put_scaled_i16(&mut self, v: f32, scale: f32) -> Result<(), Overflow> {
        self.put_i16((v * scale) as i16)
    }

    pub fn put_scaled_i32(&mut self, v: f32, scale: f32) -> Result<(), Overflow> {
        self.put_i32((v * scale) as i32)
    }
}

/// Sequential big-endian reader over a byte slice.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Reader positioned at `offset`.
    pub fn at(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, pos: offset }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slot = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slot)
    }

    pub fn get_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub fn get_i16(&mut self) -> Option<i16> {
        self.take(2).map(BigEndian::read_i16)
    }

    pub fn get_u16(&mut self) -> Option<u16> {
        self.take(2).map(BigEndian::read_u16)
    }

    pub fn get_i32(&mut self) -> Option<i32> {
        self.take(4).map(BigEndian::read_i32)
    }

    pub fn get_u32(&mut self) -> Option<u32> {
        self.take(4).map(BigEndian::read_u32)
    }

    pub fn get_scaled_i16(&mut self, scale: f32) -> Option<f32> {
        self.get_i16().map(|v| v as f32 / scale)
    }

    pub fn get_scaled_u16(&mut self, scale: f32) -> Option<f32> {
        self.get_u16().map(|v| v as f32 / scale)
    }

    pub fn get_scaled_i32(&mut self, scale: f32) -> Option<f32> {
        self.get_i32().map(|v| v as f32 / scale)
    }
}
