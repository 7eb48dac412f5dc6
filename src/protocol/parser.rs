// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Frame parser for the upstream command link.
//!
//! [`Parser`] consumes one byte at a time (interrupt-driven UART), [`decode_frame`] handles a whole
//! received buffer (DMA), and [`encode_frame`] builds a frame around an outgoing payload.

use crate::protocol::codec::{Overflow, Writer};
use crate::protocol::crc::{crc8, crc8_update};
use crate::protocol::messages::*;

#[derive(Clone, Copy)]
enum State {
    WaitHeader0,
    WaitHeader1,
    WaitLength,
    Payload { len: u8, idx: u8 },
    WaitCrc { len: u8 },
    WaitTrailer0 { len: u8, crc: u8 },
    WaitTrailer1 { len: u8, crc: u8 },
}

pub struct Parser {
    state: State,
    payload: [u8; MAX_PAYLOAD],
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub const fn new() -> Self {
        Self {
            state: State::WaitHeader0,
            payload: [0; MAX_PAYLOAD],
        }
    }

    /// Process a single incoming byte.
    ///
    /// Returns `Some` when a frame has been completed or rejected. Bytes outside a frame are
    /// skipped silently while hunting for the header.
    pub fn push(&mut self, byte: u8) -> Option<Result<LinkCommand, LinkError>> {
        match self.state {
            State::WaitHeader0 => {
                if byte == HEADER[0] {
                    self.state = State::WaitHeader1;
                }
            }
            State::WaitHeader1 => {
                self.state = if byte == HEADER[1] {
                    State::WaitLength
                } else if byte == HEADER[0] {
                    State::WaitHeader1
                } else {
                    State::WaitHeader0
                };
            }
            State::WaitLength => {
                if byte as usize > MAX_PAYLOAD {
                    self.state = State::WaitHeader0;
                    return Some(Err(LinkError::BadLength(byte)));
                }
                self.state = if byte == 0 {
                    State::WaitCrc { len: 0 }
                } else {
                    State::Payload { len: byte, idx: 0 }
                };
            }
            State::Payload { len, idx } => {
                self.payload[idx as usize] = byte;
                let idx = idx + 1;
                self.state = if idx == len {
                    State::WaitCrc { len }
                } else {
                    State::Payload { len, idx }
                };
            }
            State::WaitCrc { len } => {
                self.state = State::WaitTrailer0 { len, crc: byte };
            }
            State::WaitTrailer0 { len, crc } => {
                if byte != TRAILER[0] {
                    self.state = State::WaitHeader0;
                    return Some(Err(LinkError::BadTrailer));
                }
                self.state = State::WaitTrailer1 { len, crc };
            }
            State::WaitTrailer1 { len, crc } => {
                // Reset for next frame
                self.state = State::WaitHeader0;
                if byte != TRAILER[1] {
                    return Some(Err(LinkError::BadTrailer));
                }
                let payload = &self.payload[..len as usize];
                let result =
                    check_crc(len, payload, crc).and_then(|_| LinkCommand::from_payload(payload));
                return Some(result);
            }
        }
        None
    }
}

fn check_crc(len: u8, payload: &[u8], found: u8) -> Result<(), LinkError> {
    let expected = crc8_update(crc8_update(crc8(&HEADER), &[len]), payload);
    if expected == found {
        Ok(())
    } else {
        Err(LinkError::BadCrc { expected, found })
    }
}

/// Decode a command frame from the start of `buf`.
///
/// Checks run in order header, length, trailer, CRC, payload.
pub fn decode_frame(buf: &[u8]) -> Result<LinkCommand, LinkError> {
    if buf.len() < 3 || buf[..2] != HEADER {
        return Err(LinkError::BadHeader);
    }
    let len = buf[2];
    let n = len as usize;
    if n > MAX_PAYLOAD || buf.len() < n + FRAME_OVERHEAD {
        return Err(LinkError::BadLength(len));
    }
    if buf[4 + n..6 + n] != TRAILER {
        return Err(LinkError::BadTrailer);
    }
    let payload = &buf[3..3 + n];
    check_crc(len, payload, buf[3 + n])?;
    LinkCommand::from_payload(payload)
}

/// Frame `payload` into `out`. Returns the frame length.
pub fn encode_frame(payload: &[u8], out: &mut [u8]) -> Result<usize, Overflow> {
    if payload.len() > MAX_PAYLOAD {
        return Err(Overflow);
    }
    let len = payload.len() as u8;
    let mut w = Writer::new(out);
    w.put_bytes(&HEADER)?;
    w.put_u8(len)?;
    w.put_bytes(payload)?;
    w.put_u8(crc8_update(crc8_update(crc8(&HEADER), &[len]), payload))?;
    w.put_bytes(&TRAILER)?;
    Ok(w.position())
}
