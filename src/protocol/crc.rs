// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! CRC-8 used by the upstream command link.
//!
//! Polynomial 0x8C processed LSB-first (the reflected form of 0x31), initial value 0, no final
//! XOR.

const POLY: u8 = 0x8C;

/// Fold `data` into a running CRC.
pub fn crc8_update(mut crc: u8, data: &[u8]) -> u8 {
    for &b in data {
        crc ^= b;
        for _ in 0..8 {
            crc = if crc & 0x01 != 0 {
                (crc >> 1) ^ POLY
            } else {
                crc >> 1
            };
        }
    }
    crc
}

#[inline]
pub fn crc8(data: &[u8]) -> u8 {
    crc8_update(0, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(crc8(b"123456789"), 0xA1);
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data = [0x55, 0xAA, 0x13, 0x00, 0x00, 0x80, 0x3F, 0x02];
        let split = crc8_update(crc8(&data[..3]), &data[3..]);
        assert_eq!(split, crc8(&data));
    }
}
