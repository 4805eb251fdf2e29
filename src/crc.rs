// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integrity codecs shared by the RTU, ASCII and Binary framers.

/// Calculate the CRC (Cyclic Redundancy Check) sum using the Modbus
/// polynomial (`0xA001`, reflected, init `0xFFFF`).
///
/// The returned value is byte-swapped relative to the running CRC register,
/// so that writing it with [`byteorder::BigEndian`] reproduces the wire
/// order for every transport that carries this CRC (RTU transmits it
/// low-byte-first; the proprietary Binary framing transmits the same
/// register high-byte-first — both fall out of this one function plus
/// `BigEndian::write_u16`/`read_u16`).
#[must_use]
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for x in data {
        crc ^= u16::from(*x);
        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc >>= 1;
                crc ^= 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc.rotate_right(8)
}

/// Verify `expected` (as read off the wire) against the CRC of `data`.
#[must_use]
pub fn check_crc16(data: &[u8], expected: u16) -> bool {
    crc16(data) == expected
}

/// Calculate the LRC (Longitudinal Redundancy Check) used by the ASCII
/// framer: the two's-complement negation of the sum of `data`, mod 256.
#[must_use]
pub fn lrc8(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    sum.wrapping_neg()
}

/// Verify `expected` (as read off the wire) against the LRC of `data`.
#[must_use]
pub fn check_lrc8(data: &[u8], expected: u8) -> bool {
    lrc8(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_crc16() {
        let msg = &[0x01, 0x03, 0x08, 0x2B, 0x00, 0x02];
        assert_eq!(crc16(msg), 0xB663);

        let msg = &[0x01, 0x03, 0x04, 0x00, 0x20, 0x00, 0x00];
        assert_eq!(crc16(msg), 0xFBF9);
    }

    #[test]
    fn crc16_matches_rtu_wire_bytes() {
        // uid=0x00, function=0x01, body=00 00 00 01 -> crc \xfc\x1b on the wire
        let msg = &[0x00, 0x01, 0x00, 0x00, 0x00, 0x01];
        let crc = crc16(msg);
        assert_eq!(crc.to_be_bytes(), [0xfc, 0x1b]);
    }

    #[test]
    fn crc16_matches_binary_wire_bytes() {
        // uid=0x01, function=0x03, body=00 00 00 05 -> crc \x85\xC9 on the wire
        let msg = &[0x01, 0x03, 0x00, 0x00, 0x00, 0x05];
        let crc = crc16(msg);
        assert_eq!(crc.to_be_bytes(), [0x85, 0xC9]);
    }

    #[test]
    fn test_lrc8() {
        let data = &[0xF7, 0x03, 0x13, 0x89, 0x00, 0x0A];
        assert_eq!(lrc8(data), 0x60);
        assert!(check_lrc8(data, 0x60));
        assert!(!check_lrc8(data, 0x61));
    }

    #[test]
    fn lrc8_of_empty_is_zero() {
        assert_eq!(lrc8(&[]), 0);
    }
}
