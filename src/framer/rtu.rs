// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTU framer.
//!
//! Wire layout: `uid(1) fn(1) body(N) crc(2)`. `N` is implied by the
//! function code via the `Decoder`'s function-code length table; the CRC
//! is computed with [`crate::crc::crc16`], whose byte-swapped output
//! reproduces the little-endian-on-the-wire convention this transport uses
//! when written with [`byteorder::BigEndian`].
//!
//! No inter-frame timing is used here: frames are sized from the header,
//! never from a 3.5-character silence window.

use std::sync::Arc;

use crate::crc::{check_crc16, crc16};
use crate::error::Result;
use crate::pdu::{is_exception, Decoder, FrameLen, Pdu};

use super::{drop_front, push_bytes, ByteBuffer, Framer};

const MIN_FRAME_LEN: usize = 4;
const CRC_LEN: usize = 2;

#[derive(Debug, Clone, Copy)]
struct RtuHeader {
    unit_id: u8,
    /// Total on-wire length: uid + function + body + crc.
    len: usize,
}

pub struct RtuFramer {
    buffer: ByteBuffer,
    header: Option<RtuHeader>,
    decoder: Arc<dyn Decoder>,
}

impl RtuFramer {
    #[must_use]
    pub fn new(decoder: Arc<dyn Decoder>) -> Self {
        Self {
            buffer: ByteBuffer::new(),
            header: None,
            decoder,
        }
    }

    /// Parse `uid`/`function`, size the frame from the function-code
    /// length table, and cache `{uid, len}` if the buffer already holds
    /// enough bytes to know the total length. Returns `false` (without
    /// touching `header`) if there are not yet enough bytes to decide.
    fn populate_header(&mut self) -> bool {
        self.header = None;
        if self.buffer.len() < 2 {
            return false;
        }
        let unit_id = self.buffer[0];
        let function_code = self.buffer[1];

        let frame_len = if is_exception(function_code) {
            FrameLen::Fixed(1)
        } else {
            match self.decoder.frame_len(function_code) {
                Ok(frame_len) => frame_len,
                Err(_) => return false,
            }
        };

        let body_len = match frame_len {
            FrameLen::Fixed(n) => n,
            FrameLen::VariableByteCountAt(offset) => {
                let byte_count_index = 2 + offset;
                if self.buffer.len() <= byte_count_index {
                    return false;
                }
                offset + 1 + usize::from(self.buffer[byte_count_index])
            }
        };

        let len = 2 + body_len + CRC_LEN;
        if self.buffer.len() < len {
            return false;
        }
        self.header = Some(RtuHeader { unit_id, len });
        true
    }
}

impl Framer for RtuFramer {
    fn add_to_frame(&mut self, bytes: &[u8]) {
        push_bytes(&mut self.buffer, bytes);
    }

    fn is_frame_ready(&self) -> bool {
        self.buffer.len() >= MIN_FRAME_LEN
    }

    fn check_frame(&mut self) -> bool {
        if !self.populate_header() {
            return false;
        }
        let header = self.header.expect("populate_header just set it");
        let slice = self.buffer.make_contiguous();
        let data = &slice[..header.len - CRC_LEN];
        let expected = u16::from_be_bytes([slice[header.len - 2], slice[header.len - 1]]);
        if !check_crc16(data, expected) {
            #[cfg(feature = "log")]
            log::warn!(
                "RTU framer: CRC mismatch, expected = 0x{expected:04X}, actual = 0x{:04X}",
                crc16(data)
            );
            self.header = None;
            return false;
        }
        true
    }

    fn get_frame(&mut self) -> &[u8] {
        let Some(header) = self.header else {
            return &[];
        };
        let slice = self.buffer.make_contiguous();
        &slice[1..header.len - CRC_LEN]
    }

    fn advance_frame(&mut self) {
        match self.header.take() {
            Some(header) => drop_front(&mut self.buffer, header.len),
            None => drop_front(&mut self.buffer, 1),
        }
    }

    fn populate_result(&self, pdu: &mut dyn Pdu) {
        let unit_id = self.header.map_or(0, |header| header.unit_id);
        pdu.set_transaction_id(0);
        pdu.set_protocol_id(0);
        pdu.set_unit_id(unit_id);
    }

    fn build_packet(&self, pdu: &dyn Pdu) -> Result<Vec<u8>> {
        let body = pdu.encode()?;
        let mut out = Vec::with_capacity(1 + body.len() + CRC_LEN);
        out.push(pdu.unit_id());
        out.extend_from_slice(&body);
        let crc = crc16(&out);
        out.extend_from_slice(&crc.to_be_bytes());
        Ok(out)
    }

    fn decoder(&self) -> &dyn Decoder {
        self.decoder.as_ref()
    }
}
