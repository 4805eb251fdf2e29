// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proprietary delimiter-framed Binary transport.
//!
//! Wire layout: `'{' uid(1) fn(1) body(N) crc(2) '}'`, where `'{' = 0x7B`
//! and `'}' = 0x7D`. The CRC is [`crate::crc::crc16`]'s output written
//! big-endian, which is the wire's native byte order for this transport.
//!
//! Body bytes equal to either delimiter are **not** escaped: a payload byte
//! of `0x7D` terminates the frame early. This is preserved from the source
//! this framing was distilled from rather than invented; do not add
//! escaping here.

use std::sync::Arc;

use crate::crc::{check_crc16, crc16};
use crate::error::Result;
use crate::pdu::{Decoder, Pdu};

use super::{drop_front, push_bytes, ByteBuffer, Framer};

const OPEN: u8 = 0x7B;
const CLOSE: u8 = 0x7D;
/// `'{' + uid + fn + crc(2) + '}'`, the smallest frame with an empty body.
const MIN_FRAME_LEN: usize = 6;

#[derive(Debug, Clone, Copy)]
struct BinaryHeader {
    unit_id: u8,
    payload_start: usize,
    payload_end: usize,
    /// Buffer offset one past the closing delimiter.
    frame_end: usize,
}

pub struct BinaryFramer {
    buffer: ByteBuffer,
    header: Option<BinaryHeader>,
    /// Set when a `'{' ... '}'` span was found but failed its CRC or was
    /// too short to be a real frame; carries the span's end.
    malformed_end: Option<usize>,
    decoder: Arc<dyn Decoder>,
}

impl BinaryFramer {
    #[must_use]
    pub fn new(decoder: Arc<dyn Decoder>) -> Self {
        Self {
            buffer: ByteBuffer::new(),
            header: None,
            malformed_end: None,
            decoder,
        }
    }

    fn open_pos(&self) -> Option<usize> {
        self.buffer.iter().position(|&b| b == OPEN)
    }

    fn close_pos(&self, start: usize) -> Option<usize> {
        (start..self.buffer.len()).find(|&i| self.buffer[i] == CLOSE)
    }
}

impl Framer for BinaryFramer {
    fn add_to_frame(&mut self, bytes: &[u8]) {
        push_bytes(&mut self.buffer, bytes);
    }

    fn is_frame_ready(&self) -> bool {
        self.open_pos().is_some_and(|open| self.close_pos(open + 1).is_some())
    }

    fn check_frame(&mut self) -> bool {
        self.header = None;
        self.malformed_end = None;

        let Some(open) = self.open_pos() else {
            return false;
        };
        let Some(close) = self.close_pos(open + 1) else {
            return false;
        };
        let frame_end = close + 1;

        if close - open + 1 < MIN_FRAME_LEN {
            #[cfg(feature = "log")]
            log::warn!("Binary framer: frame too short, resyncing");
            self.malformed_end = Some(frame_end);
            return false;
        }

        let crc_start = close - 2;
        let slice = self.buffer.make_contiguous();
        let data = &slice[open + 1..crc_start];
        let expected = u16::from_be_bytes([slice[crc_start], slice[crc_start + 1]]);
        if !check_crc16(data, expected) {
            #[cfg(feature = "log")]
            log::warn!(
                "Binary framer: CRC mismatch, expected = 0x{expected:04X}, actual = 0x{:04X}",
                crc16(data)
            );
            self.malformed_end = Some(frame_end);
            return false;
        }

        self.header = Some(BinaryHeader {
            unit_id: slice[open + 1],
            payload_start: open + 2,
            payload_end: crc_start,
            frame_end,
        });
        true
    }

    fn get_frame(&mut self) -> &[u8] {
        let Some(header) = self.header else {
            return &[];
        };
        let slice = self.buffer.make_contiguous();
        &slice[header.payload_start..header.payload_end]
    }

    fn advance_frame(&mut self) {
        if let Some(header) = self.header.take() {
            drop_front(&mut self.buffer, header.frame_end);
            return;
        }
        if let Some(frame_end) = self.malformed_end.take() {
            drop_front(&mut self.buffer, frame_end);
            match self.open_pos() {
                Some(next_open) => drop_front(&mut self.buffer, next_open),
                None => self.buffer.clear(),
            }
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
        let mut framed = Vec::with_capacity(1 + body.len());
        framed.push(pdu.unit_id());
        framed.extend_from_slice(&body);
        let crc = crc16(&framed);

        let mut out = Vec::with_capacity(framed.len() + 4);
        out.push(OPEN);
        out.extend_from_slice(&framed);
        out.extend_from_slice(&crc.to_be_bytes());
        out.push(CLOSE);
        Ok(out)
    }

    fn decoder(&self) -> &dyn Decoder {
        self.decoder.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::{DecoderType, GenericPdu, StaticDecoder};

    fn framer() -> BinaryFramer {
        BinaryFramer::new(Arc::new(StaticDecoder::new(DecoderType::Request)))
    }

    #[test]
    fn s9_decodes_function_and_body_between_delimiters() {
        let mut f = framer();
        f.add_to_frame(b"\x7b\x01\x03\x00\x00\x00\x05\x85\xC9\x7d");
        assert!(f.check_frame());
        assert_eq!(f.get_frame(), &[0x03, 0x00, 0x00, 0x00, 0x05]);
        assert_eq!(f.header.unwrap().unit_id, 0x01);
    }

    #[test]
    fn s10_build_packet_matches_wire_bytes() {
        let f = framer();
        let mut pdu = GenericPdu::new(1);
        pdu.set_unit_id(0xff);
        assert_eq!(f.build_packet(&pdu).unwrap(), b"\x7b\xff\x01\x81\x80\x7d");
    }

    #[test]
    fn fragmentation_is_transparent_to_the_result_sequence() {
        let whole = b"\x7b\x01\x03\x00\x00\x00\x05\x85\xC9\x7d";
        let mut one_shot = framer();
        one_shot.add_to_frame(whole);
        assert!(one_shot.check_frame());
        let whole_frame = one_shot.get_frame().to_vec();

        let mut chunked = framer();
        for byte in whole {
            chunked.add_to_frame(std::slice::from_ref(byte));
        }
        assert!(chunked.check_frame());
        assert_eq!(chunked.get_frame(), whole_frame.as_slice());
    }

    #[test]
    fn crc_mismatch_resyncs_past_the_corrupt_frame() {
        let mut f = framer();
        f.add_to_frame(b"\x7b\x01\x03\x00\x00\x00\x05\xff\xff\x7d");
        assert!(!f.check_frame());
        f.advance_frame();
        assert!(f.buffer.is_empty());
    }

    #[test]
    fn advance_frame_after_success_clears_the_consumed_span() {
        let mut f = framer();
        f.add_to_frame(b"\x7b\x01\x03\x00\x00\x00\x05\x85\xC9\x7d");
        assert!(f.check_frame());
        f.advance_frame();
        assert!(f.buffer.is_empty());
        assert!(!f.check_frame());
    }
}
