// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TCP/MBAP framer.
//!
//! Wire layout, big-endian: `tid(2) pid(2) len(2) uid(1) fn(1) body(len-2)`.
//! `len` counts `uid` + `fn` + `body`.

use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};

use crate::error::Result;
use crate::pdu::{Decoder, Pdu};

use super::{drop_front, push_bytes, ByteBuffer, Framer};

const HEADER_LEN: usize = 6;
const MIN_FRAME_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
struct TcpHeader {
    transaction_id: u16,
    protocol_id: u16,
    length: u16,
    unit_id: u8,
}

pub struct TcpFramer {
    buffer: ByteBuffer,
    header: Option<TcpHeader>,
    /// Set when `check_frame` positively identified a malformed preamble
    /// (as opposed to merely incomplete data); `advance_frame` flushes the
    /// whole buffer in that case, matching `testTCPFramerTransactionShort`.
    malformed: bool,
    decoder: Arc<dyn Decoder>,
}

impl TcpFramer {
    #[must_use]
    pub fn new(decoder: Arc<dyn Decoder>) -> Self {
        Self {
            buffer: ByteBuffer::new(),
            header: None,
            malformed: false,
            decoder,
        }
    }

    fn length_field(&self) -> Option<u16> {
        if self.buffer.len() < HEADER_LEN {
            return None;
        }
        Some(BigEndian::read_u16(&[self.buffer[4], self.buffer[5]]))
    }
}

impl Framer for TcpFramer {
    fn add_to_frame(&mut self, bytes: &[u8]) {
        push_bytes(&mut self.buffer, bytes);
    }

    fn is_frame_ready(&self) -> bool {
        if self.buffer.len() < MIN_FRAME_LEN {
            return false;
        }
        match self.length_field() {
            Some(length) => self.buffer.len() >= HEADER_LEN + usize::from(length),
            None => false,
        }
    }

    fn check_frame(&mut self) -> bool {
        self.header = None;
        self.malformed = false;

        if self.buffer.len() < MIN_FRAME_LEN {
            return false;
        }

        let protocol_id = BigEndian::read_u16(&[self.buffer[2], self.buffer[3]]);
        let length = BigEndian::read_u16(&[self.buffer[4], self.buffer[5]]);

        if length < 2 {
            #[cfg(feature = "log")]
            log::warn!("TCP framer: length field {length} too short to hold unit+function, resyncing");
            self.malformed = true;
            return false;
        }
        if self.buffer.len() < HEADER_LEN + usize::from(length) {
            return false;
        }

        let transaction_id = BigEndian::read_u16(&[self.buffer[0], self.buffer[1]]);
        let unit_id = self.buffer[6];
        self.header = Some(TcpHeader {
            transaction_id,
            protocol_id,
            length,
            unit_id,
        });
        true
    }

    fn get_frame(&mut self) -> &[u8] {
        let Some(header) = self.header else {
            return &[];
        };
        let end = HEADER_LEN + usize::from(header.length);
        let slice = self.buffer.make_contiguous();
        if slice.len() < end {
            return &[];
        }
        &slice[7..end]
    }

    fn advance_frame(&mut self) {
        if let Some(header) = self.header.take() {
            drop_front(&mut self.buffer, HEADER_LEN + usize::from(header.length));
        } else if self.malformed {
            self.buffer.clear();
            self.malformed = false;
        }
    }

    fn populate_result(&self, pdu: &mut dyn Pdu) {
        let header = self.header.unwrap_or_default();
        pdu.set_transaction_id(header.transaction_id);
        pdu.set_protocol_id(header.protocol_id);
        pdu.set_unit_id(header.unit_id);
    }

    fn build_packet(&self, pdu: &dyn Pdu) -> Result<Vec<u8>> {
        let body = pdu.encode()?;
        let length = 1 + body.len();
        let mut out = Vec::with_capacity(HEADER_LEN + 1 + body.len());
        out.extend_from_slice(&pdu.transaction_id().to_be_bytes());
        out.extend_from_slice(&pdu.protocol_id().to_be_bytes());
        out.extend_from_slice(&(length as u16).to_be_bytes());
        out.push(pdu.unit_id());
        out.extend_from_slice(&body);
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

    fn framer() -> TcpFramer {
        TcpFramer::new(Arc::new(StaticDecoder::new(DecoderType::Request)))
    }

    #[test]
    fn s1_single_chunk_frame_is_ready_and_checks_out() {
        let mut f = framer();
        f.add_to_frame(b"\x00\x01\x12\x34\x00\x04\xff\x02\x12\x34");
        assert!(f.check_frame());
        assert_eq!(f.get_frame(), &[0x02, 0x12, 0x34]);
        let header = f.header.unwrap();
        assert_eq!(header.transaction_id, 1);
        assert_eq!(header.protocol_id, 0x1234);
        assert_eq!(header.unit_id, 0xff);
    }

    #[test]
    fn s2_split_chunks_become_ready_once_complete() {
        let mut f = framer();
        f.add_to_frame(b"\x00\x01\x12\x34\x00");
        assert!(!f.check_frame());
        f.add_to_frame(b"\x04\xff\x02\x12\x34");
        assert!(f.check_frame());
        assert_eq!(f.get_frame(), &[0x02, 0x12, 0x34]);
    }

    #[test]
    fn s3_short_length_field_resyncs_by_flushing_the_buffer() {
        let mut f = framer();
        f.add_to_frame(b"\x99\x99\x99\x99\x00\x01\x00\x01");
        assert!(!f.check_frame());
        f.advance_frame();
        assert!(f.buffer.is_empty());

        f.add_to_frame(b"\x00\x01\x12\x34\x00\x05\xff\x02\x12\x34");
        assert_eq!(f.buffer.len(), 10);
        assert!(f.check_frame());
        assert_eq!(f.get_frame(), &[0x02, 0x12, 0x34]);
    }

    #[test]
    fn s4_build_packet_matches_wire_bytes() {
        let f = framer();
        let mut pdu = GenericPdu::new(1);
        pdu.set_transaction_id(1);
        pdu.set_protocol_id(0x1234);
        pdu.set_unit_id(0xff);
        let packet = f.build_packet(&pdu).unwrap();
        assert_eq!(packet, b"\x00\x01\x12\x34\x00\x02\xff\x01");
    }

    #[test]
    fn advance_frame_after_success_clears_header_and_buffer() {
        let mut f = framer();
        f.add_to_frame(b"\x00\x01\x12\x34\x00\x04\xff\x02\x12\x34");
        assert!(f.check_frame());
        f.advance_frame();
        assert!(f.buffer.is_empty());
        assert!(!f.check_frame());
    }

    #[test]
    fn fragmentation_is_transparent_to_the_result_sequence() {
        let whole = b"\x00\x01\x00\x00\x00\x02\xff\x01";
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
}
