// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ASCII framer.
//!
//! Wire layout, printable: `':' HEX(uid) HEX(fn) HEX(body...) HEX(lrc) CR LF`,
//! each on-wire byte two ASCII hex digits. Integrity is [`crate::crc::lrc8`]
//! rather than a CRC.

use std::sync::Arc;

use crate::crc::{check_lrc8, lrc8};
use crate::error::Result;
use crate::pdu::{Decoder, Pdu};

use super::{drop_front, push_bytes, ByteBuffer, Framer};

const START: u8 = b':';

struct AsciiHeader {
    unit_id: u8,
    /// Buffer offset one past the trailing LF, i.e. the whole on-wire
    /// frame length from the buffer's current front.
    frame_end: usize,
    /// Decoded function-code byte + body (uid and trailing LRC stripped).
    payload: Vec<u8>,
}

pub struct AsciiFramer {
    buffer: ByteBuffer,
    header: Option<AsciiHeader>,
    /// Set when a `':' ... CR LF` span was found but its contents failed to
    /// hex-decode or its LRC didn't check out; carries the span's end so
    /// `advance_frame` can skip past it.
    malformed_end: Option<usize>,
    decoder: Arc<dyn Decoder>,
}

impl AsciiFramer {
    #[must_use]
    pub fn new(decoder: Arc<dyn Decoder>) -> Self {
        Self {
            buffer: ByteBuffer::new(),
            header: None,
            malformed_end: None,
            decoder,
        }
    }

    fn colon_pos(&self) -> Option<usize> {
        self.buffer.iter().position(|&b| b == START)
    }

    /// Index of the `CR` starting a `CR LF` pair, searched from `start`.
    fn crlf_pos(&self, start: usize) -> Option<usize> {
        if self.buffer.len() < start + 2 {
            return None;
        }
        (start..=self.buffer.len() - 2).find(|&i| self.buffer[i] == b'\r' && self.buffer[i + 1] == b'\n')
    }
}

fn hex_decode(hex: &[u8]) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    hex.chunks_exact(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some(((hi << 4) | lo) as u8)
        })
        .collect()
}

fn hex_encode_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

impl Framer for AsciiFramer {
    fn add_to_frame(&mut self, bytes: &[u8]) {
        push_bytes(&mut self.buffer, bytes);
    }

    fn is_frame_ready(&self) -> bool {
        self.colon_pos().is_some_and(|colon| self.crlf_pos(colon + 1).is_some())
    }

    fn check_frame(&mut self) -> bool {
        self.header = None;
        self.malformed_end = None;

        let Some(colon) = self.colon_pos() else {
            return false;
        };
        let Some(cr) = self.crlf_pos(colon + 1) else {
            return false;
        };
        let frame_end = cr + 2;

        let hex: Vec<u8> = (colon + 1..cr).map(|i| self.buffer[i]).collect();
        let Some(decoded) = hex_decode(&hex) else {
            #[cfg(feature = "log")]
            log::warn!("ASCII framer: non-hex payload, resyncing");
            self.malformed_end = Some(frame_end);
            return false;
        };
        let Some((&lrc_byte, rest)) = decoded.split_last() else {
            self.malformed_end = Some(frame_end);
            return false;
        };
        if rest.is_empty() || !check_lrc8(rest, lrc_byte) {
            #[cfg(feature = "log")]
            log::warn!(
                "ASCII framer: LRC mismatch, expected = 0x{lrc_byte:02X}, actual = 0x{:02X}",
                lrc8(rest)
            );
            self.malformed_end = Some(frame_end);
            return false;
        }

        let unit_id = rest[0];
        let payload = rest[1..].to_vec();
        self.header = Some(AsciiHeader {
            unit_id,
            frame_end,
            payload,
        });
        true
    }

    fn get_frame(&mut self) -> &[u8] {
        self.header.as_ref().map_or(&[][..], |header| header.payload.as_slice())
    }

    fn advance_frame(&mut self) {
        if let Some(header) = self.header.take() {
            drop_front(&mut self.buffer, header.frame_end);
            return;
        }
        if let Some(frame_end) = self.malformed_end.take() {
            drop_front(&mut self.buffer, frame_end);
            match self.colon_pos() {
                Some(next_colon) => drop_front(&mut self.buffer, next_colon),
                None => self.buffer.clear(),
            }
        }
    }

    fn populate_result(&self, pdu: &mut dyn Pdu) {
        let unit_id = self.header.as_ref().map_or(0, |header| header.unit_id);
        pdu.set_transaction_id(0);
        pdu.set_protocol_id(0);
        pdu.set_unit_id(unit_id);
    }

    fn build_packet(&self, pdu: &dyn Pdu) -> Result<Vec<u8>> {
        let body = pdu.encode()?;
        let mut decoded = Vec::with_capacity(2 + body.len());
        decoded.push(pdu.unit_id());
        decoded.extend_from_slice(&body);
        decoded.push(lrc8(&decoded));

        let mut out = Vec::with_capacity(1 + decoded.len() * 2 + 2);
        out.push(START);
        out.extend_from_slice(hex_encode_upper(&decoded).as_bytes());
        out.extend_from_slice(b"\r\n");
        Ok(out)
    }

    fn decoder(&self) -> &dyn Decoder {
        self.decoder.as_ref()
    }
}
