// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PDU header and the Decoder capability that resolves function codes to
//! concrete message types.
//!
//! Framers never interpret function-code semantics. They hand a `Decoder`
//! the function code found in an incoming frame, get back an empty [`Pdu`],
//! and call [`Pdu::decode`] on it. This module also ships a minimal
//! `GenericPdu`/`StaticDecoder` pair so the framers are exercisable without
//! a sibling PDU-semantics crate.

use std::fmt;

use crate::error::{Error, Result};

/// A decoded (or about-to-be-decoded) Modbus message.
///
/// `transaction_id`/`protocol_id` are meaningful on TCP only and default to
/// 0 on the other transports; `unit_id` and `function_code` are wire-present
/// everywhere.
pub trait Pdu: fmt::Debug + Send + Sync {
    fn transaction_id(&self) -> u16;
    fn set_transaction_id(&mut self, transaction_id: u16);

    fn protocol_id(&self) -> u16;
    fn set_protocol_id(&mut self, protocol_id: u16);

    fn unit_id(&self) -> u8;
    fn set_unit_id(&mut self, unit_id: u8);

    fn function_code(&self) -> u8;

    /// Populate `self` from `payload`, the function-code byte followed by
    /// the body, as returned by `Framer::get_frame`.
    fn decode(&mut self, payload: &[u8]) -> Result<()>;

    /// Emit the function-code byte followed by the body.
    fn encode(&self) -> Result<Vec<u8>>;
}

/// `function_code & 0x80 != 0`.
#[must_use]
pub fn is_exception(function_code: u8) -> bool {
    function_code & 0x80 != 0
}

/// A self-contained [`Pdu`] that stores its body as opaque bytes.
///
/// This is the only concrete `Pdu` this crate ships; a real deployment
/// would plug in richer, typed messages (coil/register reads, writes, ...)
/// through its own `Decoder` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericPdu {
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub unit_id: u8,
    pub function_code: u8,
    pub body: Vec<u8>,
}

impl GenericPdu {
    #[must_use]
    pub fn new(function_code: u8) -> Self {
        Self {
            function_code,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_exception(&self) -> bool {
        is_exception(self.function_code)
    }

    #[must_use]
    pub fn exception_code(&self) -> Option<u8> {
        self.is_exception().then(|| self.body.first().copied()).flatten()
    }
}

impl Pdu for GenericPdu {
    fn transaction_id(&self) -> u16 {
        self.transaction_id
    }

    fn set_transaction_id(&mut self, transaction_id: u16) {
        self.transaction_id = transaction_id;
    }

    fn protocol_id(&self) -> u16 {
        self.protocol_id
    }

    fn set_protocol_id(&mut self, protocol_id: u16) {
        self.protocol_id = protocol_id;
    }

    fn unit_id(&self) -> u8 {
        self.unit_id
    }

    fn set_unit_id(&mut self, unit_id: u8) {
        self.unit_id = unit_id;
    }

    fn function_code(&self) -> u8 {
        self.function_code
    }

    fn decode(&mut self, payload: &[u8]) -> Result<()> {
        let (function_code, body) = payload.split_first().ok_or(Error::BufferSize)?;
        self.function_code = *function_code;
        self.body = body.to_vec();
        Ok(())
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(1 + self.body.len());
        out.push(self.function_code);
        out.extend_from_slice(&self.body);
        Ok(out)
    }
}

/// Whether a `Decoder` is sizing requests or responses. RTU framing needs
/// this because the byte-count-at-offset convention differs by direction
/// for several function codes (e.g. 0x0F/0x10 carry the byte count in the
/// request but not the response).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderType {
    Request,
    Response,
}

/// How to compute the body length (everything after the function code,
/// before any trailing integrity bytes) for a given function code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLen {
    /// Body is always this many bytes.
    Fixed(usize),
    /// Body carries a byte-count field at this offset (0-based, counted
    /// from the first body byte); total body length is
    /// `offset + 1 + body[offset]`.
    VariableByteCountAt(usize),
}

/// Resolves function codes to message templates and exposes the
/// function-code length table the RTU framer needs to size a frame before
/// it has been fully received.
pub trait Decoder: Send + Sync {
    fn decoder_type(&self) -> DecoderType;

    /// Body-length rule for `function_code`, independent of the exception
    /// bit (callers handle `function_code & 0x80` themselves: an exception
    /// body is always exactly 1 byte).
    fn frame_len(&self, function_code: u8) -> Result<FrameLen>;

    /// Resolve `function_code` to a fresh, undecoded message.
    fn lookup(&self, function_code: u8) -> Option<Box<dyn Pdu>>;
}

/// Body length, not counting the function-code byte, for standard Modbus
/// request PDUs. Grounded on the same per-function table the teacher's
/// `codec::rtu`/`codec::tcp` modules use to size a frame before decoding.
fn request_frame_len(function_code: u8) -> Result<FrameLen> {
    match function_code {
        0x01..=0x06 => Ok(FrameLen::Fixed(4)),
        0x07 | 0x0B | 0x0C | 0x11 => Ok(FrameLen::Fixed(0)),
        0x0F | 0x10 => Ok(FrameLen::VariableByteCountAt(4)),
        0x16 => Ok(FrameLen::Fixed(6)),
        0x17 => Ok(FrameLen::VariableByteCountAt(8)),
        _ => Err(Error::UnknownFunction(function_code)),
    }
}

/// Body length, not counting the function-code byte, for standard Modbus
/// response PDUs.
fn response_frame_len(function_code: u8) -> Result<FrameLen> {
    match function_code {
        0x01 | 0x02 | 0x03 | 0x04 | 0x0C | 0x17 => Ok(FrameLen::VariableByteCountAt(0)),
        0x05 | 0x06 | 0x0B | 0x0F | 0x10 => Ok(FrameLen::Fixed(4)),
        0x07 => Ok(FrameLen::Fixed(1)),
        0x16 => Ok(FrameLen::Fixed(6)),
        _ => Err(Error::UnknownFunction(function_code)),
    }
}

/// The default [`Decoder`]: sizes frames from the standard table above and
/// always resolves `lookup` to a [`GenericPdu`].
#[derive(Debug, Clone, Copy)]
pub struct StaticDecoder {
    decoder_type: DecoderType,
}

impl StaticDecoder {
    #[must_use]
    pub const fn new(decoder_type: DecoderType) -> Self {
        Self { decoder_type }
    }
}

impl Decoder for StaticDecoder {
    fn decoder_type(&self) -> DecoderType {
        self.decoder_type
    }

    fn frame_len(&self, function_code: u8) -> Result<FrameLen> {
        if is_exception(function_code) {
            return Ok(FrameLen::Fixed(1));
        }
        match self.decoder_type {
            DecoderType::Request => request_frame_len(function_code),
            DecoderType::Response => response_frame_len(function_code),
        }
    }

    fn lookup(&self, function_code: u8) -> Option<Box<dyn Pdu>> {
        Some(Box::new(GenericPdu::new(function_code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_pdu_round_trips_function_code_and_body() {
        let mut pdu = GenericPdu::new(0);
        pdu.decode(&[0x03, 0x00, 0x00, 0x00, 0x05]).unwrap();
        assert_eq!(pdu.function_code(), 0x03);
        assert_eq!(pdu.body, vec![0x00, 0x00, 0x00, 0x05]);
        assert_eq!(pdu.encode().unwrap(), vec![0x03, 0x00, 0x00, 0x00, 0x05]);
    }

    #[test]
    fn decode_rejects_empty_payload() {
        let mut pdu = GenericPdu::new(0);
        assert_eq!(pdu.decode(&[]), Err(Error::BufferSize));
    }

    #[test]
    fn exception_function_code_is_fixed_one_byte_regardless_of_direction() {
        let req = StaticDecoder::new(DecoderType::Request);
        let resp = StaticDecoder::new(DecoderType::Response);
        assert_eq!(req.frame_len(0x81).unwrap(), FrameLen::Fixed(1));
        assert_eq!(resp.frame_len(0x81).unwrap(), FrameLen::Fixed(1));
    }

    #[test]
    fn request_read_holding_registers_is_fixed_four() {
        let req = StaticDecoder::new(DecoderType::Request);
        assert_eq!(req.frame_len(0x03).unwrap(), FrameLen::Fixed(4));
    }

    #[test]
    fn response_read_holding_registers_carries_byte_count_at_zero() {
        let resp = StaticDecoder::new(DecoderType::Response);
        assert_eq!(resp.frame_len(0x03).unwrap(), FrameLen::VariableByteCountAt(0));
    }

    #[test]
    fn unknown_function_code_is_an_error() {
        let req = StaticDecoder::new(DecoderType::Request);
        assert_eq!(req.frame_len(0x2A), Err(Error::UnknownFunction(0x2A)));
    }

    #[test]
    fn is_exception_checks_bit_seven() {
        assert!(is_exception(0x81));
        assert!(!is_exception(0x01));
    }
}
