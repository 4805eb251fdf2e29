// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The abstract framer contract and the four concrete transports.

#[cfg(feature = "ascii")]
pub mod ascii;
#[cfg(feature = "binary")]
pub mod binary;
#[cfg(feature = "rtu")]
pub mod rtu;
#[cfg(feature = "tcp")]
pub mod tcp;

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::pdu::Pdu;

/// Byte buffer shared by every framer: O(1) amortised append via
/// [`VecDeque::push_back`], O(k) front-drop via [`VecDeque::drain`], and
/// contiguous slicing on demand for `get_frame` without an extra copy.
pub(crate) type ByteBuffer = VecDeque<u8>;

pub(crate) fn push_bytes(buffer: &mut ByteBuffer, bytes: &[u8]) {
    buffer.extend(bytes.iter().copied());
}

pub(crate) fn drop_front(buffer: &mut ByteBuffer, count: usize) {
    let count = count.min(buffer.len());
    buffer.drain(..count);
}

/// Buffered state machine shared by every transport: ingest bytes, test
/// readiness, validate, extract the PDU payload, advance, and build
/// outbound packets.
///
/// No operation here ever panics or returns `Err` for malformed wire data;
/// `check_frame`/`get_frame` degrade to `false`/empty. `Result` is reserved
/// for `build_packet` and the `next_message` convenience method, where a
/// `Decoder` miss or a `Pdu::encode`/`decode` failure needs to surface.
pub trait Framer {
    /// Append `bytes` to the internal buffer. Never fails on malformed
    /// input; validation happens later, in `check_frame`.
    fn add_to_frame(&mut self, bytes: &[u8]);

    /// Cheap check: true iff the buffer *may* contain a complete frame.
    fn is_frame_ready(&self) -> bool;

    /// True iff the buffer currently starts with a well-formed,
    /// integrity-valid frame. Idempotent and side-effect-free except that
    /// it may populate the cached header as a side effect of parsing.
    fn check_frame(&mut self) -> bool;

    /// The PDU payload (function-code byte + body) of the current frame,
    /// or an empty slice if none is ready. Does not advance the buffer.
    fn get_frame(&mut self) -> &[u8];

    /// Consume the current frame's full on-wire length and clear the
    /// cached header. If the last `check_frame` was false, advances by the
    /// minimum safe amount that restores alignment (transport-specific).
    fn advance_frame(&mut self);

    /// Stamp the cached header's transport-level fields
    /// (`transaction_id`/`protocol_id`/`unit_id`) onto `pdu`. Fields absent
    /// on this transport are left at their default (0).
    fn populate_result(&self, pdu: &mut dyn Pdu);

    /// Serialise `pdu` into a complete outbound ADU: transport header,
    /// `pdu.encode()` body, and trailer/integrity as applicable.
    fn build_packet(&self, pdu: &dyn Pdu) -> Result<Vec<u8>>;

    /// The `Decoder` this framer resolves function codes through.
    fn decoder(&self) -> &dyn crate::pdu::Decoder;

    /// Convenience composition of `check_frame` + `get_frame` +
    /// `Decoder::lookup` + `Pdu::decode` + `populate_result`. Returns
    /// `Ok(None)` when no complete frame is ready yet; does not advance
    /// the buffer, so callers still drive `advance_frame` themselves.
    fn next_message(&mut self) -> Result<Option<Box<dyn Pdu>>> {
        if !self.check_frame() {
            return Ok(None);
        }
        let frame = self.get_frame().to_vec();
        let function_code = *frame.first().ok_or(Error::BufferSize)?;
        let mut pdu = self
            .decoder()
            .lookup(function_code)
            .ok_or(Error::UnknownFunction(function_code))?;
        pdu.decode(&frame)?;
        self.populate_result(pdu.as_mut());
        Ok(Some(pdu))
    }
}
