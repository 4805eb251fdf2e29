//! Modbus transport core: framers for TCP/MBAP, RTU, ASCII and the
//! proprietary Binary transport, sharing one abstract contract, plus a
//! transaction manager for correlating requests and responses.
//!
//! Transport I/O (the socket/serial read-write loop) and PDU semantics
//! beyond the header (coil/register encoding) stay out of scope: framers
//! consume a [`pdu::Decoder`] capability and hand back a [`pdu::Pdu`]
//! trait object, never interpreting function-code semantics themselves.

mod crc;
mod error;
pub mod framer;
mod pdu;
mod transaction;

pub use crc::{check_crc16, check_lrc8, crc16, lrc8};
pub use error::{Error, Result};
pub use framer::Framer;
pub use pdu::{is_exception, Decoder, DecoderType, FrameLen, GenericPdu, Pdu, StaticDecoder};
pub use transaction::TransactionManager;

#[cfg(feature = "ascii")]
pub use framer::ascii::AsciiFramer;
#[cfg(feature = "binary")]
pub use framer::binary::BinaryFramer;
#[cfg(feature = "rtu")]
pub use framer::rtu::RtuFramer;
#[cfg(feature = "tcp")]
pub use framer::tcp::TcpFramer;
