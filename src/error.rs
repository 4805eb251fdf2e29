// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

/// modbus-transport-core Error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Invalid buffer size
    BufferSize,
    /// Invalid function code
    FnCode(u8),
    /// Invalid CRC
    Crc(u16, u16),
    /// Invalid LRC
    Lrc(u8, u8),
    /// Invalid byte count
    ByteCount(u8),
    /// A function code has no registered decoder
    UnknownFunction(u8),
    /// A transaction id had no matching in-flight request
    UnknownTransaction(u16),
    /// Malformed frame structure (missing delimiter, bad bracketing, ...)
    Framing(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BufferSize => write!(f, "Invalid buffer size"),
            Self::FnCode(fn_code) => write!(f, "Invalid function code: 0x{fn_code:0>2X}"),
            Self::Crc(expected, actual) => write!(
                f,
                "Invalid CRC: expected = 0x{expected:0>4X}, actual = 0x{actual:0>4X}"
            ),
            Self::Lrc(expected, actual) => write!(
                f,
                "Invalid LRC: expected = 0x{expected:0>2X}, actual = 0x{actual:0>2X}"
            ),
            Self::ByteCount(cnt) => write!(f, "Invalid byte count: {cnt}"),
            Self::UnknownFunction(fn_code) => {
                write!(
                    f,
                    "No decoder registered for function code: 0x{fn_code:0>2X}"
                )
            }
            Self::UnknownTransaction(tid) => {
                write!(f, "No in-flight transaction for id: {tid}")
            }
            Self::Framing(reason) => write!(f, "Malformed frame: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

/// Shorthand for operations that can fail with this crate's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
