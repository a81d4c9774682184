//! Error types for romclient-core
//!
//! This module provides a no_std compatible error type shared by the packet
//! codec, the ROM image and the bank-switching plans.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Packet errors
    /// Frame is shorter than the fixed packet header
    TooShort {
        /// Number of bytes that were available
        len: usize,
    },
    /// Checksum carried in the header does not match the frame contents
    ChecksumMismatch {
        /// Checksum found in the header
        expected: u16,
        /// Checksum computed over the received bytes
        computed: u16,
    },
    /// Payload does not fit the 16-bit length field
    PayloadTooLarge(usize),
    /// Unknown command opcode
    UnknownCommand(u8),

    // ROM image errors
    /// ROM size must be a power of two
    NotPowerOfTwo(usize),
    /// Write would extend past the end of the ROM image
    OutOfBounds {
        /// Offset of the write
        offset: usize,
        /// Length of the write
        len: usize,
        /// Size of the ROM image
        size: usize,
    },
    /// ROM contents were requested before the dump completed
    InvalidRom,

    // Bank-switching errors
    /// Bank-switching scheme has no read plan
    UnsupportedBankSwitch(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => {
                write!(f, "frame too short: {} bytes, need at least 10", len)
            }
            Self::ChecksumMismatch { expected, computed } => write!(
                f,
                "checksum mismatch: header says 0x{:04X}, computed 0x{:04X}",
                expected, computed
            ),
            Self::PayloadTooLarge(len) => write!(f, "payload too large: {} bytes", len),
            Self::UnknownCommand(op) => write!(f, "unknown command opcode 0x{:02X}", op),
            Self::NotPowerOfTwo(size) => write!(f, "ROM size must be power of 2, got {}", size),
            Self::OutOfBounds { offset, len, size } => write!(
                f,
                "write of {} bytes at offset 0x{:04X} is outside of {} byte ROM",
                len, offset, size
            ),
            Self::InvalidRom => write!(f, "trying to access invalid ROM"),
            Self::UnsupportedBankSwitch(name) => {
                write!(f, "bank switching method '{}' is not supported", name)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
