//! Error types for firmware link operations

use romclient_core::protocol::Command;
use thiserror::Error;

/// Firmware link errors
#[derive(Debug, Error)]
pub enum LinkError {
    /// No serial port is open
    #[error("Serial port is not open")]
    NotOpen,

    /// Failed to open the serial port
    #[error("Could not open {port}: {source}")]
    OpenFailed {
        /// Port name
        port: String,
        /// Underlying serial port error
        source: serialport::Error,
    },

    /// Output buffer did not drain in time
    #[error("Write timed out")]
    WriteTimeout,

    /// Firmware sent nothing before the read timeout expired
    #[error("No reply from firmware")]
    NoReply,

    /// Firmware reply ended early
    #[error("Incomplete reply: expected {expected} bytes, received {received}")]
    IncompleteReply {
        /// Frame length that was expected
        expected: usize,
        /// Bytes actually received
        received: usize,
    },

    /// Reply belongs to a different request
    #[error("Unexpected reply: expected {expected_command} at 0x{expected_address:04X}, got {command} at 0x{address:04X}")]
    UnexpectedReply {
        /// Command of the request
        expected_command: Command,
        /// Address of the request
        expected_address: u16,
        /// Command of the reply
        command: Command,
        /// Address of the reply
        address: u16,
    },

    /// Reply frame could not be decoded
    #[error("Bad packet: {0}")]
    Packet(#[from] romclient_core::Error),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    Io(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl LinkError {
    /// Failure of the serial connection itself
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LinkError::NotOpen
                | LinkError::OpenFailed { .. }
                | LinkError::WriteTimeout
                | LinkError::Io(_)
                | LinkError::Serial(_)
        )
    }

    /// Firmware answered with something other than a valid reply frame
    pub fn is_protocol(&self) -> bool {
        !self.is_transport()
    }
}

impl From<std::io::Error> for LinkError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            LinkError::WriteTimeout
        } else {
            LinkError::Io(e.to_string())
        }
    }
}

/// Result type for link operations
pub type Result<T> = std::result::Result<T, LinkError>;
