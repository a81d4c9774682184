//! Error types for dump operations

use romclient_serial::LinkError;
use thiserror::Error;

/// Errors reported by the dump engine
#[derive(Debug, Error)]
pub enum DumpError {
    /// A dump was requested while another one is running
    #[error("Busy: a dump is already in progress")]
    Busy,

    /// Waiting for a dump that was never requested
    #[error("No dump has been requested")]
    NotStarted,

    /// Port or bank-switching changes are refused while a dump holds the lock
    #[error("Settings are locked while a dump is in progress")]
    Locked,

    /// The selected bank-switching scheme cannot be dumped
    #[error("Unsupported bankswitching method {0}")]
    Unsupported(&'static str),

    /// No reply arrived before the dump timeout expired
    #[error("Operation timed out")]
    Timeout,

    /// The dump was aborted by the caller
    #[error("Dump operation aborted")]
    Aborted,

    /// Communication with the firmware failed
    #[error(transparent)]
    Link(#[from] LinkError),

    /// ROM image error
    #[error("ROM error: {0}")]
    Rom(#[from] romclient_core::Error),

    /// Saving the dump failed
    #[error("Could not save dump: {0}")]
    Save(#[from] std::io::Error),
}

/// Result type for dump operations
pub type Result<T> = std::result::Result<T, DumpError>;
