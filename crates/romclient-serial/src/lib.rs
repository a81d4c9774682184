//! romclient-serial - Serial link to the cartridge reader firmware
//!
//! This crate owns the connection to the microcontroller that sits between
//! the PC and the cartridge slot. It knows how to frame requests, wait for
//! correctly sized replies and verify them, but nothing about dumping.
//!
//! # Example
//!
//! ```no_run
//! use romclient_serial::FwLink;
//! use std::time::Duration;
//!
//! let mut link = FwLink::open("/dev/ttyACM0", Duration::from_secs(2))?;
//! link.synchronize()?;
//!
//! // First 16 bytes of the cartridge window
//! let data = link.read_block(0x1000, 16)?;
//! println!("{:02X?}", data);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod link;
pub mod transport;

// Re-exports
pub use error::{LinkError, Result};
pub use link::FwLink;
pub use transport::serial::{SerialTransport, BAUD_RATE};
pub use transport::{available_ports, find_firmware_port, Transport};
