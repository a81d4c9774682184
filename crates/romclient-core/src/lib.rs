//! romclient-core - Core library for dumping Atari 2600 cartridges
//!
//! This crate holds everything that does not touch the serial port:
//!
//! - [`protocol`] - the framed request/reply packet format spoken by the
//!   cartridge reader firmware, including checksum verification
//! - [`rom`] - a fixed-size, power-of-two ROM image with a validity flag
//! - [`bankswitch`] - bank-switching schemes and the read plans that dump them
//!
//! It is `no_std` compatible (it needs `alloc`).
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for [`Error`]
//!
//! # Example
//!
//! ```
//! use romclient_core::protocol::{decode, Command, Packet};
//!
//! let request = Packet::request(Command::ReadBlock, 0x1000, 256);
//! let frame = request.encode();
//! assert_eq!(frame.len(), 10);
//! assert_eq!(decode(&frame).unwrap(), request);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod bankswitch;
pub mod error;
pub mod protocol;
pub mod rom;

pub use bankswitch::{BankSwitch, ReadOp, ReadPlan};
pub use error::{Error, Result};
pub use protocol::{Command, Packet};
pub use rom::Rom;
