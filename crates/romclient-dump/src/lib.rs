//! romclient-dump - Polled ROM dump engine
//!
//! This crate ties the firmware link and the ROM image together. The
//! [`RomDump`] state machine walks the read plan of the selected
//! bank-switching scheme one request per [`RomDump::step`] and reports
//! progress through a [`DumpEvents`] handler.
//!
//! # Example
//!
//! ```no_run
//! use romclient_core::BankSwitch;
//! use romclient_dump::{DumpTimeout, Poll, RomDump};
//! use romclient_serial::FwLink;
//! use std::time::Duration;
//!
//! let link = FwLink::open("/dev/ttyACM0", Duration::from_secs(2))?;
//! let mut dump = RomDump::new(link);
//! dump.set_bankswitch(BankSwitch::F8)?;
//! dump.set_timeout(DumpTimeout::Deadline(Duration::from_secs(30)))?;
//!
//! dump.step(); // leave INIT
//! dump.request_dump()?;
//! loop {
//!     match dump.step() {
//!         Poll::Finished => break,
//!         Poll::Aborted => return Err("dump failed".into()),
//!         _ => {}
//!     }
//! }
//! println!("{} bytes", dump.last_rom().map_or(0, |rom| rom.len()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod engine;
mod error;
mod events;
mod save;

pub use engine::{
    DumpTimeout, Poll, RomDump, State, DEFAULT_DUMP_TIMEOUT, DEFAULT_TIMEOUT_TICKS,
};
pub use error::{DumpError, Result};
pub use events::{DumpEvents, LogEvents};
pub use save::{save_dump, DEFAULT_OUTPUT};

use romclient_core::BankSwitch;
use romclient_serial::{FwLink, Transport};

/// Dump a cartridge in one blocking call
///
/// Runs the state machine to completion and returns the image contents.
pub fn dump_rom<T: Transport>(
    link: FwLink<T>,
    bankswitch: BankSwitch,
    timeout: DumpTimeout,
) -> Result<Vec<u8>> {
    let mut dump = RomDump::new(link);
    dump.set_bankswitch(bankswitch)?;
    dump.set_timeout(timeout)?;

    dump.step();
    dump.request_dump()?;
    dump.finish()
}
