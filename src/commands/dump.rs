//! Dump command implementation

use indicatif::{ProgressBar, ProgressStyle};
use romclient_core::BankSwitch;
use romclient_dummy::DummyFirmware;
use romclient_dump::{DumpError, DumpEvents, DumpTimeout, Poll, RomDump};
use romclient_serial::{find_firmware_port, FwLink, Transport};
use std::path::Path;
use std::time::Duration;

/// Port name that selects the simulated reader
const DUMMY_PORT: &str = "dummy";

/// Routes engine messages above the progress bar
struct CliEvents {
    progress: ProgressBar,
}

impl DumpEvents for CliEvents {
    fn log(&mut self, message: &str) {
        log::info!("romdump: {}", message);
        self.progress.set_message(message.to_string());
    }

    fn lock(&mut self) {
        log::debug!("romdump: Settings locked");
    }

    fn unlock(&mut self) {
        log::debug!("romdump: Settings unlocked");
    }
}

/// Run the dump command
pub fn run_dump(
    port: Option<&str>,
    output: &Path,
    bankswitch: BankSwitch,
    timeout: Duration,
    dump_timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    match port {
        Some(DUMMY_PORT) => {
            let size = bankswitch.read_plan().map(|p| p.rom_size()).unwrap_or(4096);
            log::info!("Using simulated cartridge reader ({} bytes)", size);
            let link = FwLink::new(DummyFirmware::filled(0xEA, size));
            dump_to_file(link, output, bankswitch, dump_timeout)
        }
        Some(port) => {
            let link = FwLink::open(port, timeout)?;
            dump_to_file(link, output, bankswitch, dump_timeout)
        }
        None => {
            // Auto detect device
            let port = find_firmware_port()?.ok_or("Could not connect to device.")?;
            log::info!("Found cartridge reader on {}", port);
            let link = FwLink::open(&port, timeout)?;
            dump_to_file(link, output, bankswitch, dump_timeout)
        }
    }
}

/// Dump the cartridge with a progress bar and save it to `output`
fn dump_to_file<T: Transport>(
    link: FwLink<T>,
    output: &Path,
    bankswitch: BankSwitch,
    dump_timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?
            .progress_chars("#>-"),
    );

    let events = CliEvents {
        progress: pb.clone(),
    };
    let mut dump = RomDump::with_events(link, events);
    dump.set_bankswitch(bankswitch)?;
    dump.set_timeout(DumpTimeout::Deadline(dump_timeout))?;
    dump.set_output(Some(output.to_path_buf()))?;

    dump.step();
    dump.request_dump()?;

    let mut outcome = Poll::Busy;
    while dump.is_busy() {
        match dump.step() {
            poll @ (Poll::Finished | Poll::Aborted) => outcome = poll,
            _ => {}
        }
        let (received, total) = dump.progress();
        pb.set_length(total as u64);
        pb.set_position(received as u64);
    }

    if outcome != Poll::Finished {
        pb.abandon_with_message("Dump failed");
        return Err(dump.take_failure().unwrap_or(DumpError::Aborted).into());
    }
    pb.finish_with_message("Dump complete");

    match dump.last_artifact_path() {
        Some(path) => {
            let len = dump.last_rom().map_or(0, |rom| rom.len());
            println!("Wrote {} bytes to {:?}", len, path);
            Ok(())
        }
        None => Err(dump
            .take_failure()
            .unwrap_or(DumpError::Aborted)
            .into()),
    }
}
