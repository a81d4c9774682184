//! Transport layer abstraction for firmware communication
//!
//! The firmware link only needs a byte pipe with a bounded read. Real
//! hardware uses [`serial::SerialTransport`]; tests plug in a simulated
//! firmware instead.

use crate::error::Result;

/// Transport trait for reading and writing bytes
pub trait Transport {
    /// Write all bytes and flush them out
    ///
    /// Fails with [`crate::LinkError::WriteTimeout`] if the output buffer does
    /// not drain in time.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes
    ///
    /// Blocks until the buffer is full or the read timeout expires and
    /// returns the number of bytes read. A timeout is not an error: it shows
    /// up as a short (possibly zero) count.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Discard anything buffered in either direction
    fn clear(&mut self) -> Result<()>;
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use crate::error::LinkError;
    use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{Read, Write};
    use std::time::{Duration, Instant};

    /// Baud rate of the firmware link
    ///
    /// USB-CDC ports ignore it, but it has to be valid for the driver.
    pub const BAUD_RATE: u32 = 921_600;

    /// Serial port transport
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
        timeout: Duration,
    }

    impl SerialTransport {
        /// Open a serial port with the given read timeout
        ///
        /// Pending input and output are discarded.
        pub fn open(device: &str, timeout: Duration) -> Result<Self> {
            let port = serialport::new(device, BAUD_RATE)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(timeout)
                .open()
                .map_err(|source| LinkError::OpenFailed {
                    port: device.to_string(),
                    source,
                })?;

            let mut transport = Self { port, timeout };
            transport.clear()?;

            log::info!("Opened serial port {} at {} baud", device, BAUD_RATE);

            Ok(transport)
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            self.port.flush()?;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let deadline = Instant::now() + self.timeout;
            let mut filled = 0;

            while filled < buf.len() {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                self.port.set_timeout(remaining)?;

                match self.port.read(&mut buf[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.port.set_timeout(self.timeout)?;
                        return Err(LinkError::Io(e.to_string()));
                    }
                }
            }

            // Restore timeout
            self.port.set_timeout(self.timeout)?;
            Ok(filled)
        }

        fn clear(&mut self) -> Result<()> {
            self.port.clear(ClearBuffer::All)?;
            Ok(())
        }
    }
}

/// Names of the serial ports present on this machine
pub fn available_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Pick the port the firmware most likely sits on
///
/// The reader enumerates as a USB CDC-ACM device, so the first `ttyACM` port
/// wins.
pub fn find_firmware_port() -> Result<Option<String>> {
    let ports = available_ports()?;
    log::debug!("fwlink: Found {} serial ports", ports.len());
    Ok(ports.into_iter().find(|name| name.contains("/dev/ttyACM")))
}
