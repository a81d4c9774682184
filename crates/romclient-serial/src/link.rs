//! Firmware link
//!
//! [`FwLink`] owns the transport and implements the request/reply exchange
//! on top of the packet codec.

use std::time::Duration;

use romclient_core::protocol::{self, Command, Packet};

use crate::error::{LinkError, Result};
use crate::transport::serial::SerialTransport;
use crate::transport::Transport;

/// Number of sync characters sent to reset the firmware command interpreter
const SYNC_LENGTH: usize = 13;

/// Connection to the cartridge reader firmware
pub struct FwLink<T: Transport> {
    transport: Option<T>,
}

impl FwLink<SerialTransport> {
    /// Open the firmware link on a serial port
    pub fn open(port: &str, timeout: Duration) -> Result<Self> {
        Ok(Self::new(SerialTransport::open(port, timeout)?))
    }
}

impl<T: Transport> FwLink<T> {
    /// Create a link over an already open transport
    pub fn new(transport: T) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    /// Create a link with no transport attached
    pub fn closed() -> Self {
        Self { transport: None }
    }

    /// Whether a transport is attached
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Release the transport. Closing a closed link does nothing.
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            log::debug!("fwlink: Closed");
        }
    }

    /// Borrow the transport
    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }


    fn port(&mut self) -> Result<&mut T> {
        self.transport.as_mut().ok_or(LinkError::NotOpen)
    }

    /// Write raw bytes to the firmware
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port()?.write(data)
    }

    /// Read up to `len` bytes
    ///
    /// May return fewer bytes than requested, or none at all, if the read
    /// timeout expires first.
    pub fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = self.port()?.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Discard anything buffered in either direction
    pub fn clear(&mut self) -> Result<()> {
        self.port()?.clear()
    }

    /// Bring the firmware command interpreter to a known idle state
    ///
    /// This is best effort: the firmware does not acknowledge the sequence.
    pub fn synchronize(&mut self) -> Result<()> {
        let mut seq = [Command::Sync.opcode(); SYNC_LENGTH + 1];
        seq[SYNC_LENGTH] = 0;
        self.write(&seq)?;
        log::debug!("fwlink: Sent sync sequence");
        Ok(())
    }

    /// Send a request without waiting for its reply
    pub fn send(&mut self, request: &Packet) -> Result<()> {
        log::trace!("fwlink: -> {}", request);
        self.write(&request.encode())
    }

    /// Wait for the reply to `request`
    ///
    /// Reads exactly one reply frame. An empty read is reported as
    /// [`LinkError::NoReply`], a short one as [`LinkError::IncompleteReply`].
    /// A reply echoing another command or address is
    /// [`LinkError::UnexpectedReply`].
    pub fn receive(&mut self, request: &Packet) -> Result<Packet> {
        let expected = request.reply_frame_length();
        let frame = self.read(expected)?;

        if frame.is_empty() {
            return Err(LinkError::NoReply);
        }
        if frame.len() < expected {
            return Err(LinkError::IncompleteReply {
                expected,
                received: frame.len(),
            });
        }

        let reply = protocol::decode(&frame)?;
        log::trace!("fwlink: <- {}", reply);

        if reply.command() != request.command() || reply.address() != request.address() {
            return Err(LinkError::UnexpectedReply {
                expected_command: request.command(),
                expected_address: request.address(),
                command: reply.command(),
                address: reply.address(),
            });
        }
        Ok(reply)
    }

    /// Send a request and wait for its reply
    pub fn exchange(&mut self, request: &Packet) -> Result<Packet> {
        self.send(request)?;
        self.receive(request)
    }

    /// Read one byte of cartridge memory
    pub fn read_single(&mut self, address: u16) -> Result<u8> {
        let request = Packet::request(Command::ReadSingle, address, 1);
        let reply = self.exchange(&request)?;
        reply
            .payload()
            .first()
            .copied()
            .ok_or(LinkError::IncompleteReply {
                expected: request.reply_frame_length(),
                received: protocol::HEADER_LENGTH,
            })
    }

    /// Read a block of cartridge memory
    pub fn read_block(&mut self, address: u16, len: u16) -> Result<Vec<u8>> {
        let reply = self.exchange(&Packet::request(Command::ReadBlock, address, len))?;
        Ok(reply.into_payload())
    }
}

impl<T: Transport> Drop for FwLink<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Transport replaying canned reply bytes
    #[derive(Default)]
    struct Scripted {
        written: Vec<u8>,
        replies: VecDeque<u8>,
        fail_writes: bool,
    }

    impl Transport for Scripted {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            if self.fail_writes {
                return Err(LinkError::WriteTimeout);
            }
            self.written.extend_from_slice(data);
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let n = buf.len().min(self.replies.len());
            for b in buf.iter_mut().take(n) {
                *b = self.replies.pop_front().unwrap();
            }
            Ok(n)
        }

        fn clear(&mut self) -> Result<()> {
            self.replies.clear();
            Ok(())
        }
    }

    fn link_with_reply(reply: &[u8]) -> FwLink<Scripted> {
        FwLink::new(Scripted {
            replies: reply.iter().copied().collect(),
            ..Default::default()
        })
    }

    fn block_reply(address: u16, data: Vec<u8>) -> Vec<u8> {
        Packet::from_fields(Command::ReadBlock, 0, 0, data.len() as u16, address, data).encode()
    }

    #[test]
    fn test_synchronize_sequence() {
        let mut link = link_with_reply(&[]);
        link.synchronize().unwrap();
        let written = &link.transport().unwrap().written;
        assert_eq!(written.len(), 14);
        assert!(written[..13].iter().all(|&b| b == b'S'));
        assert_eq!(written[13], 0);
    }

    #[test]
    fn test_exchange_block() {
        let mut link = link_with_reply(&block_reply(0x1000, vec![0xFF; 256]));
        let request = Packet::request(Command::ReadBlock, 0x1000, 256);
        let reply = link.exchange(&request).unwrap();
        assert_eq!(reply.payload(), &[0xFF; 256][..]);
        assert_eq!(link.transport().unwrap().written, request.encode());
    }

    #[test]
    fn test_read_single() {
        let reply = Packet::from_fields(Command::ReadSingle, 0, 0, 1, 0x1FF8, vec![0x42]);
        let mut link = link_with_reply(&reply.encode());
        assert_eq!(link.read_single(0x1FF8).unwrap(), 0x42);
    }

    #[test]
    fn test_no_reply() {
        let mut link = link_with_reply(&[]);
        let err = link.read_block(0x1000, 256).unwrap_err();
        assert!(matches!(err, LinkError::NoReply));
        assert!(err.is_protocol());
    }

    #[test]
    fn test_incomplete_reply() {
        let frame = block_reply(0x1000, vec![0xFF; 256]);
        let mut link = link_with_reply(&frame[..100]);
        assert!(matches!(
            link.read_block(0x1000, 256),
            Err(LinkError::IncompleteReply {
                expected: 266,
                received: 100
            })
        ));
    }

    #[test]
    fn test_checksum_failure_is_an_error() {
        let mut frame = block_reply(0x1000, vec![0xFF; 16]);
        frame[12] = 0x00;
        let mut link = link_with_reply(&frame);
        let err = link.read_block(0x1000, 16).unwrap_err();
        assert!(matches!(
            err,
            LinkError::Packet(romclient_core::Error::ChecksumMismatch { .. })
        ));
        assert!(err.is_protocol());
    }

    #[test]
    fn test_reply_for_other_address_is_rejected() {
        let mut link = link_with_reply(&block_reply(0x1100, vec![0x01; 16]));
        let err = link.read_block(0x1000, 16).unwrap_err();
        assert!(matches!(
            err,
            LinkError::UnexpectedReply {
                expected_address: 0x1000,
                address: 0x1100,
                ..
            }
        ));
        assert!(err.is_protocol());
    }

    #[test]
    fn test_clear_drops_stale_reply() {
        let mut link = link_with_reply(&block_reply(0x1000, vec![0x01; 16]));
        link.clear().unwrap();
        assert!(matches!(link.read_block(0x1000, 16), Err(LinkError::NoReply)));
    }

    #[test]
    fn test_write_failure_is_transport_error() {
        let mut link = FwLink::new(Scripted {
            fail_writes: true,
            ..Default::default()
        });
        let err = link.synchronize().unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut link = link_with_reply(&[]);
        assert!(link.is_open());
        link.close();
        link.close();
        assert!(!link.is_open());
        assert!(matches!(link.write(&[0]), Err(LinkError::NotOpen)));
        assert!(matches!(link.read(4), Err(LinkError::NotOpen)));
    }
}
