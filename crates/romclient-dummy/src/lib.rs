//! romclient-dummy - Simulated cartridge reader firmware
//!
//! This crate provides a [`Transport`] that behaves like the firmware with a
//! cartridge plugged in. It decodes request frames written to it and queues
//! reply frames to be read back, which makes it possible to test the dump
//! engine without hardware.
//!
//! 8K cartridges use F8 bank switching: single-byte reads of `0x1FF8` and
//! `0x1FF9` select bank 0 and bank 1. Block reads never switch banks.

use std::collections::VecDeque;

use romclient_core::bankswitch::BANK_SIZE;
use romclient_core::protocol::{self, Command, Packet, HEADER_LENGTH};
use romclient_serial::{Result, Transport};

/// How the simulated firmware answers requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyMode {
    /// Well-formed replies
    #[default]
    Normal,
    /// Never answer
    Silent,
    /// Drop the last byte of every reply
    Truncated,
    /// Damage one payload byte so the checksum no longer matches
    Corrupt,
}

/// Simulated firmware with a cartridge attached
#[derive(Debug, Clone)]
pub struct DummyFirmware {
    cartridge: Vec<u8>,
    bank: usize,
    mode: ReplyMode,
    rx: Vec<u8>,
    tx: VecDeque<u8>,
    requests: Vec<Packet>,
    syncs: usize,
}

impl DummyFirmware {
    /// Create a firmware serving `cartridge`
    ///
    /// # Panics
    ///
    /// Panics if `cartridge` is empty.
    pub fn new(cartridge: Vec<u8>) -> Self {
        assert!(!cartridge.is_empty(), "dummy: cartridge must not be empty");
        Self {
            cartridge,
            bank: 0,
            mode: ReplyMode::Normal,
            rx: Vec::new(),
            tx: VecDeque::new(),
            requests: Vec::new(),
            syncs: 0,
        }
    }

    /// Create a firmware serving a cartridge of `size` bytes all set to `value`
    pub fn filled(value: u8, size: usize) -> Self {
        Self::new(vec![value; size])
    }

    /// Create a firmware that never replies
    pub fn silent() -> Self {
        Self::filled(0xFF, BANK_SIZE).with_mode(ReplyMode::Silent)
    }

    /// Change how replies are produced
    pub fn with_mode(mut self, mode: ReplyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Every request decoded so far, in arrival order
    pub fn requests(&self) -> &[Packet] {
        &self.requests
    }

    /// Number of sync characters received
    pub fn syncs(&self) -> usize {
        self.syncs
    }

    /// Currently selected bank
    pub fn bank(&self) -> usize {
        self.bank
    }

    fn is_f8(&self) -> bool {
        self.cartridge.len() == 2 * BANK_SIZE
    }

    fn read_cartridge(&self, address: u16) -> u8 {
        let offset = self.bank * BANK_SIZE + (address as usize & (BANK_SIZE - 1));
        self.cartridge[offset % self.cartridge.len()]
    }

    fn touch_hotspot(&mut self, address: u16) {
        if !self.is_f8() {
            return;
        }
        match address {
            0x1FF8 => self.bank = 0,
            0x1FF9 => self.bank = 1,
            _ => {}
        }
    }

    /// Consume complete request frames from the receive buffer
    fn process(&mut self) {
        loop {
            // Sync characters and NUL reset the interpreter between frames
            let skip = self
                .rx
                .iter()
                .take_while(|&&b| b == Command::Sync.opcode() || b == 0)
                .count();
            self.syncs += self.rx[..skip]
                .iter()
                .filter(|&&b| b == Command::Sync.opcode())
                .count();
            self.rx.drain(..skip);

            if self.rx.len() < HEADER_LENGTH {
                return;
            }

            let payload_len = u16::from_le_bytes([self.rx[2], self.rx[3]]) as usize;
            let frame_len = HEADER_LENGTH + payload_len;
            if self.rx.len() < frame_len {
                return;
            }

            let frame: Vec<u8> = self.rx.drain(..frame_len).collect();
            match protocol::decode(&frame) {
                Ok(request) => self.handle(request),
                Err(e) => {
                    log::warn!("dummy: Dropping bad request frame: {}", e);
                    self.rx.clear();
                }
            }
        }
    }

    fn handle(&mut self, request: Packet) {
        let address = request.address();
        let payload = match request.command() {
            Command::ReadSingle => {
                let byte = self.read_cartridge(address);
                self.touch_hotspot(address);
                vec![byte]
            }
            Command::ReadBlock => (0..request.reply_length())
                .map(|i| self.read_cartridge(address.wrapping_add(i)))
                .collect(),
            _ => Vec::new(),
        };

        let reply = Packet::from_fields(
            request.command(),
            0,
            0,
            payload.len() as u16,
            address,
            payload,
        );
        self.requests.push(request);
        self.queue_reply(reply.encode());
    }

    fn queue_reply(&mut self, mut frame: Vec<u8>) {
        match self.mode {
            ReplyMode::Normal => {}
            ReplyMode::Silent => return,
            ReplyMode::Truncated => {
                frame.pop();
            }
            ReplyMode::Corrupt => {
                if let Some(last) = frame.last_mut() {
                    *last ^= 0x5A;
                }
            }
        }
        self.tx.extend(frame);
    }
}

impl Transport for DummyFirmware {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.rx.extend_from_slice(data);
        self.process();
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.tx.len());
        for (dst, src) in buf.iter_mut().zip(self.tx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn clear(&mut self) -> Result<()> {
        self.rx.clear();
        self.tx.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use romclient_serial::{FwLink, LinkError};

    fn f8_cartridge() -> Vec<u8> {
        let mut cart = vec![0xB0; 2 * BANK_SIZE];
        cart[..BANK_SIZE].fill(0xA0);
        cart
    }

    #[test]
    fn test_read_block() {
        let mut link = FwLink::new(DummyFirmware::filled(0xFF, 4096));
        let data = link.read_block(0x1000, 256).unwrap();
        assert_eq!(data, vec![0xFF; 256]);
    }

    #[test]
    fn test_sync_is_skipped() {
        let mut link = FwLink::new(DummyFirmware::filled(0xEA, 4096));
        link.synchronize().unwrap();
        assert_eq!(link.read_single(0x1000).unwrap(), 0xEA);
        assert_eq!(link.transport().unwrap().syncs(), 13);
        assert_eq!(link.transport().unwrap().requests().len(), 1);
    }

    #[test]
    fn test_f8_hotspots() {
        let mut link = FwLink::new(DummyFirmware::new(f8_cartridge()));
        link.read_single(0x1FF9).unwrap();
        assert_eq!(link.transport().unwrap().bank(), 1);
        assert_eq!(link.read_block(0x1000, 4).unwrap(), vec![0xB0; 4]);

        link.read_single(0x1FF8).unwrap();
        assert_eq!(link.transport().unwrap().bank(), 0);
        assert_eq!(link.read_block(0x1000, 4).unwrap(), vec![0xA0; 4]);
    }

    #[test]
    #[should_panic(expected = "cartridge must not be empty")]
    fn test_empty_cartridge_is_rejected() {
        DummyFirmware::new(Vec::new());
    }

    #[test]
    fn test_reply_modes() {
        let mut link = FwLink::new(DummyFirmware::silent());
        assert!(matches!(link.read_block(0x1000, 16), Err(LinkError::NoReply)));

        let fw = DummyFirmware::filled(0, 4096).with_mode(ReplyMode::Truncated);
        let mut link = FwLink::new(fw);
        assert!(matches!(
            link.read_block(0x1000, 16),
            Err(LinkError::IncompleteReply { .. })
        ));

        let fw = DummyFirmware::filled(0, 4096).with_mode(ReplyMode::Corrupt);
        let mut link = FwLink::new(fw);
        assert!(matches!(
            link.read_block(0x1000, 16),
            Err(LinkError::Packet(_))
        ));
    }
}
