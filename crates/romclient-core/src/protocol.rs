//! Firmware packet format
//!
//! Every request sent to the cartridge reader and every reply it sends back
//! is a frame with a fixed 10-byte header followed by an optional payload.
//! All integers are little-endian.
//!
//! ```text
//! +---------+--------+----------------+--------------+---------+----------+
//! | command | status | request_length | reply_length | address | checksum |
//! | 1 byte  | 1 byte |    2 bytes     |   2 bytes    | 2 bytes | 2 bytes  |
//! +---------+--------+----------------+--------------+---------+----------+
//! | payload (0..N bytes)                                                  |
//! +-----------------------------------------------------------------------+
//! ```
//!
//! The checksum is the 16-bit truncated sum of every other byte in the frame,
//! payload included.

use alloc::vec::Vec;
use core::fmt;

use crate::error::{Error, Result};

/// Size of the fixed packet header in bytes (1+1+2+2+2+2 = 10).
pub const HEADER_LENGTH: usize = 10;

/// Offset of the checksum field inside the header.
const CHECKSUM_OFFSET: usize = 8;

/// Firmware command opcodes
///
/// Only [`Command::ReadSingle`], [`Command::ReadBlock`], [`Command::Sync`] and
/// [`Command::Nop`] are understood by current firmware. The rest are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Read from a single memory address
    ReadSingle = b'r',
    /// Write to a single memory address (not implemented by firmware)
    WriteSingle = b'w',
    /// Emulate reading from a single memory address (not implemented by firmware)
    EmulateSingle = b'e',
    /// Read a block of memory
    ReadBlock = b'R',
    /// Write a block of memory (not implemented by firmware)
    WriteBlock = b'W',
    /// Emulate reading from a block of memory (not implemented by firmware)
    EmulateBlock = b'E',
    /// Set the delay between reads in ms (not implemented by firmware)
    SetReadDelay = b'd',
    /// Get the delay between reads in ms (not implemented by firmware)
    GetReadDelay = b'D',
    /// Get firmware/hardware version info (not implemented by firmware)
    GetInfo = b'I',
    /// Resets the firmware command interpreter. A synchronization character,
    /// not a real command.
    Sync = b'S',
    /// No operation
    Nop = b'n',
}

impl Command {
    /// All known commands
    pub const ALL: [Command; 11] = [
        Command::ReadSingle,
        Command::WriteSingle,
        Command::EmulateSingle,
        Command::ReadBlock,
        Command::WriteBlock,
        Command::EmulateBlock,
        Command::SetReadDelay,
        Command::GetReadDelay,
        Command::GetInfo,
        Command::Sync,
        Command::Nop,
    ];

    /// Raw opcode byte
    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// Number of payload bytes the firmware sends back for a transfer of
    /// `length` bytes.
    pub fn reply_length(self, length: u16) -> u16 {
        match self {
            Command::ReadSingle => 1,
            Command::ReadBlock => length,
            _ => 0,
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(op: u8) -> Result<Self> {
        Command::ALL
            .iter()
            .copied()
            .find(|cmd| cmd.opcode() == op)
            .ok_or(Error::UnknownCommand(op))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.opcode() as char)
    }
}

/// A firmware packet
///
/// `reply_length` is derived from the command and the transfer length when a
/// request is built, so the caller always knows how many bytes to wait for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    command: Command,
    status: u8,
    request_length: u16,
    reply_length: u16,
    address: u16,
    payload: Vec<u8>,
}

impl Packet {
    /// Create a payload-less packet for `command`
    pub fn new(command: Command) -> Self {
        Self::request(command, 0, 0)
    }

    /// Create a request transferring `length` bytes starting at `address`
    pub fn request(command: Command, address: u16, length: u16) -> Self {
        Self {
            command,
            status: 0,
            request_length: 0,
            reply_length: command.reply_length(length),
            address,
            payload: Vec::new(),
        }
    }

    /// Build a packet from raw header fields, as found on the wire
    pub fn from_fields(
        command: Command,
        status: u8,
        request_length: u16,
        reply_length: u16,
        address: u16,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            command,
            status,
            request_length,
            reply_length,
            address,
            payload,
        }
    }

    /// Attach a payload, setting `request_length` to its size
    pub fn with_payload(mut self, payload: Vec<u8>) -> Result<Self> {
        let len =
            u16::try_from(payload.len()).map_err(|_| Error::PayloadTooLarge(payload.len()))?;
        self.request_length = len;
        self.payload = payload;
        Ok(self)
    }

    /// Command opcode
    pub fn command(&self) -> Command {
        self.command
    }

    /// Status byte reported by the firmware
    pub fn status(&self) -> u8 {
        self.status
    }

    /// Number of payload bytes carried by a request
    pub fn request_length(&self) -> u16 {
        self.request_length
    }

    /// Number of payload bytes expected in the reply
    pub fn reply_length(&self) -> u16 {
        self.reply_length
    }

    /// Cartridge address
    pub fn address(&self) -> u16 {
        self.address
    }

    /// Packet payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the packet, returning its payload
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Total size of the reply frame, header included
    pub fn reply_frame_length(&self) -> usize {
        HEADER_LENGTH + self.reply_length as usize
    }

    /// Advance the address past the block this request reads
    pub fn address_next_block(&mut self) {
        self.address = self.address.wrapping_add(self.reply_length);
    }

    /// Checksum this packet carries once encoded
    pub fn checksum(&self) -> u16 {
        sum(&self.header()[..CHECKSUM_OFFSET]).wrapping_add(sum(&self.payload))
    }

    /// Header with the checksum field left at zero
    fn header(&self) -> [u8; HEADER_LENGTH] {
        let mut header = [0u8; HEADER_LENGTH];
        header[0] = self.command.opcode();
        header[1] = self.status;
        header[2..4].copy_from_slice(&self.request_length.to_le_bytes());
        header[4..6].copy_from_slice(&self.reply_length.to_le_bytes());
        header[6..8].copy_from_slice(&self.address.to_le_bytes());
        header
    }

    /// Encode the packet into a frame
    ///
    /// The frame is emitted once with a zero checksum, summed, and the real
    /// checksum is then written into the header.
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(HEADER_LENGTH + self.payload.len());
        frame.extend_from_slice(&self.header());
        frame.extend_from_slice(&self.payload);

        let checksum = sum(&frame);
        frame[CHECKSUM_OFFSET..HEADER_LENGTH].copy_from_slice(&checksum.to_le_bytes());
        frame
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cmd {} status {} request {} reply {} address 0x{:04X}",
            self.command, self.status, self.request_length, self.reply_length, self.address
        )
    }
}

/// Decode a frame received from the firmware
///
/// Everything after the 10-byte header is taken as payload.
pub fn decode(frame: &[u8]) -> Result<Packet> {
    if frame.len() < HEADER_LENGTH {
        return Err(Error::TooShort { len: frame.len() });
    }

    let (header, payload) = frame.split_at(HEADER_LENGTH);
    let computed = sum(&header[..CHECKSUM_OFFSET]).wrapping_add(sum(payload));
    let expected = read_u16(header, CHECKSUM_OFFSET);

    if computed != expected {
        log::trace!(
            "packet: checksum mismatch (header 0x{:04X}, computed 0x{:04X})",
            expected,
            computed
        );
        return Err(Error::ChecksumMismatch { expected, computed });
    }

    Ok(Packet::from_fields(
        Command::try_from(header[0])?,
        header[1],
        read_u16(header, 2),
        read_u16(header, 4),
        read_u16(header, 6),
        payload.to_vec(),
    ))
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

/// 16-bit truncated byte sum
fn sum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_reply_length_rule() {
        assert_eq!(Packet::request(Command::ReadSingle, 0x1FF8, 0).reply_length(), 1);
        assert_eq!(Packet::request(Command::ReadBlock, 0x1000, 256).reply_length(), 256);
        assert_eq!(Packet::request(Command::GetInfo, 0, 16).reply_length(), 0);
        assert_eq!(Packet::new(Command::Nop).reply_length(), 0);
    }

    #[test]
    fn test_encode_layout() {
        let frame = Packet::request(Command::ReadBlock, 0x1234, 0x0100).encode();
        assert_eq!(
            frame,
            [b'R', 0x00, 0x00, 0x00, 0x00, 0x01, 0x34, 0x12, 0x99, 0x00]
        );
    }

    #[test]
    fn test_checksum_covers_payload() {
        let packet = Packet::new(Command::WriteBlock)
            .with_payload(vec![0xFF; 300])
            .unwrap();
        let frame = packet.encode();
        assert_eq!(frame.len(), HEADER_LENGTH + 300);
        assert_eq!(read_u16(&frame, 2), 300);

        let expected = frame
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 8 && *i != 9)
            .fold(0u16, |acc, (_, &b)| acc.wrapping_add(b as u16));
        assert_eq!(read_u16(&frame, 8), expected);
        assert_eq!(packet.checksum(), expected);
    }

    #[test]
    fn test_roundtrip_all_commands() {
        for (i, cmd) in Command::ALL.iter().enumerate() {
            let payload: Vec<u8> = (0..i * 37).map(|b| (b as u8).wrapping_mul(91)).collect();
            let packet = Packet::from_fields(
                *cmd,
                i as u8,
                payload.len() as u16,
                0xBEEF,
                0x1000 + i as u16,
                payload,
            );
            assert_eq!(decode(&packet.encode()).unwrap(), packet);
        }
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(decode(&[]), Err(Error::TooShort { len: 0 }));
        assert_eq!(decode(&[b'R'; 9]), Err(Error::TooShort { len: 9 }));
    }

    #[test]
    fn test_decode_detects_tampering() {
        let packet = Packet::from_fields(
            Command::ReadBlock,
            0,
            0,
            4,
            0x1000,
            vec![0x10, 0x20, 0x30, 0x40],
        );
        let frame = packet.encode();

        for idx in 0..frame.len() {
            let mut tampered = frame.clone();
            tampered[idx] ^= 0x01;
            assert!(
                matches!(decode(&tampered), Err(Error::ChecksumMismatch { .. })),
                "flip at byte {} not detected",
                idx
            );
        }
    }

    #[test]
    fn test_decode_unknown_command() {
        let mut frame = Packet::new(Command::Nop).encode();
        frame[0] = 0x01;
        // Fix up checksum so only the opcode is wrong
        let checksum = sum(&frame[..8]);
        frame[8..10].copy_from_slice(&checksum.to_le_bytes());
        assert_eq!(decode(&frame), Err(Error::UnknownCommand(0x01)));
    }

    #[test]
    fn test_address_next_block() {
        let mut packet = Packet::request(Command::ReadBlock, 0x1000, 256);
        packet.address_next_block();
        assert_eq!(packet.address(), 0x1100);
    }
}
