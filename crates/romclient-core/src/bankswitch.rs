//! Bank-switching schemes
//!
//! Cartridges larger than the 4 KiB window of the 2600 expose their banks one
//! at a time. Reading a hotspot address makes the cartridge hardware switch
//! to another bank. Each scheme therefore comes with a [`ReadPlan`]: the
//! ordered list of hotspot and block reads that dump the whole cartridge.
//!
//! Scheme descriptions thanks to Kevin "Kevtris" Horton.

use alloc::vec::Vec;
use core::fmt;

use crate::error::{Error, Result};
use crate::protocol::{Command, Packet};
use crate::rom::{DEFAULT_ROM_SIZE, ROM_START};

/// Bytes transferred by one block read
pub const BLOCK_SIZE: u16 = 256;

/// Size of the cartridge window in the 6507 address space
pub const BANK_SIZE: usize = 0x1000;

/// Bank-switching scheme of a cartridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BankSwitch {
    /// No bank switching (2K/4K carts)
    #[default]
    None,
    /// FF6/FF7/FF8/FF9 bank switching
    F6,
    /// FF8/FF9 bank switching
    F8,
    /// FF8/FF9/FFA bank switching (aka CBS' RAM Plus)
    Fa,
    /// FE0-FF7 bank switching (aka Parker Bros.)
    E0,
    /// FE0-FE7 bank switching found on M-Network carts
    E7,
    /// 01FE/11FE bank switching (aka Activision Robot Tank)
    Fe,
    /// User defined bank switching
    User,
}

impl BankSwitch {
    /// All schemes, in menu order
    pub const ALL: [BankSwitch; 8] = [
        BankSwitch::None,
        BankSwitch::F6,
        BankSwitch::F8,
        BankSwitch::Fa,
        BankSwitch::E0,
        BankSwitch::E7,
        BankSwitch::Fe,
        BankSwitch::User,
    ];

    /// Short lowercase name, as used on the command line
    pub fn name(self) -> &'static str {
        match self {
            BankSwitch::None => "none",
            BankSwitch::F6 => "f6",
            BankSwitch::F8 => "f8",
            BankSwitch::Fa => "fa",
            BankSwitch::E0 => "e0",
            BankSwitch::E7 => "e7",
            BankSwitch::Fe => "fe",
            BankSwitch::User => "user",
        }
    }

    /// Look up a scheme by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|bs| bs.name().eq_ignore_ascii_case(name))
    }

    /// Human readable description
    pub fn description(self) -> &'static str {
        match self {
            BankSwitch::None => "No bankswitching (4K)",
            BankSwitch::F6 => "FF6/FF7/FF8/FF9 bankswitching (16K)",
            BankSwitch::F8 => "FF8/FF9 bankswitching (8K)",
            BankSwitch::Fa => "FF8/FF9/FFA bankswitching, CBS RAM Plus (12K)",
            BankSwitch::E0 => "FE0-FF7 bankswitching, Parker Bros. (8K)",
            BankSwitch::E7 => "FE0-FE7 bankswitching, M-Network (16K)",
            BankSwitch::Fe => "01FE/11FE bankswitching, Activision (8K)",
            BankSwitch::User => "User defined bankswitching",
        }
    }

    /// Whether a read plan exists for this scheme
    pub fn is_supported(self) -> bool {
        matches!(self, BankSwitch::None | BankSwitch::F8)
    }

    /// Build the read plan that dumps a cartridge using this scheme
    pub fn read_plan(self) -> Result<ReadPlan> {
        match self {
            BankSwitch::None => {
                let mut plan = ReadPlan::new(DEFAULT_ROM_SIZE);
                plan.read_bank(0);
                Ok(plan)
            }
            BankSwitch::F8 => {
                let mut plan = ReadPlan::new(2 * BANK_SIZE);
                plan.hotspot(0x1FF8);
                plan.read_bank(0);
                plan.hotspot(0x1FF9);
                plan.read_bank(1);
                Ok(plan)
            }
            // Hotspot layouts for these still need to be verified on hardware
            other => Err(Error::UnsupportedBankSwitch(other.name())),
        }
    }
}

impl fmt::Display for BankSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One step of a read plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOp {
    /// Read a single byte at a hotspot to switch banks. The data is discarded.
    Hotspot {
        /// Hotspot address
        address: u16,
    },
    /// Read a block and store it in the image
    Block {
        /// Cartridge address of the first byte
        address: u16,
        /// Number of bytes to read
        length: u16,
        /// Image offset the block is written to
        offset: usize,
    },
}

impl ReadOp {
    /// Request packet that performs this step
    pub fn request(&self) -> Packet {
        match *self {
            ReadOp::Hotspot { address } => Packet::request(Command::ReadSingle, address, 1),
            ReadOp::Block {
                address, length, ..
            } => Packet::request(Command::ReadBlock, address, length),
        }
    }

    /// Number of image bytes this step fills
    pub fn image_bytes(&self) -> usize {
        match *self {
            ReadOp::Hotspot { .. } => 0,
            ReadOp::Block { length, .. } => length as usize,
        }
    }
}

/// Ordered list of reads that dump a cartridge, plus the resulting image size
///
/// Steps must be executed strictly in order: hotspot reads change the bank
/// the following block reads see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPlan {
    rom_size: usize,
    ops: Vec<ReadOp>,
}

impl ReadPlan {
    /// Create an empty plan for an image of `rom_size` bytes
    pub fn new(rom_size: usize) -> Self {
        Self {
            rom_size,
            ops: Vec::new(),
        }
    }

    /// Append a hotspot read
    pub fn hotspot(&mut self, address: u16) {
        self.ops.push(ReadOp::Hotspot { address });
    }

    /// Append the block reads covering the 4 KiB window, storing them as
    /// bank `bank` of the image
    pub fn read_bank(&mut self, bank: usize) {
        let blocks = BANK_SIZE / BLOCK_SIZE as usize;
        for i in 0..blocks {
            let window_offset = i * BLOCK_SIZE as usize;
            self.ops.push(ReadOp::Block {
                address: ROM_START + window_offset as u16,
                length: BLOCK_SIZE,
                offset: bank * BANK_SIZE + window_offset,
            });
        }
    }

    /// Size of the image this plan fills
    pub fn rom_size(&self) -> usize {
        self.rom_size
    }

    /// Plan steps in execution order
    pub fn ops(&self) -> &[ReadOp] {
        &self.ops
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the plan has no steps
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_plan() {
        let plan = BankSwitch::None.read_plan().unwrap();
        assert_eq!(plan.rom_size(), 4096);
        assert_eq!(plan.len(), 16);
        for (i, op) in plan.ops().iter().enumerate() {
            assert_eq!(
                *op,
                ReadOp::Block {
                    address: 0x1000 + i as u16 * 256,
                    length: 256,
                    offset: i * 256,
                }
            );
        }
    }

    #[test]
    fn test_f8_plan() {
        let plan = BankSwitch::F8.read_plan().unwrap();
        assert_eq!(plan.rom_size(), 8192);
        assert_eq!(plan.len(), 34);
        assert_eq!(plan.ops()[0], ReadOp::Hotspot { address: 0x1FF8 });
        assert_eq!(plan.ops()[17], ReadOp::Hotspot { address: 0x1FF9 });
        assert_eq!(
            plan.ops()[18],
            ReadOp::Block {
                address: 0x1000,
                length: 256,
                offset: 0x1000,
            }
        );
        assert_eq!(
            plan.ops()[33],
            ReadOp::Block {
                address: 0x1F00,
                length: 256,
                offset: 0x1F00,
            }
        );

        let filled: usize = plan.ops().iter().map(ReadOp::image_bytes).sum();
        assert_eq!(filled, plan.rom_size());
    }

    #[test]
    fn test_unsupported_schemes_fail_fast() {
        for bs in BankSwitch::ALL {
            assert_eq!(bs.is_supported(), bs.read_plan().is_ok());
        }
        assert_eq!(
            BankSwitch::E0.read_plan(),
            Err(Error::UnsupportedBankSwitch("e0"))
        );
    }

    #[test]
    fn test_requests() {
        let hotspot = ReadOp::Hotspot { address: 0x1FF8 }.request();
        assert_eq!(hotspot.command(), Command::ReadSingle);
        assert_eq!(hotspot.reply_length(), 1);

        let block = BankSwitch::None.read_plan().unwrap().ops()[3].request();
        assert_eq!(block.command(), Command::ReadBlock);
        assert_eq!(block.address(), 0x1300);
        assert_eq!(block.reply_length(), 256);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(BankSwitch::from_name("F8"), Some(BankSwitch::F8));
        assert_eq!(BankSwitch::from_name("none"), Some(BankSwitch::None));
        assert_eq!(BankSwitch::from_name("3f"), None);
    }
}
