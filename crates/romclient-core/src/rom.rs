//! ROM image storage

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Error, Result};

/// ROM start address in the 6507 address space
pub const ROM_START: u16 = 0x1000;

/// Size of a plain 4 KiB cartridge
pub const DEFAULT_ROM_SIZE: usize = 4096;

/// A cartridge image being assembled from firmware reads
///
/// The image is only readable once its owner has marked it valid. Any write
/// drops validity again, so partially dumped data can never be mistaken for
/// a complete image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rom {
    data: Vec<u8>,
    valid: bool,
}

impl Rom {
    /// Create an empty 4 KiB image
    pub fn new() -> Self {
        Self {
            data: vec![0; DEFAULT_ROM_SIZE],
            valid: false,
        }
    }

    /// Resize the image
    ///
    /// Clears the contents and marks the image invalid. `size` must be a
    /// power of two.
    pub fn set_size(&mut self, size: usize) -> Result<()> {
        if !size.is_power_of_two() {
            return Err(Error::NotPowerOfTwo(size));
        }

        self.data = vec![0; size];
        self.valid = false;
        Ok(())
    }

    /// Image size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Copy `data` into the image at `offset`
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len())
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::OutOfBounds {
                offset,
                len: data.len(),
                size: self.data.len(),
            })?;

        self.data[offset..end].copy_from_slice(data);
        self.valid = false;
        Ok(())
    }

    /// Assert or withdraw completeness of the image
    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    /// Whether the image has been marked complete
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Image contents, available only while the image is valid
    pub fn as_bytes(&self) -> Result<&[u8]> {
        if !self.valid {
            return Err(Error::InvalidRom);
        }
        Ok(&self.data)
    }

    /// Owned copy of the image contents
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        self.as_bytes().map(|data| data.to_vec())
    }
}

impl Default for Rom {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_size_power_of_two() {
        let mut rom = Rom::new();
        assert_eq!(rom.set_size(100), Err(Error::NotPowerOfTwo(100)));
        assert_eq!(rom.set_size(0), Err(Error::NotPowerOfTwo(0)));
        assert_eq!(rom.size(), DEFAULT_ROM_SIZE);

        rom.set_size(4096).unwrap();
        assert!(!rom.is_valid());
        assert_eq!(rom.size(), 4096);
    }

    #[test]
    fn test_set_size_clears() {
        let mut rom = Rom::new();
        rom.write(0, &[0xAA; 16]).unwrap();
        rom.set_valid(true);

        rom.set_size(8192).unwrap();
        assert!(!rom.is_valid());
        rom.set_valid(true);
        assert!(rom.as_bytes().unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_bounds() {
        let mut rom = Rom::new();
        assert!(matches!(
            rom.write(4090, &[0u8; 10]),
            Err(Error::OutOfBounds { offset: 4090, len: 10, size: 4096 })
        ));
        assert!(rom.write(usize::MAX, &[0u8; 2]).is_err());
        rom.write(4086, &[0u8; 10]).unwrap();
    }

    #[test]
    fn test_write_is_local_and_invalidates() {
        let mut rom = Rom::new();
        rom.write(0x100, &[1, 2, 3]).unwrap();
        rom.set_valid(true);
        rom.write(0x200, &[4]).unwrap();
        assert!(!rom.is_valid());

        rom.set_valid(true);
        let data = rom.as_bytes().unwrap();
        assert_eq!(&data[0x0FF..0x104], &[0, 1, 2, 3, 0]);
        assert_eq!(data[0x200], 4);
    }

    #[test]
    fn test_invalid_rom_is_unreadable() {
        let rom = Rom::new();
        assert_eq!(rom.as_bytes(), Err(Error::InvalidRom));
        assert_eq!(rom.snapshot(), Err(Error::InvalidRom));
    }
}
