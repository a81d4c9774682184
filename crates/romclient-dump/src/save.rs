//! Persisting finished dumps

use std::fs;
use std::path::Path;

use romclient_core::rom::Rom;

use crate::error::Result;

/// Default file name for dumps, in the format emulators expect
pub const DEFAULT_OUTPUT: &str = ".tmp.a26";

/// Write a complete ROM image to `path` as a raw `.a26` file
///
/// Fails without touching the file if the image is not valid.
pub fn save_dump(path: &Path, rom: &Rom) -> Result<()> {
    let data = rom.as_bytes()?;
    fs::write(path, data)?;
    log::debug!("romdump: Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DumpError;

    #[test]
    fn test_save_valid_rom() {
        let mut rom = Rom::new();
        rom.write(0, &[0xA9, 0x00]).unwrap();
        rom.set_valid(true);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("valid.a26");
        save_dump(&path, &rom).unwrap();
        let data = fs::read(&path).unwrap();

        assert_eq!(data.len(), 4096);
        assert_eq!(&data[..2], &[0xA9, 0x00]);
    }

    #[test]
    fn test_refuse_invalid_rom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.a26");
        let err = save_dump(&path, &Rom::new()).unwrap_err();
        assert!(matches!(err, DumpError::Rom(romclient_core::Error::InvalidRom)));
        assert!(!path.exists());
    }
}
