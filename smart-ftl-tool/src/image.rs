use std::fs;
use std::path::Path;

use embedded_storage::nor_flash::{
    check_erase,
    check_read,
    check_write,
    ErrorType,
    NorFlash,
    NorFlashErrorKind,
    ReadNorFlash,
};

use crate::error::Error;

/// Erase block size of the images created by this tool.
pub const IMAGE_ERASE_SIZE: usize = 4096;

/// A flash image held in memory, behaving like NOR flash: writes can only clear bits and an
/// erase sets a whole block back to `0xFF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFlash {
    buf: Vec<u8>,
}

impl ImageFlash {
    /// An erased image of `size` bytes, which has to be a multiple of [`IMAGE_ERASE_SIZE`].
    pub fn erased(size: usize) -> Result<Self, Error> {
        Self::from_bytes(vec![0xFF; size])
    }

    pub fn from_bytes(buf: Vec<u8>) -> Result<Self, Error> {
        if buf.is_empty() || buf.len() % IMAGE_ERASE_SIZE != 0 {
            return Err(Error::InvalidImageSize(buf.len()));
        }
        Ok(Self { buf })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_bytes(fs::read(path)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        fs::write(path, &self.buf)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl ErrorType for ImageFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for ImageFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(self, offset, bytes.len())?;
        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for ImageFlash {
    const WRITE_SIZE: usize = 1;

    const ERASE_SIZE: usize = IMAGE_ERASE_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(self, from, to)?;
        self.buf[from as usize..to as usize].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(self, offset, bytes.len())?;
        let offset = offset as usize;
        for (cell, byte) in self.buf[offset..offset + bytes.len()].iter_mut().zip(bytes) {
            *cell &= byte;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_only_clear_bits() {
        let mut flash = ImageFlash::erased(2 * IMAGE_ERASE_SIZE).unwrap();
        flash.write(10, &[0x0F]).unwrap();
        flash.write(10, &[0xF1]).unwrap();
        let mut byte = [0u8];
        flash.read(10, &mut byte).unwrap();
        assert_eq!(byte, [0x01]);

        flash.erase(0, IMAGE_ERASE_SIZE as u32).unwrap();
        flash.read(10, &mut byte).unwrap();
        assert_eq!(byte, [0xFF]);
    }

    #[test]
    fn rejects_out_of_bounds_access() {
        let mut flash = ImageFlash::erased(IMAGE_ERASE_SIZE).unwrap();
        assert_eq!(
            flash.write(IMAGE_ERASE_SIZE as u32, &[0]),
            Err(NorFlashErrorKind::OutOfBounds)
        );
        assert_eq!(flash.erase(0, 100), Err(NorFlashErrorKind::NotAligned));
    }

    #[test]
    fn image_size_is_checked() {
        assert!(matches!(
            ImageFlash::erased(1000),
            Err(Error::InvalidImageSize(1000))
        ));
        assert!(matches!(
            ImageFlash::from_bytes(Vec::new()),
            Err(Error::InvalidImageSize(0))
        ));
    }
}
