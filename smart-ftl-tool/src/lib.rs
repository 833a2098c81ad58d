//! Host side companion of `smart-ftl`: creates flash images, stores sectors in them and
//! inspects the sector map of existing images.

pub mod error;
mod image;

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

pub use error::Error;
pub use image::{
    ImageFlash,
    IMAGE_ERASE_SIZE,
};
use serde::Serialize;
use smart_ftl::config::{
    Config,
    CrcMode,
};
use smart_ftl::{
    FormatInfo,
    Ftl,
    Statistics,
};

/// Bytes per line of [`hex_dump`].
const DUMP_LINE: usize = 16;

/// The options an image was formatted with. The format sector only records the CRC mode and the
/// journal size, so the same options have to be passed again to mount the image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub sector_size: u16,
    pub crc: CrcMode,
    pub journal_blocks: u16,
    pub wear_leveling: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        let config = Config::default();
        Self {
            sector_size: config.sector_size,
            crc: config.crc,
            journal_blocks: config.journal_blocks,
            wear_leveling: config.wear_leveling,
        }
    }
}

impl ImageOptions {
    pub fn config(&self) -> Config {
        Config {
            sector_size: self.sector_size,
            crc: self.crc,
            journal_blocks: self.journal_blocks,
            wear_leveling: self.wear_leveling,
            ..Default::default()
        }
    }
}

/// One row of the sector map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapEntry {
    pub logical: u16,
    pub physical: u16,
    pub block: u16,
}

/// A mounted image.
pub struct Image {
    ftl: Ftl<ImageFlash>,
    sectors_per_block: u16,
}

impl Image {
    /// Creates an erased image of `size` bytes and formats it.
    pub fn format(size: usize, options: &ImageOptions, root_dirs: u8) -> Result<Self, Error> {
        let flash = ImageFlash::erased(size)?;
        let mut ftl = Ftl::new(0, size, options.config(), flash)?;
        ftl.low_level_format(root_dirs)?;
        Ok(Self::wrap(ftl, options))
    }

    /// Mounts an existing image, which has to be formatted with `options`.
    pub fn open(flash: ImageFlash, options: &ImageOptions) -> Result<Self, Error> {
        let ftl = Ftl::new(0, flash.len(), options.config(), flash)?;
        if !ftl.is_formatted() {
            return Err(Error::NotFormatted);
        }
        Ok(Self::wrap(ftl, options))
    }

    pub fn load<P: AsRef<Path>>(path: P, options: &ImageOptions) -> Result<Self, Error> {
        Self::open(ImageFlash::load(path)?, options)
    }

    fn wrap(ftl: Ftl<ImageFlash>, options: &ImageOptions) -> Self {
        Self {
            ftl,
            sectors_per_block: (IMAGE_ERASE_SIZE / options.sector_size as usize) as u16,
        }
    }

    /// Writes pending allocations and hands back the image.
    pub fn into_flash(mut self) -> Result<ImageFlash, Error> {
        self.ftl.sync()?;
        Ok(self.ftl.release_hal())
    }

    pub fn save<P: AsRef<Path>>(self, path: P) -> Result<(), Error> {
        self.into_flash()?.save(path)
    }

    pub fn info(&self) -> Result<FormatInfo, Error> {
        Ok(self.ftl.format_info()?)
    }

    pub fn statistics(&self) -> Result<Statistics, Error> {
        Ok(self.ftl.statistics()?)
    }

    /// Every allocated logical sector, the format sector included.
    pub fn sector_map(&mut self) -> Result<Vec<MapEntry>, Error> {
        let total = self.info()?.total_sectors;
        let mut entries = Vec::new();
        for logical in 0..total {
            if let Some(physical) = self.ftl.map_query(logical)? {
                entries.push(MapEntry {
                    logical,
                    physical,
                    block: physical / self.sectors_per_block,
                });
            }
        }
        Ok(entries)
    }

    /// The complete payload of an allocated sector.
    pub fn read_payload(&mut self, logical: u16) -> Result<Vec<u8>, Error> {
        if self.ftl.map_query(logical)?.is_none() {
            return Err(Error::UnmappedSector(logical));
        }
        let mut payload = vec![0u8; self.info()?.available_bytes as usize];
        let len = self.ftl.read_sector(logical, 0, &mut payload)?;
        payload.truncate(len);
        Ok(payload)
    }

    /// Allocates a sector, preferably `logical`, and stores `data` at the start of its payload.
    pub fn store(&mut self, logical: Option<u16>, data: &[u8]) -> Result<u16, Error> {
        let logical = self.ftl.alloc_sector(logical)?;
        self.ftl.write_sector(logical, 0, data)?;
        Ok(logical)
    }
}

/// Writes the sector map as CSV with a header row.
pub fn write_map_csv<W: Write>(entries: &[MapEntry], writer: W) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for entry in entries {
        wtr.serialize(entry)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Offset followed by the hex encoded bytes, 16 bytes per line.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (index, line) in bytes.chunks(DUMP_LINE).enumerate() {
        let _ = writeln!(out, "{:06x}  {}", index * DUMP_LINE, hex::encode(line));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_lines() {
        let bytes: Vec<u8> = (0..20).collect();
        assert_eq!(
            hex_dump(&bytes),
            "000000  000102030405060708090a0b0c0d0e0f\n000010  10111213\n"
        );
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn options_map_to_config() {
        let options = ImageOptions {
            sector_size: 1024,
            crc: CrcMode::Crc16,
            journal_blocks: 2,
            wear_leveling: false,
        };
        let config = options.config();
        assert_eq!(config.sector_size, 1024);
        assert_eq!(config.crc, CrcMode::Crc16);
        assert_eq!(config.journal_blocks, 2);
        assert!(!config.wear_leveling);
        assert_eq!(ImageOptions::default().config(), Config::default());
    }
}
