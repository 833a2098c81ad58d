use thiserror::Error;

/// Errors that can occur while creating or inspecting flash images.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to write CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("ftl error: {0}")]
    FtlError(#[from] smart_ftl::error::Error),

    #[error("invalid image size {0}: must be a non zero multiple of 4096 bytes")]
    InvalidImageSize(usize),

    #[error("image is not formatted with the given options")]
    NotFormatted,

    #[error("logical sector {0} is not allocated")]
    UnmappedSector(u16),
}
