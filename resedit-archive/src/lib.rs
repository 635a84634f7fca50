//! In-memory view over a ZIP-family byte stream (the container format used
//! by compiled Android application archives): load into a path → entry map,
//! mutate entry contents, and re-emit preserving storage metadata for every
//! entry that was not touched.

mod archive_view;
pub mod data;
pub mod error;
mod glob;

pub use archive_view::{ArchiveEntry, ArchiveView};
pub use error::{ArchiveError, Result};

use crc::{Algorithm, Crc};

/// Minimum version needed to extract archives produced by this crate.
pub const VERSION_NEEDED_TO_EXTRACT: u16 = 0x0002;
pub const UINT16_MAX_VALUE: u16 = 0xffff;

pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_TOTAL_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// The CRC-32 algorithm used by the ZIP file format.
pub const ZIP_CRC: Crc<u32> = Crc::<u32>::new(&Algorithm {
    width: 32,
    poly: 0x04c1_1db7,
    init: 0xffff_ffff,
    refin: true,
    refout: true,
    xorout: 0xffff_ffff,
    check: 0xcbf4_3926,
    residue: 0xdebb_20e3,
});

pub fn crc_bytes(bytes: &[u8]) -> u32 {
    let mut digest = ZIP_CRC.digest();
    digest.update(bytes);
    digest.finalize()
}

/// The compression method of an archive entry, which may be an unsupported method.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FileCompression {
    Deflate,
    Store,
    Unsupported(u16),
}

impl From<u16> for FileCompression {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Store,
            8 => Self::Deflate,
            other => Self::Unsupported(other),
        }
    }
}

impl From<FileCompression> for u16 {
    fn from(value: FileCompression) -> Self {
        match value {
            FileCompression::Store => 0,
            FileCompression::Deflate => 8,
            FileCompression::Unsupported(other) => other,
        }
    }
}
