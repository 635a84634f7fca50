//! The generic 8-byte chunk header (`type`, `header_size`, `chunk_size`)
//! shared by every chunk in the resource-table and binary-XML containers.

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::error::{FormatError, Result};

#[derive(Copy, Clone, Debug)]
pub struct ChunkHeader {
    pub chunk_type: u16,
    pub header_size: u16,
    pub chunk_size: u32,
}

impl ChunkHeader {
    pub fn read(mut r: impl Read, region: &'static str) -> Result<Self> {
        let chunk_type = r
            .read_u16::<LE>()
            .map_err(|e| FormatError::parse(region, 0, e.to_string()))?;
        let header_size = r
            .read_u16::<LE>()
            .map_err(|e| FormatError::parse(region, 2, e.to_string()))?;
        let chunk_size = r
            .read_u32::<LE>()
            .map_err(|e| FormatError::parse(region, 4, e.to_string()))?;
        Ok(Self {
            chunk_type,
            header_size,
            chunk_size,
        })
    }

    pub fn write(&self, mut w: impl Write, region: &'static str) -> Result<()> {
        w.write_u16::<LE>(self.chunk_type)
            .map_err(|e| FormatError::parse(region, 0, e.to_string()))?;
        w.write_u16::<LE>(self.header_size)
            .map_err(|e| FormatError::parse(region, 2, e.to_string()))?;
        w.write_u32::<LE>(self.chunk_size)
            .map_err(|e| FormatError::parse(region, 4, e.to_string()))?;
        Ok(())
    }
}

/// Patches the `chunk_size` (bytes `[4, 8)`) of a chunk already written into `buf`.
pub fn patch_chunk_size(buf: &mut [u8], chunk_start: usize, actual_size: u32) {
    buf[chunk_start + 4..chunk_start + 8].copy_from_slice(&actual_size.to_le_bytes());
}
