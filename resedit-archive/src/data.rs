use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::error::{ArchiveError, Result};
use crate::FileCompression;

/// ZIP end-of-central-directory record.
#[derive(Clone)]
pub struct EndOfCentDir {
    pub cent_dir_records: u16,
    pub cent_dir_size: u32,
    pub cent_dir_offset: u32,
    pub comment: Vec<u8>,
}

/// ZIP central directory file header.
#[derive(Clone)]
pub struct CentDirHeader {
    pub os_version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: FileCompression,
    pub last_modified: u32,
    pub crc32: u32,
    pub compressed_len: u32,
    pub uncompressed_len: u32,

    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub local_header_offset: u32,

    pub file_name: String,
    pub extra_field: Vec<u8>,
    pub comment: String,
}

/// ZIP local file header.
#[derive(Clone)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: FileCompression,
    pub last_modified: u32,
    pub crc32: u32,
    pub compressed_len: u32,
    pub uncompressed_len: u32,

    pub file_name: String,
    pub extra_field: Vec<u8>,
}

impl EndOfCentDir {
    pub const HEADER: u32 = 0x0605_4b50;
    pub const MIN_SIZE: u64 = 22;
    pub const COMMENT_LENGTH_FIELD_OFFSET: u64 = 20;

    pub fn read(data: &mut impl Read) -> Result<Self> {
        if data.read_u32::<LE>()? != Self::HEADER {
            return Err(ArchiveError::Malformed {
                offset: 0,
                reason: "invalid EOCD signature".into(),
            });
        }

        let disk_num = data.read_u16::<LE>()?;
        let start_of_cd_disk = data.read_u16::<LE>()?;
        let cd_records_on_disk = data.read_u16::<LE>()?;

        let mut result = Self {
            cent_dir_records: data.read_u16::<LE>()?,
            cent_dir_size: data.read_u32::<LE>()?,
            cent_dir_offset: data.read_u32::<LE>()?,
            comment: vec![0u8; data.read_u16::<LE>()? as usize],
        };
        data.read_exact(&mut result.comment)?;

        if result.cent_dir_records != cd_records_on_disk || start_of_cd_disk != 0 || disk_num != 0 {
            return Err(ArchiveError::MultiDisk);
        }
        Ok(result)
    }

    pub fn write(&self, data: &mut impl Write) -> Result<()> {
        data.write_u32::<LE>(Self::HEADER)?;
        data.write_u16::<LE>(0)?;
        data.write_u16::<LE>(0)?;
        data.write_u16::<LE>(self.cent_dir_records)?;
        data.write_u16::<LE>(self.cent_dir_records)?;
        data.write_u32::<LE>(self.cent_dir_size)?;
        data.write_u32::<LE>(self.cent_dir_offset)?;
        data.write_u16::<LE>(self.comment.len() as u16)?;
        data.write_all(&self.comment)?;
        Ok(())
    }
}

impl CentDirHeader {
    pub const HEADER: u32 = 0x0201_4b50;

    pub fn read(data: &mut impl Read) -> Result<Self> {
        if data.read_u32::<LE>()? != Self::HEADER {
            return Err(ArchiveError::Malformed {
                offset: 0,
                reason: "invalid central directory header signature".into(),
            });
        }

        let os_version_made_by = data.read_u16::<LE>()?;
        let version_needed = data.read_u16::<LE>()?;
        let flags = data.read_u16::<LE>()?;
        let compression_method = FileCompression::from(data.read_u16::<LE>()?);
        let last_modified = data.read_u32::<LE>()?;
        let crc32 = data.read_u32::<LE>()?;
        let compressed_len = data.read_u32::<LE>()?;
        let uncompressed_len = data.read_u32::<LE>()?;

        let mut file_name_buf = vec![0u8; data.read_u16::<LE>()? as usize];
        let mut extra_field_buf = vec![0u8; data.read_u16::<LE>()? as usize];
        let mut comment_buf = vec![0u8; data.read_u16::<LE>()? as usize];

        if data.read_u16::<LE>()? != 0 {
            return Err(ArchiveError::MultiDisk);
        }

        let internal_attrs = data.read_u16::<LE>()?;
        let external_attrs = data.read_u32::<LE>()?;
        let local_header_offset = data.read_u32::<LE>()?;

        data.read_exact(&mut file_name_buf)?;
        data.read_exact(&mut extra_field_buf)?;
        data.read_exact(&mut comment_buf)?;

        Ok(Self {
            os_version_made_by,
            version_needed,
            flags,
            compression_method,
            last_modified,
            crc32,
            compressed_len,
            uncompressed_len,
            internal_attrs,
            external_attrs,
            local_header_offset,
            file_name: String::from_utf8(file_name_buf).map_err(|e| ArchiveError::Malformed {
                offset: 0,
                reason: format!("entry name not valid UTF-8: {e}"),
            })?,
            extra_field: extra_field_buf,
            comment: String::from_utf8(comment_buf).map_err(|e| ArchiveError::Malformed {
                offset: 0,
                reason: format!("entry comment not valid UTF-8: {e}"),
            })?,
        })
    }

    pub fn write(&self, data: &mut impl Write) -> Result<()> {
        data.write_u32::<LE>(Self::HEADER)?;
        data.write_u16::<LE>(self.os_version_made_by)?;
        data.write_u16::<LE>(self.version_needed)?;
        data.write_u16::<LE>(self.flags)?;
        data.write_u16::<LE>(self.compression_method.into())?;
        data.write_u32::<LE>(self.last_modified)?;
        data.write_u32::<LE>(self.crc32)?;
        data.write_u32::<LE>(self.compressed_len)?;
        data.write_u32::<LE>(self.uncompressed_len)?;

        data.write_u16::<LE>(self.file_name.len() as u16)?;
        data.write_u16::<LE>(self.extra_field.len() as u16)?;
        data.write_u16::<LE>(self.comment.len() as u16)?;

        data.write_u16::<LE>(0)?;
        data.write_u16::<LE>(self.internal_attrs)?;
        data.write_u32::<LE>(self.external_attrs)?;
        data.write_u32::<LE>(self.local_header_offset)?;

        data.write_all(self.file_name.as_bytes())?;
        data.write_all(&self.extra_field)?;
        data.write_all(self.comment.as_bytes())?;
        Ok(())
    }
}

impl LocalFileHeader {
    pub const HEADER: u32 = 0x0403_4b50;

    pub fn read(data: &mut impl Read) -> Result<Self> {
        if data.read_u32::<LE>()? != Self::HEADER {
            return Err(ArchiveError::Malformed {
                offset: 0,
                reason: "invalid local file header signature".into(),
            });
        }

        let version_needed = data.read_u16::<LE>()?;
        let flags = data.read_u16::<LE>()?;
        let compression_method = FileCompression::from(data.read_u16::<LE>()?);
        let last_modified = data.read_u32::<LE>()?;
        let crc32 = data.read_u32::<LE>()?;
        let compressed_len = data.read_u32::<LE>()?;
        let uncompressed_len = data.read_u32::<LE>()?;

        let mut file_name_buf = vec![0u8; data.read_u16::<LE>()? as usize];
        let mut extra_field_buf = vec![0u8; data.read_u16::<LE>()? as usize];

        data.read_exact(&mut file_name_buf)?;
        data.read_exact(&mut extra_field_buf)?;

        Ok(Self {
            version_needed,
            flags,
            compression_method,
            last_modified,
            crc32,
            compressed_len,
            uncompressed_len,
            file_name: String::from_utf8(file_name_buf).map_err(|e| ArchiveError::Malformed {
                offset: 0,
                reason: format!("entry name not valid UTF-8: {e}"),
            })?,
            extra_field: extra_field_buf,
        })
    }

    pub fn write(&self, data: &mut impl Write) -> Result<()> {
        data.write_u32::<LE>(Self::HEADER)?;
        data.write_u16::<LE>(self.version_needed)?;
        data.write_u16::<LE>(self.flags)?;
        data.write_u16::<LE>(self.compression_method.into())?;
        data.write_u32::<LE>(self.last_modified)?;
        data.write_u32::<LE>(self.crc32)?;
        data.write_u32::<LE>(self.compressed_len)?;
        data.write_u32::<LE>(self.uncompressed_len)?;

        data.write_u16::<LE>(self.file_name.len() as u16)?;
        data.write_u16::<LE>(self.extra_field.len() as u16)?;

        data.write_all(self.file_name.as_bytes())?;
        data.write_all(&self.extra_field)?;
        Ok(())
    }
}
