use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use byteorder::{ReadBytesExt, LE};
use libflate::deflate;

use crate::data::{CentDirHeader, EndOfCentDir, LocalFileHeader};
use crate::error::{ArchiveError, Result};
use crate::glob;
use crate::{crc_bytes, FileCompression, MAX_FILE_SIZE, MAX_TOTAL_SIZE, UINT16_MAX_VALUE, VERSION_NEEDED_TO_EXTRACT};

/// A single archive entry: canonicalized path, decompressed content, and the
/// storage metadata needed to re-emit it unchanged when its content is not
/// touched.
#[derive(Clone)]
pub struct ArchiveEntry {
    pub path: String,
    pub method: FileCompression,
    pub crc: u32,
    pub extra: Vec<u8>,
    pub comment: String,

    bytes: Vec<u8>,
    /// The compressed bytes exactly as read from the source archive, reused
    /// verbatim on emit until [`ArchiveView::write`] marks this entry dirty.
    raw_compressed: Vec<u8>,
    dirty: bool,

    version_needed: u16,
    flags: u16,
    last_modified: u32,
    os_version_made_by: u16,
    internal_attrs: u16,
    external_attrs: u32,
}

impl ArchiveEntry {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// An in-memory view over an archive's entries, keyed by canonicalized path.
pub struct ArchiveView {
    entries: HashMap<String, ArchiveEntry>,
    order: Vec<String>,
}

impl ArchiveView {
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let eocd_pos = find_eocd(bytes)?;
        let mut cursor = Cursor::new(bytes);
        cursor.set_position(eocd_pos);
        let eocd = EndOfCentDir::read(&mut cursor)?;

        cursor.set_position(eocd.cent_dir_offset as u64);
        let mut records = Vec::with_capacity(eocd.cent_dir_records as usize);
        for _ in 0..eocd.cent_dir_records {
            records.push(CentDirHeader::read(&mut cursor)?);
        }

        let mut entries = HashMap::with_capacity(records.len());
        let mut order = Vec::with_capacity(records.len());
        let mut total_size: u64 = 0;

        for cdh in records {
            let path = canonicalize_path(&cdh.file_name)?;

            if cdh.uncompressed_len as u64 > MAX_FILE_SIZE {
                return Err(ArchiveError::SizeCapExceeded {
                    path,
                    size: cdh.uncompressed_len as u64,
                    cap: MAX_FILE_SIZE,
                });
            }
            total_size += cdh.uncompressed_len as u64;
            if total_size > MAX_TOTAL_SIZE {
                return Err(ArchiveError::AggregateSizeCapExceeded {
                    size: total_size,
                    cap: MAX_TOTAL_SIZE,
                });
            }

            cursor.set_position(cdh.local_header_offset as u64);
            let lfh = LocalFileHeader::read(&mut cursor)?;

            let mut raw_compressed = vec![0u8; cdh.compressed_len as usize];
            cursor.read_exact(&mut raw_compressed)?;

            let decompressed = decompress(lfh.compression_method, &raw_compressed, &path)?;

            order.push(path.clone());
            entries.insert(
                path.clone(),
                ArchiveEntry {
                    path,
                    method: lfh.compression_method,
                    crc: cdh.crc32,
                    extra: lfh.extra_field,
                    comment: cdh.comment,
                    bytes: decompressed,
                    raw_compressed,
                    dirty: false,
                    version_needed: lfh.version_needed,
                    flags: lfh.flags,
                    last_modified: lfh.last_modified,
                    os_version_made_by: cdh.os_version_made_by,
                    internal_attrs: cdh.internal_attrs,
                    external_attrs: cdh.external_attrs,
                },
            );
        }

        Ok(Self { entries, order })
    }

    pub fn read(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(ArchiveEntry::bytes)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Replaces the content of an existing entry. The entry's method,
    /// extra field and comment are left untouched; its CRC is recomputed
    /// from the new bytes.
    pub fn write(&mut self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let entry = self
            .entries
            .get_mut(path)
            .ok_or_else(|| ArchiveError::NotFound { path: path.to_string() })?;
        entry.crc = crc_bytes(&bytes);
        entry.bytes = bytes;
        entry.dirty = true;
        Ok(())
    }

    pub fn list_matching(&self, pattern: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|p| glob::matches(pattern, p))
            .map(String::as_str)
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.order.iter().filter_map(|p| self.entries.get(p))
    }

    /// Re-emits the archive, writing entries in their original order.
    /// Untouched entries are copied through byte-for-byte (including their
    /// compressed representation); entries changed via [`write`] are
    /// recompressed per their stored method.
    pub fn emit(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut cd_records = Vec::with_capacity(self.order.len());

        for path in &self.order {
            let entry = self.entries.get(path).expect("order/entries in sync");

            let (compressed, crc, compressed_len) = if entry.dirty {
                let (compressed, crc) = compress(entry.method, &entry.bytes)?;
                let len = compressed.len() as u32;
                (compressed, crc, len)
            } else {
                (entry.raw_compressed.clone(), entry.crc, entry.raw_compressed.len() as u32)
            };

            let local_header_offset = out.len() as u32;
            let lfh = LocalFileHeader {
                version_needed: entry.version_needed,
                flags: entry.flags,
                compression_method: entry.method,
                last_modified: entry.last_modified,
                crc32: crc,
                compressed_len,
                uncompressed_len: entry.bytes.len() as u32,
                file_name: entry.path.clone(),
                extra_field: entry.extra.clone(),
            };
            lfh.write(&mut out)?;
            out.write_all(&compressed)?;

            cd_records.push(CentDirHeader {
                os_version_made_by: entry.os_version_made_by,
                version_needed: entry.version_needed,
                flags: entry.flags,
                compression_method: entry.method,
                last_modified: entry.last_modified,
                crc32: crc,
                compressed_len,
                uncompressed_len: entry.bytes.len() as u32,
                internal_attrs: entry.internal_attrs,
                external_attrs: entry.external_attrs,
                local_header_offset,
                file_name: entry.path.clone(),
                extra_field: Vec::new(),
                comment: entry.comment.clone(),
            });
        }

        let cd_start = out.len() as u32;
        for cdh in &cd_records {
            cdh.write(&mut out)?;
        }
        let cd_size = out.len() as u32 - cd_start;

        let eocd = EndOfCentDir {
            cent_dir_records: cd_records.len() as u16,
            cent_dir_size: cd_size,
            cent_dir_offset: cd_start,
            comment: Vec::new(),
        };
        eocd.write(&mut out)?;

        Ok(out)
    }
}

fn decompress(method: FileCompression, raw: &[u8], path: &str) -> Result<Vec<u8>> {
    match method {
        FileCompression::Store => Ok(raw.to_vec()),
        FileCompression::Deflate => {
            let mut decoder = deflate::Decoder::new(raw);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out)?;
            Ok(out)
        }
        FileCompression::Unsupported(m) => Err(ArchiveError::PathViolation {
            path: path.to_string(),
            reason: format!("unsupported compression method {m}"),
        }),
    }
}

fn compress(method: FileCompression, bytes: &[u8]) -> Result<(Vec<u8>, u32)> {
    let crc = crc_bytes(bytes);
    match method {
        FileCompression::Store => Ok((bytes.to_vec(), crc)),
        FileCompression::Deflate => {
            let mut encoder = deflate::Encoder::new(Vec::new());
            encoder.write_all(bytes)?;
            let compressed = encoder.finish().into_result()?;
            Ok((compressed, crc))
        }
        FileCompression::Unsupported(m) => Err(ArchiveError::UnsupportedCompression(m)),
    }
}

fn find_eocd(bytes: &[u8]) -> Result<u64> {
    let archive_size = bytes.len() as u64;
    if archive_size < EndOfCentDir::MIN_SIZE {
        return Err(ArchiveError::Malformed {
            offset: 0,
            reason: "file too small to be a valid archive".into(),
        });
    }

    let max_comment_len = std::cmp::min(archive_size - EndOfCentDir::MIN_SIZE, UINT16_MAX_VALUE as u64);
    let eocd_empty_comment_pos = archive_size - EndOfCentDir::MIN_SIZE;
    let mut cursor = Cursor::new(bytes);

    for expected_comment_len in 0..=max_comment_len {
        let eocd_pos = eocd_empty_comment_pos - expected_comment_len;
        cursor.set_position(eocd_pos);
        if cursor.read_u32::<LE>()? != EndOfCentDir::HEADER {
            continue;
        }
        cursor.set_position(eocd_pos + EndOfCentDir::COMMENT_LENGTH_FIELD_OFFSET);
        let actual_comment_len = cursor.read_u16::<LE>()? as u64;
        if actual_comment_len == expected_comment_len {
            return Ok(eocd_pos);
        }
    }
    Err(ArchiveError::Malformed {
        offset: 0,
        reason: "no end-of-central-directory record found".into(),
    })
}

const FORBIDDEN_CHARS: [char; 6] = ['<', '>', ':', '"', '|', '?'];

/// Rejects control characters and reserved characters, resolves `.`/`..`
/// segments, and converts `\` separators to `/`. Returns the normalized path.
fn canonicalize_path(raw: &str) -> Result<String> {
    let violation = |reason: &str| ArchiveError::PathViolation {
        path: raw.to_string(),
        reason: reason.to_string(),
    };

    if raw.len() > 4096 {
        return Err(violation("path exceeds 4096 bytes"));
    }
    for c in raw.chars() {
        if c == '\0' || (c as u32) < 0x20 || c as u32 == 0x7F {
            return Err(violation("path contains a control character"));
        }
        if c == '*' || FORBIDDEN_CHARS.contains(&c) {
            return Err(violation("path contains a reserved character"));
        }
    }

    let normalized_input = raw.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in normalized_input.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(violation("path traverses above the archive root"));
                }
            }
            s if s.len() > 255 => return Err(violation("path segment exceeds 255 characters")),
            s => segments.push(s),
        }
    }

    let joined = segments.join("/");
    if joined.len() > 4096 {
        return Err(violation("normalized path exceeds 4096 bytes"));
    }
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn build_store_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut cd_records = Vec::new();

        for (name, contents) in entries {
            let offset = out.len() as u32;
            let crc = crc_bytes(contents);
            let lfh = LocalFileHeader {
                version_needed: VERSION_NEEDED_TO_EXTRACT,
                flags: 0,
                compression_method: FileCompression::Store,
                last_modified: 0,
                crc32: crc,
                compressed_len: contents.len() as u32,
                uncompressed_len: contents.len() as u32,
                file_name: name.to_string(),
                extra_field: Vec::new(),
            };
            lfh.write(&mut out).unwrap();
            out.write_all(contents).unwrap();

            cd_records.push(CentDirHeader {
                os_version_made_by: 0,
                version_needed: VERSION_NEEDED_TO_EXTRACT,
                flags: 0,
                compression_method: FileCompression::Store,
                last_modified: 0,
                crc32: crc,
                compressed_len: contents.len() as u32,
                uncompressed_len: contents.len() as u32,
                internal_attrs: 0,
                external_attrs: 0,
                local_header_offset: offset,
                file_name: name.to_string(),
                extra_field: Vec::new(),
                comment: String::new(),
            });
        }

        let cd_start = out.len() as u32;
        for cdh in &cd_records {
            cdh.write(&mut out).unwrap();
        }
        let cd_size = out.len() as u32 - cd_start;
        EndOfCentDir {
            cent_dir_records: cd_records.len() as u16,
            cent_dir_size: cd_size,
            cent_dir_offset: cd_start,
            comment: Vec::new(),
        }
        .write(&mut out)
        .unwrap();
        out
    }

    #[test]
    fn loads_store_entries_and_reads_back_contents() {
        let bytes = build_store_archive(&[("AndroidManifest.xml", b"<manifest/>"), ("res/layout/a.xml", b"<LinearLayout/>")]);
        let view = ArchiveView::load(&bytes).unwrap();
        assert_eq!(view.read("AndroidManifest.xml"), Some(&b"<manifest/>"[..]));
        assert_eq!(view.read("res/layout/a.xml"), Some(&b"<LinearLayout/>"[..]));
        assert!(!view.exists("missing"));
    }

    #[test]
    fn load_then_emit_with_no_mutation_is_byte_identical() {
        let bytes = build_store_archive(&[("a.txt", b"hello"), ("b/c.txt", b"world")]);
        let view = ArchiveView::load(&bytes).unwrap();
        let emitted = view.emit().unwrap();
        assert_eq!(bytes, emitted);
    }

    #[test]
    fn write_updates_content_and_crc() {
        let bytes = build_store_archive(&[("a.txt", b"hello")]);
        let mut view = ArchiveView::load(&bytes).unwrap();
        view.write("a.txt", b"goodbye".to_vec()).unwrap();
        let emitted = view.emit().unwrap();
        let reloaded = ArchiveView::load(&emitted).unwrap();
        assert_eq!(reloaded.read("a.txt"), Some(&b"goodbye"[..]));
    }

    #[test]
    fn list_matching_uses_glob_semantics() {
        let bytes = build_store_archive(&[("res/layout/a.xml", b""), ("res/menu/m.xml", b""), ("AndroidManifest.xml", b"")]);
        let view = ArchiveView::load(&bytes).unwrap();
        let mut layouts = view.list_matching("res/layout/*.xml");
        layouts.sort();
        assert_eq!(layouts, vec!["res/layout/a.xml"]);
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(canonicalize_path("../evil").is_err());
        assert!(canonicalize_path("a/../../evil").is_err());
        assert_eq!(canonicalize_path("a/./b").unwrap(), "a/b");
    }

    #[test]
    fn rejects_control_and_reserved_characters() {
        assert!(canonicalize_path("bad\0name").is_err());
        assert!(canonicalize_path("bad<name>").is_err());
        assert!(canonicalize_path("bad*name").is_err());
    }

    #[test]
    fn rejects_oversized_segment() {
        let long_segment = "a".repeat(256);
        assert!(canonicalize_path(&long_segment).is_err());
    }
}
