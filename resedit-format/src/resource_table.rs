//! The compiled resource-table codec: outer chunk, global string pool, and
//! one or more package chunks (each with an embedded type/key string pool
//! pair and an opaque run of typeSpec/type sub-chunks).
//!
//! The identifier space (package id, type id, entry id) never changes under
//! a rewrite; only string content moves, in place, by index. That lets the
//! package chunk's typeSpec/type sub-chunks stay untouched bytes unless an
//! embedded pool actually resizes.

use std::io::{Cursor, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::chunk::ChunkHeader;
use crate::error::{FormatError, Result};
use crate::string_pool::{StringPool, ValidationMode};

const RES_TABLE_TYPE: u16 = 0x0002;
const RES_TABLE_HEADER_SIZE: u16 = 12;
const PACKAGE_TYPE: u16 = 0x0200;
const STRING_POOL_TYPE: u16 = 0x0001;
const PACKAGE_HEADER_SIZE: u16 = 288;
const PACKAGE_NAME_UNITS: usize = 128;

/// A top-level child chunk of the resource table, in original order.
pub enum Chunk {
    GlobalStrings(StringPool),
    Package(Package),
    Other { chunk_type: u16, raw: Vec<u8> },
}

pub struct ResourceTable {
    chunks: Vec<Chunk>,
}

impl ResourceTable {
    pub fn parse(bytes: &[u8], mode: ValidationMode) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let header = ChunkHeader::read(&mut cursor, "resource_table")?;
        if header.chunk_type != RES_TABLE_TYPE {
            return Err(FormatError::parse(
                "resource_table",
                0,
                format!("expected chunk type 0x0002, got {:#06x}", header.chunk_type),
            ));
        }
        if header.header_size != RES_TABLE_HEADER_SIZE {
            return Err(FormatError::parse(
                "resource_table",
                2,
                format!("expected header_size 12, got {}", header.header_size),
            ));
        }
        let package_count = cursor
            .read_u32::<LE>()
            .map_err(|e| FormatError::parse("resource_table", 8, e.to_string()))?;

        let mut chunks = Vec::new();
        let mut seen_packages = 0u32;
        while (cursor.position() as usize) < header.chunk_size as usize
            && (cursor.position() as usize) < bytes.len()
        {
            let child_start = cursor.position() as usize;
            if child_start + 8 > bytes.len() {
                break;
            }
            let child_header = ChunkHeader::read(&mut cursor, "resource_table child")?;
            let child_end = child_start + child_header.chunk_size as usize;
            if child_end > bytes.len() {
                return Err(FormatError::parse(
                    "resource_table",
                    child_start as u64,
                    "child chunk extends past resource table bounds",
                ));
            }
            let child_bytes = &bytes[child_start..child_end];

            match child_header.chunk_type {
                t if t == STRING_POOL_TYPE => {
                    chunks.push(Chunk::GlobalStrings(StringPool::parse(child_bytes, mode)?));
                }
                t if t == PACKAGE_TYPE => {
                    chunks.push(Chunk::Package(Package::parse(child_bytes, mode)?));
                    seen_packages += 1;
                }
                other => {
                    chunks.push(Chunk::Other {
                        chunk_type: other,
                        raw: child_bytes.to_vec(),
                    });
                }
            }
            cursor.set_position(child_end as u64);
        }

        if seen_packages != package_count {
            return Err(FormatError::parse(
                "resource_table",
                0,
                format!("header declared {package_count} packages, found {seen_packages}"),
            ));
        }

        Ok(Self { chunks })
    }

    pub fn global_strings(&self) -> &StringPool {
        self.chunks
            .iter()
            .find_map(|c| match c {
                Chunk::GlobalStrings(p) => Some(p),
                _ => None,
            })
            .expect("resource table always carries a global string pool")
    }

    pub fn global_strings_mut(&mut self) -> &mut StringPool {
        self.chunks
            .iter_mut()
            .find_map(|c| match c {
                Chunk::GlobalStrings(p) => Some(p),
                _ => None,
            })
            .expect("resource table always carries a global string pool")
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.chunks.iter().filter_map(|c| match c {
            Chunk::Package(p) => Some(p),
            _ => None,
        })
    }

    pub fn packages_mut(&mut self) -> impl Iterator<Item = &mut Package> {
        self.chunks.iter_mut().filter_map(|c| match c {
            Chunk::Package(p) => Some(p),
            _ => None,
        })
    }

    pub fn package_count(&self) -> usize {
        self.packages().count()
    }

    /// Rewrites own-prefix/class-mapped strings in the global pool in place.
    /// `replacer` already encodes the semantic filter and mapping decision;
    /// it returns `Some(new_value)` when a string should be rewritten.
    pub fn replace_in_global_pool(&mut self, replacer: &mut dyn FnMut(&str) -> Option<String>) -> Result<usize> {
        let pool = self.global_strings_mut();
        let mut count = 0;
        for i in 0..pool.len() {
            let current = pool.get(i).unwrap().to_string();
            if let Some(new_value) = replacer(&current) {
                pool.set(i, new_value)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Pre-computed exact post-emit length, summing every child chunk.
    pub fn size_bytes(&self) -> usize {
        let header = 12usize;
        let children: usize = self
            .chunks
            .iter()
            .map(|c| match c {
                Chunk::GlobalStrings(p) => p.size_bytes(),
                Chunk::Package(p) => p.size_bytes(),
                Chunk::Other { raw, .. } => raw.len(),
            })
            .sum();
        header + children
    }

    pub fn emit(&self) -> Result<Vec<u8>> {
        let expected = self.size_bytes();
        // The exact size above is a sum of component sizes, not an estimate,
        // so the margin below only guards against a bug in that sum; it is
        // not load-bearing the way a pre-sized C buffer's slack would be.
        let mut out = Vec::with_capacity(expected + expected / 10);

        out.write_u16::<LE>(RES_TABLE_TYPE).map_err(io_err)?;
        out.write_u16::<LE>(RES_TABLE_HEADER_SIZE).map_err(io_err)?;
        out.write_u32::<LE>(expected as u32).map_err(io_err)?;
        out.write_u32::<LE>(self.package_count() as u32)
            .map_err(io_err)?;

        for chunk in &self.chunks {
            match chunk {
                Chunk::GlobalStrings(pool) => pool.emit(&mut out)?,
                Chunk::Package(pkg) => out.write_all(&pkg.emit()?).map_err(io_err)?,
                Chunk::Other { raw, .. } => out.write_all(raw).map_err(io_err)?,
            }
        }

        if out.len() != expected {
            return Err(FormatError::Emit {
                expected_size: expected,
                actual_size: out.len(),
            });
        }

        self.verify_integrity(&out)?;
        Ok(out)
    }

    fn verify_integrity(&self, emitted: &[u8]) -> Result<()> {
        let reparsed = ResourceTable::parse(emitted, ValidationMode::Lenient)?;

        if reparsed.package_count() != self.package_count() {
            return Err(FormatError::Integrity {
                invariant: "package_count".into(),
            });
        }
        if reparsed.global_strings().len() != self.global_strings().len() {
            return Err(FormatError::Integrity {
                invariant: "global_strings.len".into(),
            });
        }
        for (original, reparsed) in self.packages().zip(reparsed.packages()) {
            if original.id != reparsed.id {
                return Err(FormatError::Integrity {
                    invariant: "package.id".into(),
                });
            }
            if original.type_strings.len() != reparsed.type_strings.len() {
                return Err(FormatError::Integrity {
                    invariant: "package.type_strings.len".into(),
                });
            }
            if original.key_strings.len() != reparsed.key_strings.len() {
                return Err(FormatError::Integrity {
                    invariant: "package.key_strings.len".into(),
                });
            }
        }
        Ok(())
    }
}

pub struct Package {
    pub id: u32,
    name: String,
    pub type_strings: StringPool,
    pub key_strings: StringPool,
    last_public_type: u32,
    last_public_key: u32,
    type_id_offset: u32,
    /// Raw bytes of the typeSpec/type sub-chunk run following the key pool,
    /// retained byte-for-byte unless a pool resizes.
    trailing: Vec<u8>,
    original_bytes: Vec<u8>,
    name_dirty: bool,
    pools_dirty: bool,
}

impl Package {
    fn parse(bytes: &[u8], mode: ValidationMode) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let header = ChunkHeader::read(&mut cursor, "package")?;
        if header.chunk_type != PACKAGE_TYPE {
            return Err(FormatError::parse(
                "package",
                0,
                format!("expected chunk type 0x0200, got {:#06x}", header.chunk_type),
            ));
        }
        if header.header_size != PACKAGE_HEADER_SIZE {
            return Err(FormatError::parse(
                "package",
                2,
                format!("expected header_size 288, got {}", header.header_size),
            ));
        }

        let id = cursor
            .read_u32::<LE>()
            .map_err(|e| FormatError::parse("package", 8, e.to_string()))?;

        let mut name_units = [0u8; PACKAGE_NAME_UNITS * 2];
        cursor
            .read_exact(&mut name_units)
            .map_err(|e| FormatError::parse("package", 12, e.to_string()))?;
        let name = decode_package_name(&name_units);

        let type_strings_offset = cursor
            .read_u32::<LE>()
            .map_err(|e| FormatError::parse("package", 268, e.to_string()))?;
        let last_public_type = cursor
            .read_u32::<LE>()
            .map_err(|e| FormatError::parse("package", 272, e.to_string()))?;
        let key_strings_offset = cursor
            .read_u32::<LE>()
            .map_err(|e| FormatError::parse("package", 276, e.to_string()))?;
        let last_public_key = cursor
            .read_u32::<LE>()
            .map_err(|e| FormatError::parse("package", 280, e.to_string()))?;
        let type_id_offset = cursor
            .read_u32::<LE>()
            .map_err(|e| FormatError::parse("package", 284, e.to_string()))?;

        if type_strings_offset as usize > bytes.len() || key_strings_offset as usize > bytes.len() {
            return Err(FormatError::parse("package", 0, "embedded pool offset out of bounds"));
        }

        let type_strings = StringPool::parse(&bytes[type_strings_offset as usize..], mode)?;
        let key_strings = StringPool::parse(&bytes[key_strings_offset as usize..], mode)?;

        let trailing_start = key_strings_offset as usize + key_strings.size_bytes();
        let trailing = if trailing_start < bytes.len() {
            bytes[trailing_start..].to_vec()
        } else {
            Vec::new()
        };

        Ok(Self {
            id,
            name,
            type_strings,
            key_strings,
            last_public_type,
            last_public_key,
            type_id_offset,
            trailing,
            original_bytes: bytes.to_vec(),
            name_dirty: false,
            pools_dirty: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes the UTF-16 128-slot name field; does not force a full rebuild.
    pub fn set_package_name(&mut self, new_name: impl Into<String>) -> Result<()> {
        let new_name = new_name.into();
        if new_name.encode_utf16().count() > PACKAGE_NAME_UNITS - 1 {
            return Err(FormatError::Encoding {
                index: 0,
                target_encoding: "package-name-utf16",
                cause: format!("{new_name:?} exceeds {} code units", PACKAGE_NAME_UNITS - 1),
            });
        }
        self.name = new_name;
        self.name_dirty = true;
        Ok(())
    }

    /// Rewrites type/key strings in place; any match forces a full package rebuild.
    pub fn replace_in_type_or_key_pool(
        &mut self,
        replacer: &mut dyn FnMut(&str) -> Option<String>,
    ) -> Result<usize> {
        let mut count = 0;
        count += replace_pool_in_place(&mut self.type_strings, replacer)?;
        count += replace_pool_in_place(&mut self.key_strings, replacer)?;
        if count > 0 {
            self.pools_dirty = true;
        }
        Ok(count)
    }

    pub fn size_bytes(&self) -> usize {
        if !self.pools_dirty {
            // Name-only changes patch the fixed-width name field in place.
            return self.original_bytes.len();
        }
        PACKAGE_HEADER_SIZE as usize + self.type_strings.size_bytes() + self.key_strings.size_bytes()
            + self.trailing.len()
    }

    pub fn emit(&self) -> Result<Vec<u8>> {
        if !self.name_dirty && !self.pools_dirty {
            return Ok(self.original_bytes.clone());
        }
        if !self.pools_dirty {
            let mut bytes = self.original_bytes.clone();
            let name_field = encode_package_name(&self.name)?;
            bytes[12..12 + PACKAGE_NAME_UNITS * 2].copy_from_slice(&name_field);
            return Ok(bytes);
        }

        let type_strings_offset = PACKAGE_HEADER_SIZE as u32;
        let key_strings_offset = type_strings_offset + self.type_strings.size_bytes() as u32;
        let total = self.size_bytes();

        let mut out = Vec::with_capacity(total);
        out.write_u16::<LE>(PACKAGE_TYPE).map_err(io_err)?;
        out.write_u16::<LE>(PACKAGE_HEADER_SIZE).map_err(io_err)?;
        out.write_u32::<LE>(total as u32).map_err(io_err)?;
        out.write_u32::<LE>(self.id).map_err(io_err)?;
        out.write_all(&encode_package_name(&self.name)?)
            .map_err(io_err)?;
        out.write_u32::<LE>(type_strings_offset).map_err(io_err)?;
        out.write_u32::<LE>(self.last_public_type).map_err(io_err)?;
        out.write_u32::<LE>(key_strings_offset).map_err(io_err)?;
        out.write_u32::<LE>(self.last_public_key).map_err(io_err)?;
        out.write_u32::<LE>(self.type_id_offset).map_err(io_err)?;

        self.type_strings.emit(&mut out)?;
        self.key_strings.emit(&mut out)?;
        out.write_all(&self.trailing).map_err(io_err)?;

        if out.len() != total {
            return Err(FormatError::Emit {
                expected_size: total,
                actual_size: out.len(),
            });
        }
        Ok(out)
    }
}

fn replace_pool_in_place(
    pool: &mut StringPool,
    replacer: &mut dyn FnMut(&str) -> Option<String>,
) -> Result<usize> {
    let mut count = 0;
    for i in 0..pool.len() {
        let current = pool.get(i).unwrap().to_string();
        if let Some(new_value) = replacer(&current) {
            pool.set(i, new_value)?;
            count += 1;
        }
    }
    Ok(count)
}

fn decode_package_name(units: &[u8]) -> String {
    let u16s: Vec<u16> = units
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&u16s)
}

fn encode_package_name(name: &str) -> Result<Vec<u8>> {
    let units: Vec<u16> = name.encode_utf16().collect();
    if units.len() > PACKAGE_NAME_UNITS - 1 {
        return Err(FormatError::Encoding {
            index: 0,
            target_encoding: "package-name-utf16",
            cause: format!("{name:?} exceeds {} code units", PACKAGE_NAME_UNITS - 1),
        });
    }
    let mut out = vec![0u8; PACKAGE_NAME_UNITS * 2];
    for (i, u) in units.iter().enumerate() {
        out[i * 2..i * 2 + 2].copy_from_slice(&u.to_le_bytes());
    }
    Ok(out)
}

fn io_err(e: std::io::Error) -> FormatError {
    FormatError::parse("resource_table", 0, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string_pool::Encoding;

    fn build_pool_bytes(strings: &[&str]) -> Vec<u8> {
        let mut pool = StringPool::new(Encoding::ModifiedUtf8);
        for s in strings {
            pool.push(*s);
        }
        let mut out = Vec::new();
        pool.emit(&mut out).unwrap();
        out
    }

    fn build_package_bytes(id: u32, name: &str, type_strings: &[&str], key_strings: &[&str]) -> Vec<u8> {
        let type_pool = build_pool_bytes(type_strings);
        let key_pool = build_pool_bytes(key_strings);
        let type_offset = PACKAGE_HEADER_SIZE as u32;
        let key_offset = type_offset + type_pool.len() as u32;
        let total = key_offset as usize + key_pool.len();

        let mut out = Vec::with_capacity(total);
        out.write_u16::<LE>(PACKAGE_TYPE).unwrap();
        out.write_u16::<LE>(PACKAGE_HEADER_SIZE).unwrap();
        out.write_u32::<LE>(total as u32).unwrap();
        out.write_u32::<LE>(id).unwrap();
        out.write_all(&encode_package_name(name).unwrap()).unwrap();
        out.write_u32::<LE>(type_offset).unwrap();
        out.write_u32::<LE>(0).unwrap();
        out.write_u32::<LE>(key_offset).unwrap();
        out.write_u32::<LE>(0).unwrap();
        out.write_u32::<LE>(0).unwrap();
        out.write_all(&type_pool).unwrap();
        out.write_all(&key_pool).unwrap();
        out
    }

    fn build_table_bytes(packages: &[Vec<u8>], global: &[&str]) -> Vec<u8> {
        let global_pool = build_pool_bytes(global);
        let children_len: usize = global_pool.len() + packages.iter().map(|p| p.len()).sum::<usize>();
        let total = 12 + children_len;

        let mut out = Vec::with_capacity(total);
        out.write_u16::<LE>(RES_TABLE_TYPE).unwrap();
        out.write_u16::<LE>(RES_TABLE_HEADER_SIZE).unwrap();
        out.write_u32::<LE>(total as u32).unwrap();
        out.write_u32::<LE>(packages.len() as u32).unwrap();
        out.write_all(&global_pool).unwrap();
        for p in packages {
            out.write_all(p).unwrap();
        }
        out
    }

    #[test]
    fn parses_single_package_table() {
        let pkg = build_package_bytes(0x7F, "com.app", &["attr1"], &["key1"]);
        let bytes = build_table_bytes(&[pkg], &["com.app.MyView"]);
        let table = ResourceTable::parse(&bytes, ValidationMode::Strict).unwrap();
        assert_eq!(table.package_count(), 1);
        assert_eq!(table.global_strings().get(0).unwrap(), "com.app.MyView");
        let first = table.packages().next().unwrap();
        assert_eq!(first.id, 0x7F);
        assert_eq!(first.name(), "com.app");
    }

    #[test]
    fn name_only_change_preserves_trailing_bytes() {
        let pkg = build_package_bytes(0x7F, "com.app", &["attr1"], &["key1"]);
        let bytes = build_table_bytes(&[pkg], &["com.app.MyView"]);
        let mut table = ResourceTable::parse(&bytes, ValidationMode::Strict).unwrap();

        let original_package_bytes = {
            let mut out = Vec::new();
            let pkg = table.packages().next().unwrap();
            out.extend_from_slice(&pkg.original_bytes);
            out
        };

        for pkg in table.packages_mut() {
            pkg.set_package_name("z.q").unwrap();
        }
        let emitted = table.packages().next().unwrap().emit().unwrap();

        assert_eq!(emitted.len(), original_package_bytes.len());
        // Bytes outside the name field (offset 12..12+256) are untouched.
        assert_eq!(&emitted[268..], &original_package_bytes[268..]);
    }

    #[test]
    fn global_pool_replace_preserves_count() {
        let pkg = build_package_bytes(0x7F, "com.app", &["attr1"], &["key1"]);
        let bytes = build_table_bytes(&[pkg], &["com.app.MyView", "android.widget.Button"]);
        let mut table = ResourceTable::parse(&bytes, ValidationMode::Strict).unwrap();

        let original_len = table.global_strings().len();
        let count = table
            .replace_in_global_pool(&mut |s| {
                if s == "com.app.MyView" {
                    Some("z.q.MyView".to_string())
                } else {
                    None
                }
            })
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(table.global_strings().len(), original_len);
        assert_eq!(table.global_strings().get(0).unwrap(), "z.q.MyView");
    }

    #[test]
    fn emit_round_trips_and_passes_integrity_check() {
        let pkg = build_package_bytes(0x7F, "com.app", &["attr1", "attr2"], &["key1"]);
        let bytes = build_table_bytes(&[pkg], &["com.app.MyView"]);
        let table = ResourceTable::parse(&bytes, ValidationMode::Strict).unwrap();
        let emitted = table.emit().unwrap();
        let reparsed = ResourceTable::parse(&emitted, ValidationMode::Strict).unwrap();
        assert_eq!(reparsed.package_count(), table.package_count());
        assert_eq!(reparsed.global_strings().len(), table.global_strings().len());
    }

    #[test]
    fn pool_rewrite_forces_full_package_rebuild() {
        let pkg = build_package_bytes(0x7F, "com.app", &["attr1"], &["key1"]);
        let bytes = build_table_bytes(&[pkg], &["unrelated"]);
        let mut table = ResourceTable::parse(&bytes, ValidationMode::Strict).unwrap();

        for pkg in table.packages_mut() {
            let count = pkg
                .replace_in_type_or_key_pool(&mut |s| {
                    if s == "attr1" {
                        Some("attr1_renamed".to_string())
                    } else {
                        None
                    }
                })
                .unwrap();
            assert_eq!(count, 1);
        }

        let emitted = table.emit().unwrap();
        let reparsed = ResourceTable::parse(&emitted, ValidationMode::Strict).unwrap();
        let pkg = reparsed.packages().next().unwrap();
        assert_eq!(pkg.type_strings.get(0).unwrap(), "attr1_renamed");
        assert_eq!(pkg.type_strings.len(), 1);
    }
}
