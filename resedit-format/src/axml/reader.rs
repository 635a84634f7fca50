use std::io::{Cursor, Read};

use byteorder::{ReadBytesExt, LE};

use crate::chunk::ChunkHeader;
use crate::error::{FormatError, Result};
use crate::string_pool::{StringPool, ValidationMode};

use super::{Attribute, AttributeValue, BinaryXml, Event, Namespace};

const XML_TYPE: u16 = 0x0003;
const STRING_POOL_TYPE: u16 = 0x0001;
const RES_MAP_TYPE: u16 = 0x0180;
const NS_START: u16 = 0x0100;
const NS_END: u16 = 0x0101;
const EL_START: u16 = 0x0102;
const EL_END: u16 = 0x0103;
const CDATA: u16 = 0x0104;
const ATTR_RECORD_MAGIC: u32 = 0x0014_0014;

type Cur<'a> = Cursor<&'a [u8]>;

pub(super) fn parse(bytes: &[u8]) -> Result<BinaryXml> {
    let mut cursor = Cursor::new(bytes);
    let header = ChunkHeader::read(&mut cursor, "axml")?;
    if header.chunk_type != XML_TYPE {
        return Err(FormatError::parse(
            "axml",
            0,
            format!("expected chunk type 0x0003, got {:#06x}", header.chunk_type),
        ));
    }

    let pool_start = cursor.position() as usize;
    let pool_header = ChunkHeader::read(&mut cursor, "axml string pool")?;
    if pool_header.chunk_type != STRING_POOL_TYPE {
        return Err(FormatError::parse(
            "axml",
            pool_start as u64,
            "expected string pool after xml header",
        ));
    }
    let pool_end = pool_start + pool_header.chunk_size as usize;
    if pool_end > bytes.len() {
        return Err(FormatError::parse("axml", pool_start as u64, "string pool runs past document end"));
    }
    let string_pool = StringPool::parse(&bytes[pool_start..pool_end], ValidationMode::Strict)?;
    cursor.set_position(pool_end as u64);

    let map_start = cursor.position() as usize;
    let map_header = ChunkHeader::read(&mut cursor, "axml resource map")?;
    if map_header.chunk_type != RES_MAP_TYPE {
        return Err(FormatError::parse(
            "axml",
            map_start as u64,
            "expected resource map after string pool",
        ));
    }
    let map_end = map_start + map_header.chunk_size as usize;
    if map_header.chunk_size < 8 || map_end > bytes.len() {
        return Err(FormatError::parse("axml", map_start as u64, "resource map chunk malformed"));
    }
    let map_len = (map_header.chunk_size as usize - 8) / 4;
    let mut known_resource_ids = Vec::with_capacity(map_len);
    for i in 0..map_len {
        let id = cursor
            .read_u32::<LE>()
            .map_err(|e| FormatError::parse("axml", cursor.position(), e.to_string()))?;
        if let Some(name) = string_pool.get(i) {
            known_resource_ids.push((name.to_string(), id));
        }
    }
    cursor.set_position(map_end as u64);

    let mut events = Vec::new();
    let doc_end = header.chunk_size as usize;
    while (cursor.position() as usize) < doc_end && (cursor.position() as usize) < bytes.len() {
        let ev_start = cursor.position() as usize;
        if ev_start + 8 > bytes.len() {
            break;
        }
        let ev_header = ChunkHeader::read(&mut cursor, "axml event")?;
        let ev_end = ev_start + ev_header.chunk_size as usize;
        if ev_end > bytes.len() {
            return Err(FormatError::parse(
                "axml",
                ev_start as u64,
                "event chunk extends past document bounds",
            ));
        }

        let event = match ev_header.chunk_type {
            t if t == NS_START => parse_namespace_event(&mut cursor, &string_pool, true)?,
            t if t == NS_END => parse_namespace_event(&mut cursor, &string_pool, false)?,
            t if t == EL_START => parse_start_element(&mut cursor, &string_pool, &known_resource_ids)?,
            t if t == EL_END => parse_end_element(&mut cursor, &string_pool)?,
            t if t == CDATA => parse_cdata(&mut cursor, &string_pool)?,
            other => {
                return Err(FormatError::parse(
                    "axml",
                    ev_start as u64,
                    format!("unrecognized event chunk type {other:#06x}"),
                ))
            }
        };
        events.push(event);
        cursor.set_position(ev_end as u64);
    }

    Ok(BinaryXml {
        events,
        known_resource_ids,
        source_encoding: string_pool.encoding(),
    })
}

fn read_u32(cursor: &mut Cur) -> Result<u32> {
    cursor
        .read_u32::<LE>()
        .map_err(|e| FormatError::parse("axml", cursor.position(), e.to_string()))
}

fn read_i32(cursor: &mut Cur) -> Result<i32> {
    cursor
        .read_i32::<LE>()
        .map_err(|e| FormatError::parse("axml", cursor.position(), e.to_string()))
}

fn resolve(pool: &StringPool, idx: u32) -> Result<String> {
    pool.get(idx as usize)
        .map(|s| s.to_string())
        .ok_or_else(|| FormatError::parse("axml", 0, format!("invalid string pool index {idx}")))
}

fn parse_namespace_event(cursor: &mut Cur, pool: &StringPool, is_start: bool) -> Result<Event> {
    let line = read_u32(cursor)?;
    let _comment = read_i32(cursor)?;
    let prefix_idx = read_i32(cursor)?;
    let uri_idx = read_u32(cursor)?;
    let prefix = if prefix_idx == -1 {
        None
    } else {
        Some(resolve(pool, prefix_idx as u32)?)
    };
    let uri = resolve(pool, uri_idx)?;
    let namespace = Namespace { prefix, uri };
    Ok(if is_start {
        Event::StartNamespace { line, namespace }
    } else {
        Event::EndNamespace { line, namespace }
    })
}

fn parse_start_element(
    cursor: &mut Cur,
    pool: &StringPool,
    known_resource_ids: &[(String, u32)],
) -> Result<Event> {
    let line = read_u32(cursor)?;
    let _comment = read_i32(cursor)?;
    let ns_idx = read_i32(cursor)?;
    let namespace = if ns_idx == -1 {
        None
    } else {
        Some(resolve(pool, ns_idx as u32)?)
    };
    let name_idx = read_u32(cursor)?;
    let name = resolve(pool, name_idx)?;

    let magic = read_u32(cursor)?;
    if magic != ATTR_RECORD_MAGIC {
        return Err(FormatError::parse(
            "axml",
            cursor.position(),
            format!("expected attribute header magic {ATTR_RECORD_MAGIC:#010x}, got {magic:#010x}"),
        ));
    }
    let attr_count = cursor
        .read_u16::<LE>()
        .map_err(|e| FormatError::parse("axml", cursor.position(), e.to_string()))?;
    let id_index = index_or_none(cursor.read_u16::<LE>().map_err(|e| FormatError::parse("axml", cursor.position(), e.to_string()))?);
    let class_index = index_or_none(cursor.read_u16::<LE>().map_err(|e| FormatError::parse("axml", cursor.position(), e.to_string()))?);
    let style_index = index_or_none(cursor.read_u16::<LE>().map_err(|e| FormatError::parse("axml", cursor.position(), e.to_string()))?);

    let mut attributes = Vec::with_capacity(attr_count as usize);
    for _ in 0..attr_count {
        attributes.push(parse_attribute(cursor, pool, known_resource_ids)?);
    }

    Ok(Event::StartElement {
        line,
        namespace,
        name,
        attributes,
        id_index,
        class_index,
        style_index,
    })
}

fn index_or_none(raw: u16) -> Option<u32> {
    if raw == 0 {
        None
    } else {
        Some(raw as u32)
    }
}

fn parse_attribute(
    cursor: &mut Cur,
    pool: &StringPool,
    known_resource_ids: &[(String, u32)],
) -> Result<Attribute> {
    let ns_idx = read_i32(cursor)?;
    let namespace = if ns_idx == -1 {
        None
    } else {
        Some(resolve(pool, ns_idx as u32)?)
    };
    let name_idx = read_u32(cursor)?;
    let name = resolve(pool, name_idx)?;
    let resource_id = known_resource_ids.get(name_idx as usize).map(|(_, id)| *id);

    let _raw_idx = read_i32(cursor)?;
    let type_word = read_u32(cursor)?;
    let data = read_u32(cursor)?;
    let data_type = (type_word >> 24) & 0xFF;

    let value = match data_type {
        0x12 => AttributeValue::Boolean(data != 0),
        0x10 => AttributeValue::Integer(data as i32),
        0x11 => AttributeValue::Hex(data),
        0x01 => AttributeValue::Reference(data),
        0x03 => AttributeValue::String(resolve(pool, data)?),
        0x04 => AttributeValue::Float(f32::from_bits(data)),
        other => AttributeValue::Raw {
            data_type: other as u8,
            data,
        },
    };

    Ok(Attribute {
        namespace,
        name,
        resource_id,
        value,
    })
}

fn parse_end_element(cursor: &mut Cur, pool: &StringPool) -> Result<Event> {
    let line = read_u32(cursor)?;
    let _comment = read_i32(cursor)?;
    let ns_idx = read_i32(cursor)?;
    let namespace = if ns_idx == -1 {
        None
    } else {
        Some(resolve(pool, ns_idx as u32)?)
    };
    let name_idx = read_u32(cursor)?;
    let name = resolve(pool, name_idx)?;
    Ok(Event::EndElement {
        line,
        namespace,
        name,
    })
}

fn parse_cdata(cursor: &mut Cur, pool: &StringPool) -> Result<Event> {
    let line = read_u32(cursor)?;
    let _comment = read_i32(cursor)?;
    let data_idx = read_u32(cursor)?;
    let text = resolve(pool, data_idx)?;
    let mut typed_value = [0u8; 8];
    cursor
        .read_exact(&mut typed_value)
        .map_err(|e| FormatError::parse("axml", cursor.position(), e.to_string()))?;
    Ok(Event::CData { line, text })
}
