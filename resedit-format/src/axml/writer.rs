use std::collections::HashMap;
use std::io::Write;

use byteorder::{WriteBytesExt, LE};

use crate::chunk::ChunkHeader;
use crate::error::{FormatError, Result};
use crate::string_pool::{Encoding, StringPool};

use super::{Attribute, AttributeValue, BinaryXml, Event};

const XML_TYPE: u16 = 0x0003;
const RES_MAP_TYPE: u16 = 0x0180;
const NS_START: u16 = 0x0100;
const NS_END: u16 = 0x0101;
const EL_START: u16 = 0x0102;
const EL_END: u16 = 0x0103;
const CDATA: u16 = 0x0104;
const ELEMENT_HEADER_SIZE: u16 = 16;
const ATTR_RECORD_MAGIC: u32 = 0x0014_0014;

struct Interner {
    index_of: HashMap<String, u32>,
    strings: Vec<String>,
}

impl Interner {
    fn new() -> Self {
        Self {
            index_of: HashMap::new(),
            strings: Vec::new(),
        }
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&idx) = self.index_of.get(s) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.index_of.insert(s.to_string(), idx);
        idx
    }
}

pub(super) fn emit(doc: &BinaryXml) -> Result<Vec<u8>> {
    // Pass 1: collect the resource-id map in first-encounter order so its
    // entries can be interned first, keeping the resource-id-map prefix
    // aligned with the string pool (the invariant `mbf-axml::prepare_res_map`
    // exists to uphold).
    let mut res_id_of_name: HashMap<String, u32> = HashMap::new();
    let mut res_map_order: Vec<(String, u32)> = Vec::new();
    for event in &doc.events {
        if let Event::StartElement { attributes, .. } = event {
            for attr in attributes {
                if let Some(res_id) = attr.resource_id {
                    match res_id_of_name.get(&attr.name) {
                        Some(&existing) if existing == res_id => {}
                        Some(&existing) => {
                            return Err(FormatError::parse(
                                "axml",
                                0,
                                format!(
                                    "attribute {} has conflicting resource ids {existing:#x} and {res_id:#x}",
                                    attr.name
                                ),
                            ))
                        }
                        None => {
                            res_id_of_name.insert(attr.name.clone(), res_id);
                            res_map_order.push((attr.name.clone(), res_id));
                        }
                    }
                }
            }
        }
    }

    let mut interner = Interner::new();
    for (name, _) in &res_map_order {
        interner.intern(name);
    }

    let mut main = Vec::new();
    for event in &doc.events {
        write_event(&mut main, event, &mut interner)?;
    }

    let string_pool_bytes = build_string_pool(&interner.strings, doc.source_encoding)?;

    let res_map_chunk_size = 8 + res_map_order.len() as u32 * 4;
    let total = 8 + string_pool_bytes.len() as u32 + res_map_chunk_size + main.len() as u32;

    let mut out = Vec::with_capacity(total as usize);
    ChunkHeader {
        chunk_type: XML_TYPE,
        header_size: 8,
        chunk_size: total,
    }
    .write(&mut out, "axml")?;

    out.write_all(&string_pool_bytes).map_err(io_err)?;

    ChunkHeader {
        chunk_type: RES_MAP_TYPE,
        header_size: 8,
        chunk_size: res_map_chunk_size,
    }
    .write(&mut out, "axml")?;
    for (_, id) in &res_map_order {
        out.write_u32::<LE>(*id).map_err(io_err)?;
    }

    out.write_all(&main).map_err(io_err)?;

    if out.len() as u32 != total {
        return Err(FormatError::Emit {
            expected_size: total as usize,
            actual_size: out.len(),
        });
    }
    Ok(out)
}

fn build_string_pool(strings: &[String], preferred: Encoding) -> Result<Vec<u8>> {
    for encoding in [preferred, Encoding::Utf16Le, Encoding::ModifiedUtf8] {
        let mut pool = StringPool::new(encoding);
        for s in strings {
            pool.push(s.clone());
        }
        let mut out = Vec::new();
        match pool.emit(&mut out) {
            Ok(()) => return Ok(out),
            Err(FormatError::SizeOverflow) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(FormatError::SizeOverflow)
}

fn write_event(out: &mut Vec<u8>, event: &Event, interner: &mut Interner) -> Result<()> {
    match event {
        Event::StartNamespace { line, namespace } => {
            write_ns_event(out, NS_START, *line, namespace.prefix.as_deref(), &namespace.uri, interner)
        }
        Event::EndNamespace { line, namespace } => {
            write_ns_event(out, NS_END, *line, namespace.prefix.as_deref(), &namespace.uri, interner)
        }
        Event::StartElement {
            line,
            namespace,
            name,
            attributes,
            id_index,
            class_index,
            style_index,
        } => write_start_element(
            out,
            *line,
            namespace.as_deref(),
            name,
            attributes,
            *id_index,
            *class_index,
            *style_index,
            interner,
        ),
        Event::EndElement {
            line,
            namespace,
            name,
        } => write_end_element(out, *line, namespace.as_deref(), name, interner),
        Event::CData { line, text } => write_cdata(out, *line, text, interner),
    }
}

fn write_ns_event(
    out: &mut Vec<u8>,
    chunk_type: u16,
    line: u32,
    prefix: Option<&str>,
    uri: &str,
    interner: &mut Interner,
) -> Result<()> {
    ChunkHeader {
        chunk_type,
        header_size: ELEMENT_HEADER_SIZE,
        chunk_size: 32,
    }
    .write(&mut *out, "axml")?;
    out.write_u32::<LE>(line).map_err(io_err)?;
    out.write_i32::<LE>(-1).map_err(io_err)?;
    let prefix_idx = prefix.map(|p| interner.intern(p)).unwrap_or(0xFFFF_FFFF);
    out.write_u32::<LE>(prefix_idx).map_err(io_err)?;
    let uri_idx = interner.intern(uri);
    out.write_u32::<LE>(uri_idx).map_err(io_err)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_start_element(
    out: &mut Vec<u8>,
    line: u32,
    namespace: Option<&str>,
    name: &str,
    attributes: &[Attribute],
    id_index: Option<u32>,
    class_index: Option<u32>,
    style_index: Option<u32>,
    interner: &mut Interner,
) -> Result<()> {
    let ns_idx = namespace.map(|n| interner.intern(n));
    let name_idx = interner.intern(name);

    struct Resolved {
        original_index: usize,
        ns_idx: Option<u32>,
        name_idx: u32,
        resource_id: Option<u32>,
        raw_idx: i32,
        value_type: u32,
        data: u32,
    }

    let mut resolved: Vec<Resolved> = attributes
        .iter()
        .enumerate()
        .map(|(original_index, attr)| {
            let attr_ns_idx = attr.namespace.as_deref().map(|n| interner.intern(n));
            let attr_name_idx = interner.intern(&attr.name);
            let (raw_idx, value_type, data) = match &attr.value {
                AttributeValue::Boolean(true) => (-1, type_word(0x12), 0xFFFF_FFFF),
                AttributeValue::Boolean(false) => (-1, type_word(0x12), 0),
                AttributeValue::Integer(i) => (-1, type_word(0x10), *i as u32),
                AttributeValue::Hex(h) => (-1, type_word(0x11), *h),
                AttributeValue::Reference(r) => (-1, type_word(0x01), *r),
                AttributeValue::Float(f) => (-1, type_word(0x04), f.to_bits()),
                AttributeValue::String(s) => {
                    let idx = interner.intern(s);
                    (idx as i32, type_word(0x03), idx)
                }
                AttributeValue::Raw { data_type, data } => (-1, type_word(*data_type as u32), *data),
            };
            Resolved {
                original_index,
                ns_idx: attr_ns_idx,
                name_idx: attr_name_idx,
                resource_id: attr.resource_id,
                raw_idx,
                value_type,
                data,
            }
        })
        .collect();

    // Attribute-record ordering: by resource-id, then by name-string, then by namespace-string.
    resolved.sort_by_key(|r| (r.resource_id, r.name_idx, r.ns_idx));

    // id/class/style index fields point at positions in this post-sort order,
    // not the order attributes were supplied in, so re-resolve them here.
    let resolve_fast_path = |original: Option<u32>| -> u16 {
        match original {
            None => 0,
            Some(one_based) => {
                let original_index = (one_based - 1) as usize;
                resolved
                    .iter()
                    .position(|r| r.original_index == original_index)
                    .map(|pos| (pos + 1) as u16)
                    .unwrap_or(0)
            }
        }
    };
    let id_index = resolve_fast_path(id_index);
    let class_index = resolve_fast_path(class_index);
    let style_index = resolve_fast_path(style_index);

    let chunk_size = ELEMENT_HEADER_SIZE as u32 + 28 + 20 * resolved.len() as u32;
    ChunkHeader {
        chunk_type: EL_START,
        header_size: ELEMENT_HEADER_SIZE,
        chunk_size,
    }
    .write(&mut *out, "axml")?;

    out.write_u32::<LE>(line).map_err(io_err)?;
    out.write_i32::<LE>(-1).map_err(io_err)?;
    out.write_i32::<LE>(ns_idx.map(|i| i as i32).unwrap_or(-1)).map_err(io_err)?;
    out.write_u32::<LE>(name_idx).map_err(io_err)?;
    out.write_u32::<LE>(ATTR_RECORD_MAGIC).map_err(io_err)?;
    out.write_u16::<LE>(resolved.len() as u16).map_err(io_err)?;
    out.write_u16::<LE>(id_index).map_err(io_err)?;
    out.write_u16::<LE>(class_index).map_err(io_err)?;
    out.write_u16::<LE>(style_index).map_err(io_err)?;

    for r in &resolved {
        out.write_i32::<LE>(r.ns_idx.map(|i| i as i32).unwrap_or(-1)).map_err(io_err)?;
        out.write_u32::<LE>(r.name_idx).map_err(io_err)?;
        out.write_i32::<LE>(r.raw_idx).map_err(io_err)?;
        out.write_u32::<LE>(r.value_type).map_err(io_err)?;
        out.write_u32::<LE>(r.data).map_err(io_err)?;
    }
    Ok(())
}

fn write_end_element(
    out: &mut Vec<u8>,
    line: u32,
    namespace: Option<&str>,
    name: &str,
    interner: &mut Interner,
) -> Result<()> {
    ChunkHeader {
        chunk_type: EL_END,
        header_size: ELEMENT_HEADER_SIZE,
        chunk_size: 32,
    }
    .write(&mut *out, "axml")?;
    out.write_u32::<LE>(line).map_err(io_err)?;
    out.write_i32::<LE>(-1).map_err(io_err)?;
    let ns_idx = namespace.map(|n| interner.intern(n));
    out.write_i32::<LE>(ns_idx.map(|i| i as i32).unwrap_or(-1)).map_err(io_err)?;
    let name_idx = interner.intern(name);
    out.write_u32::<LE>(name_idx).map_err(io_err)?;
    Ok(())
}

fn write_cdata(out: &mut Vec<u8>, line: u32, text: &str, interner: &mut Interner) -> Result<()> {
    ChunkHeader {
        chunk_type: CDATA,
        header_size: ELEMENT_HEADER_SIZE,
        chunk_size: 36,
    }
    .write(&mut *out, "axml")?;
    out.write_u32::<LE>(line).map_err(io_err)?;
    out.write_i32::<LE>(-1).map_err(io_err)?;
    let idx = interner.intern(text);
    out.write_u32::<LE>(idx).map_err(io_err)?;
    // Trailing typed-value record (size=8, res0=0, type=String, data=idx);
    // CDATA text is always represented as a pooled string.
    out.write_u32::<LE>(type_word(0x03)).map_err(io_err)?;
    out.write_u32::<LE>(idx).map_err(io_err)?;
    Ok(())
}

fn type_word(basic_type: u32) -> u32 {
    (basic_type << 24) | 0x0000_0008
}

fn io_err(e: std::io::Error) -> FormatError {
    FormatError::parse("axml", 0, e.to_string())
}
