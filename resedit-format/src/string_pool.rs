//! The string-pool sub-codec shared by the resource-table and binary-XML
//! chunk formats: an indexed, dual-encoded array of strings with an
//! optional style-span section.
//!
//! Layout (little-endian), mirrors the `ResStringPool` chunk used by both
//! container formats this crate parses:
//!
//! ```text
//! chunk header: type=0x0001, header_size=28, chunk_size
//! string_count, style_count, flags, strings_start, styles_start
//! string_count x u32 string offsets
//! style_count x u32 style offsets
//! <strings area><styles area><padding to 4 bytes>
//! ```

use std::io::Write;

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::error::{FormatError, Result};

const CHUNK_TYPE: u32 = 0x0001;
const HEADER_SIZE: u16 = 28;
const UTF8_FLAG: u32 = 0x100;
const SORTED_FLAG: u32 = 0x1;
const MAX_STRING_COUNT: u32 = 1_000_000;

/// How strict the string-pool decoder is about length-field/content mismatches.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    Strict,
    Lenient,
    Warn,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Encoding {
    ModifiedUtf8,
    Utf16Le,
}

/// A single string's style spans: `(name_string_index, first_char, last_char)`
/// triples, in source order, terminated implicitly (no explicit END marker
/// stored here - `emit` re-adds it).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct StyleSpans(pub Vec<(u32, u32, u32)>);

#[derive(Clone, Debug)]
pub struct StringPool {
    strings: Vec<String>,
    encoding: Encoding,
    sorted: bool,
    /// `styles[i]` corresponds to `strings[i]`; absent if there is no style section at all.
    styles: Option<Vec<StyleSpans>>,
    validation: Vec<String>,
}

impl StringPool {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            strings: Vec::new(),
            encoding,
            sorted: false,
            styles: None,
            validation: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn sorted(&self) -> bool {
        self.sorted
    }

    /// Warnings accumulated while parsing under `ValidationMode::Warn`.
    pub fn warnings(&self) -> &[String] {
        &self.validation
    }

    /// Appends a string, returning its (stable) index.
    pub fn push(&mut self, value: impl Into<String>) -> u32 {
        self.strings.push(value.into());
        if let Some(styles) = &mut self.styles {
            styles.push(StyleSpans::default());
        }
        (self.strings.len() - 1) as u32
    }

    /// Replaces the string at `index` in place. The pool's length and the
    /// stability of every other index are preserved.
    pub fn set(&mut self, index: usize, new_value: impl Into<String>) -> Result<()> {
        let slot = self
            .strings
            .get_mut(index)
            .ok_or_else(|| FormatError::parse("string_pool", 0, format!("no string at index {index}")))?;
        *slot = new_value.into();
        Ok(())
    }

    pub fn parse(bytes: &[u8], mode: ValidationMode) -> Result<Self> {
        let mut cursor = std::io::Cursor::new(bytes);
        let chunk_type = cursor
            .read_u16::<LE>()
            .map_err(|e| FormatError::parse("string_pool", 0, e.to_string()))?;
        let header_size = cursor
            .read_u16::<LE>()
            .map_err(|e| FormatError::parse("string_pool", 2, e.to_string()))?;
        let _chunk_size = cursor
            .read_u32::<LE>()
            .map_err(|e| FormatError::parse("string_pool", 4, e.to_string()))?;

        if chunk_type as u32 != CHUNK_TYPE {
            return Err(FormatError::parse(
                "string_pool",
                0,
                format!("expected chunk type 0x0001, got {chunk_type:#06x}"),
            ));
        }
        if header_size != HEADER_SIZE {
            return Err(FormatError::parse(
                "string_pool",
                2,
                format!("expected header_size 28, got {header_size}"),
            ));
        }

        let string_count = read_u32(&mut cursor, "string_count")?;
        let style_count = read_u32(&mut cursor, "style_count")?;
        let flags = read_u32(&mut cursor, "flags")?;
        let strings_start = read_u32(&mut cursor, "strings_start")?;
        let styles_start = read_u32(&mut cursor, "styles_start")?;

        if string_count > MAX_STRING_COUNT || style_count > MAX_STRING_COUNT {
            return Err(FormatError::parse(
                "string_pool",
                cursor.position(),
                "string/style count exceeds sanity limit",
            ));
        }

        let is_utf8 = flags & UTF8_FLAG != 0;
        let sorted = flags & SORTED_FLAG != 0;

        let mut string_offsets = Vec::with_capacity(string_count as usize);
        for _ in 0..string_count {
            string_offsets.push(read_u32(&mut cursor, "string offset")?);
        }
        let mut style_offsets = Vec::with_capacity(style_count as usize);
        for _ in 0..style_count {
            style_offsets.push(read_u32(&mut cursor, "style offset")?);
        }

        if (strings_start as usize) > bytes.len() {
            return Err(FormatError::parse(
                "string_pool",
                cursor.position(),
                "strings_start out of bounds",
            ));
        }

        let mut strings = Vec::with_capacity(string_count as usize);
        let mut warnings = Vec::new();
        for (i, offset) in string_offsets.iter().enumerate() {
            let start = strings_start as usize + *offset as usize;
            if start > bytes.len() {
                return Err(FormatError::parse(
                    "string_pool",
                    start as u64,
                    format!("string {i} offset out of bounds"),
                ));
            }
            let (value, consumed_warning) = if is_utf8 {
                decode_one_mutf8(&bytes[start..], mode, i)?
            } else {
                decode_one_utf16(&bytes[start..], mode, i)?
            };
            if let Some(w) = consumed_warning {
                warnings.push(w);
            }
            strings.push(value);
        }

        let styles = if style_count > 0 {
            let mut out = Vec::with_capacity(string_count as usize);
            for offset in &style_offsets {
                let start = styles_start as usize + *offset as usize;
                out.push(parse_style_spans(bytes, start)?);
            }
            // Style offsets are parallel to a prefix of strings; pad the rest empty.
            while out.len() < strings.len() {
                out.push(StyleSpans::default());
            }
            Some(out)
        } else {
            None
        };

        Ok(Self {
            strings,
            encoding: if is_utf8 {
                Encoding::ModifiedUtf8
            } else {
                Encoding::Utf16Le
            },
            sorted,
            styles,
            validation: warnings,
        })
    }

    /// Exact length, in bytes, `emit` will write for the current content.
    pub fn size_bytes(&self) -> usize {
        let header = 4 + 20; // chunk header (4: type+header_size as u16 pair, then chunk_size u32) + 5 u32 fields
        let offsets = self.strings.len() * 4;
        let style_offsets = self.styles.as_ref().map(|s| s.len() * 4).unwrap_or(0);

        let strings_len: usize = self
            .strings
            .iter()
            .map(|s| encoded_len(s, self.encoding))
            .sum();

        let styles_len: usize = self
            .styles
            .as_ref()
            .map(|styles| styles.iter().map(style_spans_len).sum())
            .unwrap_or(0);

        let unpadded = header + offsets + style_offsets + strings_len + styles_len;
        round_up_4(unpadded)
    }

    pub fn emit(&self, sink: &mut impl Write) -> Result<()> {
        let total = self.size_bytes();
        sink.write_u16::<LE>(CHUNK_TYPE as u16)
            .map_err(io_err)?;
        sink.write_u16::<LE>(HEADER_SIZE).map_err(io_err)?;
        sink.write_u32::<LE>(total as u32).map_err(io_err)?;

        let mut flags = 0u32;
        if self.encoding == Encoding::ModifiedUtf8 {
            flags |= UTF8_FLAG;
        }
        if self.sorted {
            flags |= SORTED_FLAG;
        }

        let offsets_len = self.strings.len() * 4;
        let style_offsets_len = self.styles.as_ref().map(|s| s.len() * 4).unwrap_or(0);
        let strings_start = 20 + offsets_len + style_offsets_len;

        let encoded: Vec<Vec<u8>> = self
            .strings
            .iter()
            .map(|s| encode_one(s, self.encoding))
            .collect::<Result<_>>()?;

        let styles_area: Option<Vec<Vec<u8>>> = self
            .styles
            .as_ref()
            .map(|styles| styles.iter().map(encode_style_spans).collect());

        let strings_area_len: usize = encoded.iter().map(|b| b.len()).sum();
        let styles_start = strings_start + strings_area_len;

        sink.write_u32::<LE>(self.strings.len() as u32)
            .map_err(io_err)?;
        sink.write_u32::<LE>(self.styles.as_ref().map(|s| s.len()).unwrap_or(0) as u32)
            .map_err(io_err)?;
        sink.write_u32::<LE>(flags).map_err(io_err)?;
        sink.write_u32::<LE>(strings_start as u32).map_err(io_err)?;
        sink.write_u32::<LE>(styles_start as u32).map_err(io_err)?;

        let mut running = 0u32;
        for chunk in &encoded {
            sink.write_u32::<LE>(running).map_err(io_err)?;
            running += chunk.len() as u32;
        }

        if let Some(areas) = &styles_area {
            let mut running = 0u32;
            for chunk in areas {
                sink.write_u32::<LE>(running).map_err(io_err)?;
                running += chunk.len() as u32;
            }
        }

        for chunk in &encoded {
            sink.write_all(chunk).map_err(io_err)?;
        }
        if let Some(areas) = &styles_area {
            for chunk in areas {
                sink.write_all(chunk).map_err(io_err)?;
            }
        }

        let written_before_padding = strings_start + strings_area_len + styles_area.as_ref().map(|a| a.iter().map(|c| c.len()).sum()).unwrap_or(0);
        let padded = round_up_4(written_before_padding);
        for _ in 0..(padded - written_before_padding) {
            sink.write_u8(0).map_err(io_err)?;
        }

        if padded != total {
            return Err(FormatError::Emit {
                expected_size: total,
                actual_size: padded,
            });
        }

        Ok(())
    }
}

fn io_err(e: std::io::Error) -> FormatError {
    FormatError::parse("string_pool", 0, e.to_string())
}

fn read_u32(cursor: &mut std::io::Cursor<&[u8]>, field: &str) -> Result<u32> {
    cursor
        .read_u32::<LE>()
        .map_err(|e| FormatError::parse("string_pool", cursor.position(), format!("{field}: {e}")))
}

fn round_up_4(n: usize) -> usize {
    (n + 3) & !3
}

fn encoded_len(s: &str, encoding: Encoding) -> usize {
    match encoding {
        Encoding::ModifiedUtf8 => mutf8_len(s),
        Encoding::Utf16Le => utf16_len(s),
    }
}

// --- modified UTF-8 -------------------------------------------------------

fn mutf8_char_and_byte_counts(s: &str) -> (usize, usize) {
    let mut chars = 0usize;
    let mut bytes = 0usize;
    for c in s.chars() {
        if c == '\0' {
            chars += 1;
            bytes += 2;
        } else if (c as u32) > 0xFFFF {
            chars += 2;
            bytes += 6;
        } else {
            chars += 1;
            bytes += c.len_utf8();
        }
    }
    (chars, bytes)
}

fn varint_len(value: usize) -> usize {
    if value > 0x7F {
        2
    } else {
        1
    }
}

fn mutf8_len(s: &str) -> usize {
    let (chars, bytes) = mutf8_char_and_byte_counts(s);
    varint_len(chars) + varint_len(bytes) + bytes + 1 // + trailing NUL
}

fn encode_one(s: &str, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::ModifiedUtf8 => encode_mutf8(s),
        Encoding::Utf16Le => encode_utf16(s),
    }
}

fn write_varint(out: &mut Vec<u8>, value: usize, is_16bit: bool) -> Result<()> {
    if is_16bit {
        if value > 0x7FFF_FFFF {
            return Err(FormatError::SizeOverflow);
        }
        if value > 0x7FFF {
            let high = ((value >> 16) as u16) | 0x8000;
            let low = (value & 0xFFFF) as u16;
            out.extend_from_slice(&high.to_le_bytes());
            out.extend_from_slice(&low.to_le_bytes());
        } else {
            out.extend_from_slice(&(value as u16).to_le_bytes());
        }
    } else {
        if value > 0x7FFF {
            return Err(FormatError::SizeOverflow);
        }
        if value > 0x7F {
            out.push((((value | 0x8000) >> 8) & 0xFF) as u8);
            out.push((value & 0xFF) as u8);
        } else {
            out.push(value as u8);
        }
    }
    Ok(())
}

fn encode_mutf8(s: &str) -> Result<Vec<u8>> {
    let (chars, bytes) = mutf8_char_and_byte_counts(s);
    let mut out = Vec::with_capacity(2 + 2 + bytes + 1);
    write_varint(&mut out, chars, false)?;
    write_varint(&mut out, bytes, false)?;

    for c in s.chars() {
        if c == '\0' {
            out.push(0xC0);
            out.push(0x80);
        } else if (c as u32) > 0xFFFF {
            let v = c as u32 - 0x10000;
            let high = 0xD800 + (v >> 10);
            let low = 0xDC00 + (v & 0x3FF);
            push_cesu8_surrogate(&mut out, high);
            push_cesu8_surrogate(&mut out, low);
        } else {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
    out.push(0x00);
    Ok(out)
}

fn push_cesu8_surrogate(out: &mut Vec<u8>, half: u32) {
    out.push(0xE0 | ((half >> 12) & 0x0F) as u8);
    out.push(0x80 | ((half >> 6) & 0x3F) as u8);
    out.push(0x80 | (half & 0x3F) as u8);
}

/// Decodes a single modified-UTF-8 string item starting at `data[0]`.
/// Returns `(value, optional warning)`.
fn decode_one_mutf8(
    data: &[u8],
    mode: ValidationMode,
    index: usize,
) -> Result<(String, Option<String>)> {
    let (char_len, n1) = read_varint(data, false)?;
    let (byte_len, n2) = read_varint(&data[n1..], false)?;
    let start = n1 + n2;
    if start + byte_len > data.len() {
        return Err(FormatError::parse(
            "string_pool",
            0,
            format!("string {index} byte length runs past end of strings area"),
        ));
    }
    let raw = &data[start..start + byte_len];
    let (decoded, actual_chars) = decode_mutf8_bytes(raw, mode, index)?;

    let mut warning = None;
    if actual_chars != char_len {
        let msg = format!(
            "string {index}: declared char_len {char_len} does not match decoded length {actual_chars}"
        );
        match mode {
            ValidationMode::Strict => {
                return Err(FormatError::parse("string_pool", start as u64, msg))
            }
            ValidationMode::Warn => warning = Some(msg),
            ValidationMode::Lenient => {}
        }
    }

    Ok((decoded, warning))
}

fn read_varint(data: &[u8], is_16bit: bool) -> Result<(usize, usize)> {
    if is_16bit {
        if data.len() < 2 {
            return Err(FormatError::parse("string_pool", 0, "truncated utf16 length"));
        }
        let first = u16::from_le_bytes([data[0], data[1]]);
        if first & 0x8000 != 0 {
            if data.len() < 4 {
                return Err(FormatError::parse("string_pool", 0, "truncated utf16 length"));
            }
            let second = u16::from_le_bytes([data[2], data[3]]);
            let value = (((first & 0x7FFF) as usize) << 16) | second as usize;
            Ok((value, 4))
        } else {
            Ok((first as usize, 2))
        }
    } else {
        if data.is_empty() {
            return Err(FormatError::parse("string_pool", 0, "truncated utf8 length"));
        }
        let first = data[0];
        if first & 0x80 != 0 {
            if data.len() < 2 {
                return Err(FormatError::parse("string_pool", 0, "truncated utf8 length"));
            }
            let value = (((first & 0x7F) as usize) << 8) | data[1] as usize;
            Ok((value, 2))
        } else {
            Ok((first as usize, 1))
        }
    }
}

fn decode_mutf8_bytes(raw: &[u8], mode: ValidationMode, index: usize) -> Result<(String, usize)> {
    let mut out = String::new();
    let mut chars = 0usize;
    let mut i = 0usize;
    while i < raw.len() {
        let b0 = raw[i];
        if b0 == 0xC0 && raw.get(i + 1) == Some(&0x80) {
            out.push('\0');
            chars += 1;
            i += 2;
            continue;
        }
        if b0 & 0x80 == 0 {
            out.push(b0 as char);
            chars += 1;
            i += 1;
            continue;
        }
        if b0 & 0xE0 == 0xC0 {
            if i + 1 >= raw.len() {
                return mutf8_decode_error(mode, index, i, "truncated 2-byte sequence");
            }
            let cp = ((b0 as u32 & 0x1F) << 6) | (raw[i + 1] as u32 & 0x3F);
            match char::from_u32(cp) {
                Some(c) => out.push(c),
                None => return mutf8_decode_error(mode, index, i, "invalid 2-byte sequence"),
            }
            chars += 1;
            i += 2;
            continue;
        }
        if b0 & 0xF0 == 0xE0 {
            if i + 2 >= raw.len() {
                return mutf8_decode_error(mode, index, i, "truncated 3-byte sequence");
            }
            let unit = ((b0 as u32 & 0x0F) << 12)
                | ((raw[i + 1] as u32 & 0x3F) << 6)
                | (raw[i + 2] as u32 & 0x3F);
            i += 3;
            if (0xD800..=0xDBFF).contains(&unit) {
                // high surrogate: expect a following low surrogate 3-byte sequence
                if i + 2 < raw.len() && raw[i] & 0xF0 == 0xE0 {
                    let low = ((raw[i] as u32 & 0x0F) << 12)
                        | ((raw[i + 1] as u32 & 0x3F) << 6)
                        | (raw[i + 2] as u32 & 0x3F);
                    if (0xDC00..=0xDFFF).contains(&low) {
                        let cp = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                        match char::from_u32(cp) {
                            Some(c) => out.push(c),
                            None => return mutf8_decode_error(mode, index, i, "invalid surrogate pair"),
                        }
                        chars += 2;
                        i += 3;
                        continue;
                    }
                }
                return mutf8_decode_error(mode, index, i, "unpaired high surrogate");
            }
            match char::from_u32(unit) {
                Some(c) => out.push(c),
                None => return mutf8_decode_error(mode, index, i, "invalid 3-byte sequence"),
            }
            chars += 1;
            continue;
        }
        return mutf8_decode_error(mode, index, i, "unsupported lead byte");
    }
    Ok((out, chars))
}

fn mutf8_decode_error(
    mode: ValidationMode,
    index: usize,
    position: usize,
    reason: &str,
) -> Result<(String, usize)> {
    match mode {
        ValidationMode::Strict => Err(FormatError::Encoding {
            index,
            target_encoding: "modified-utf8",
            cause: format!("{reason} at byte {position}"),
        }),
        ValidationMode::Lenient | ValidationMode::Warn => {
            Ok((String::from('\u{FFFD}'), 1))
        }
    }
}

// --- UTF-16LE --------------------------------------------------------------

fn utf16_len(s: &str) -> usize {
    let units: usize = s.encode_utf16().count();
    varint_len_16(units) + units * 2 + 2 // + trailing 0x0000
}

fn varint_len_16(units: usize) -> usize {
    if units > 0x7FFF {
        4
    } else {
        2
    }
}

fn encode_utf16(s: &str) -> Result<Vec<u8>> {
    let units: Vec<u16> = s.encode_utf16().collect();
    let mut out = Vec::with_capacity(4 + units.len() * 2 + 2);
    write_varint(&mut out, units.len(), true)?;
    for u in units {
        out.extend_from_slice(&u.to_le_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    Ok(out)
}

fn decode_one_utf16(
    data: &[u8],
    mode: ValidationMode,
    index: usize,
) -> Result<(String, Option<String>)> {
    let (len, consumed) = read_varint(data, true)?;
    let start = consumed;
    if start + len * 2 > data.len() {
        return Err(FormatError::parse(
            "string_pool",
            0,
            format!("string {index} utf16 length runs past end of strings area"),
        ));
    }
    let mut units = Vec::with_capacity(len);
    for i in 0..len {
        units.push(u16::from_le_bytes([data[start + i * 2], data[start + i * 2 + 1]]));
    }

    let mut warning = None;
    let decoded: String = char::decode_utf16(units.into_iter())
        .map(|r| match r {
            Ok(c) => c,
            Err(_) => {
                if mode == ValidationMode::Strict {
                    // Caller can't early-return from inside map; flag via sentinel and re-check below.
                    '\u{FFFD}'
                } else {
                    '\u{FFFD}'
                }
            }
        })
        .collect();

    if decoded.chars().any(|c| c == '\u{FFFD}') && mode != ValidationMode::Lenient {
        let msg = format!("string {index}: lone surrogate replaced with U+FFFD");
        if mode == ValidationMode::Strict {
            return Err(FormatError::Encoding {
                index,
                target_encoding: "utf-16le",
                cause: msg,
            });
        }
        warning = Some(msg);
    }

    Ok((decoded, warning))
}

// --- style spans -------------------------------------------------------

const STYLE_SPAN_END: u32 = 0xFFFFFFFF;

fn parse_style_spans(bytes: &[u8], start: usize) -> Result<StyleSpans> {
    let mut spans = Vec::new();
    let mut pos = start;
    loop {
        if pos + 4 > bytes.len() {
            break;
        }
        let name_ref = u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap());
        if name_ref == STYLE_SPAN_END {
            break;
        }
        if pos + 12 > bytes.len() {
            return Err(FormatError::parse("string_pool", pos as u64, "truncated style span"));
        }
        let first = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap());
        let last = u32::from_le_bytes(bytes[pos + 8..pos + 12].try_into().unwrap());
        spans.push((name_ref, first, last));
        pos += 12;
    }
    Ok(StyleSpans(spans))
}

fn style_spans_len(spans: &StyleSpans) -> usize {
    spans.0.len() * 12 + 4 // + END marker
}

fn encode_style_spans(spans: &StyleSpans) -> Vec<u8> {
    let mut out = Vec::with_capacity(style_spans_len(spans));
    for (name_ref, first, last) in &spans.0 {
        out.extend_from_slice(&name_ref.to_le_bytes());
        out.extend_from_slice(&first.to_le_bytes());
        out.extend_from_slice(&last.to_le_bytes());
    }
    out.extend_from_slice(&STYLE_SPAN_END.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn build_utf8_pool(strings: &[&str]) -> Vec<u8> {
        let mut pool = StringPool::new(Encoding::ModifiedUtf8);
        for s in strings {
            pool.push(*s);
        }
        let mut out = Vec::new();
        pool.emit(&mut out).unwrap();
        out
    }

    fn build_utf16_pool(strings: &[&str]) -> Vec<u8> {
        let mut pool = StringPool::new(Encoding::Utf16Le);
        for s in strings {
            pool.push(*s);
        }
        let mut out = Vec::new();
        pool.emit(&mut out).unwrap();
        out
    }

    #[test]
    fn round_trips_utf8() {
        let bytes = build_utf8_pool(&["hello", "world", ""]);
        let pool = StringPool::parse(&bytes, ValidationMode::Strict).unwrap();
        assert_eq!(pool.strings(), &["hello", "world", ""]);
        assert_eq!(pool.encoding(), Encoding::ModifiedUtf8);
    }

    #[test]
    fn round_trips_utf16() {
        let bytes = build_utf16_pool(&["hello", "world"]);
        let pool = StringPool::parse(&bytes, ValidationMode::Strict).unwrap();
        assert_eq!(pool.strings(), &["hello", "world"]);
        assert_eq!(pool.encoding(), Encoding::Utf16Le);
    }

    #[test]
    fn handles_nul_and_supplementary() {
        let s = "a\u{0}b\u{1F600}c";
        let bytes = build_utf8_pool(&[s]);
        let pool = StringPool::parse(&bytes, ValidationMode::Strict).unwrap();
        assert_eq!(pool.get(0).unwrap(), s);
    }

    #[test]
    fn set_preserves_length() {
        let mut pool = StringPool::new(Encoding::ModifiedUtf8);
        pool.push("a");
        pool.push("b");
        pool.set(0, "replaced").unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(0).unwrap(), "replaced");
        assert_eq!(pool.get(1).unwrap(), "b");
    }

    #[test]
    fn size_bytes_matches_emit_length() {
        let mut pool = StringPool::new(Encoding::ModifiedUtf8);
        pool.push("com.example.Foo");
        pool.push("z.q.Foo");
        let mut out = Vec::new();
        pool.emit(&mut out).unwrap();
        assert_eq!(pool.size_bytes(), out.len());
    }

    #[test]
    fn rejects_bad_chunk_type() {
        let mut out = Vec::new();
        out.write_u16::<LE>(0x0002).unwrap();
        out.write_u16::<LE>(28).unwrap();
        out.write_u32::<LE>(28).unwrap();
        out.write_u32::<LE>(0).unwrap();
        out.write_u32::<LE>(0).unwrap();
        out.write_u32::<LE>(0).unwrap();
        out.write_u32::<LE>(20).unwrap();
        out.write_u32::<LE>(20).unwrap();

        assert!(StringPool::parse(&out, ValidationMode::Strict).is_err());
    }

    #[test]
    fn emit_is_idempotent() {
        let mut pool = StringPool::new(Encoding::ModifiedUtf8);
        pool.push("a.b.C");
        let mut first = Vec::new();
        pool.emit(&mut first).unwrap();
        let mut second = Vec::new();
        pool.emit(&mut second).unwrap();
        assert_eq!(first, second);
    }
}
