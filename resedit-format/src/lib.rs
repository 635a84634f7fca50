//! Codecs for the chunked little-endian container formats used by a
//! compiled Android application archive: the string-pool sub-codec shared
//! by both outer formats, the resource-table codec, and the binary-XML
//! codec.
//!
//! Every codec here is a pure `parse`/`emit` pair over in-memory byte
//! slices; none of them touch the filesystem or archive layer directly
//! (see `resedit-archive` for that).

pub mod axml;
mod chunk;
pub mod error;
pub mod resource_table;
pub mod string_pool;

pub use error::{FormatError, Result};
