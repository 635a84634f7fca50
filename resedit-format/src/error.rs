use thiserror::Error;

/// Errors raised by the string-pool, resource-table and binary-XML codecs.
///
/// Parse/emit failures that abort the affected entry carry enough context
/// (region, byte position) to be surfaced directly in a [`crate::ReplacementReport`]-style
/// diagnostic without re-deriving it from a wrapped `anyhow::Error`.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("parse error in {region}: {reason} (at byte offset {position})")]
    Parse {
        region: &'static str,
        position: u64,
        reason: String,
    },

    #[error("emit size mismatch: expected {expected_size} bytes, wrote {actual_size}")]
    Emit {
        expected_size: usize,
        actual_size: usize,
    },

    #[error("could not encode string at index {index} for {target_encoding}: {cause}")]
    Encoding {
        index: usize,
        target_encoding: &'static str,
        cause: String,
    },

    #[error("chunk size overflowed during emit")]
    SizeOverflow,

    #[error("integrity check failed after emit: {invariant}")]
    Integrity { invariant: String },
}

impl FormatError {
    pub fn parse(region: &'static str, position: u64, reason: impl Into<String>) -> Self {
        FormatError::Parse {
            region,
            position,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FormatError>;
