use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("parse error in {region} at {position}: {reason}")]
    ParseError { region: String, position: u64, reason: String },

    #[error("emit error: expected {expected_size} bytes, got {actual_size}")]
    EmitError { expected_size: usize, actual_size: usize },

    #[error("encoding error for string {index}: cannot represent {value:?} as {target_encoding}")]
    EncodingError { index: usize, value: String, target_encoding: String },

    #[error("mapping conflict for {key}: already mapped to {existing}, got {incoming}")]
    MappingConflict { key: String, existing: String, incoming: String },

    #[error("new class {fqcn} does not appear in the enumerated bytecode class set")]
    DexMissingClass { fqcn: String },

    #[error("path rejected: {path} ({reason})")]
    PathViolation { path: String, reason: String },

    #[error("{path} ({size} bytes) exceeds the {cap}-byte cap")]
    SizeCapExceeded { path: String, size: u64, cap: u64 },

    #[error("post-validate found a broken invariant: {invariant}")]
    IntegrityBroken { invariant: String },

    #[error("pipeline run cancelled")]
    Cancelled,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<resedit_format::FormatError> for PipelineError {
    fn from(e: resedit_format::FormatError) -> Self {
        use resedit_format::FormatError as F;
        match e {
            F::Parse { region, position, reason } => PipelineError::ParseError {
                region: region.to_string(),
                position,
                reason,
            },
            F::Emit { expected_size, actual_size } => PipelineError::EmitError { expected_size, actual_size },
            F::Encoding { index, target_encoding, cause } => PipelineError::EncodingError {
                index,
                value: cause,
                target_encoding: target_encoding.to_string(),
            },
            F::SizeOverflow => PipelineError::EmitError { expected_size: 0, actual_size: 0 },
            F::Integrity { invariant } => PipelineError::IntegrityBroken { invariant },
        }
    }
}

impl From<resedit_archive::ArchiveError> for PipelineError {
    fn from(e: resedit_archive::ArchiveError) -> Self {
        use resedit_archive::ArchiveError as A;
        match e {
            A::PathViolation { path, reason } => PipelineError::PathViolation { path, reason },
            A::SizeCapExceeded { path, size, cap } => PipelineError::SizeCapExceeded { path, size, cap },
            A::AggregateSizeCapExceeded { size, cap } => PipelineError::SizeCapExceeded {
                path: "<archive total>".to_string(),
                size,
                cap,
            },
            other => PipelineError::ParseError {
                region: "archive".to_string(),
                position: 0,
                reason: other.to_string(),
            },
        }
    }
}

impl From<resedit_rewrite::RewriteError> for PipelineError {
    fn from(e: resedit_rewrite::RewriteError) -> Self {
        use resedit_rewrite::RewriteError as R;
        match e {
            R::MappingConflict { key, existing, incoming } => PipelineError::MappingConflict { key, existing, incoming },
            R::Encoding { value } => PipelineError::EncodingError {
                index: 0,
                value,
                target_encoding: "unknown".to_string(),
            },
            R::Format(f) => f.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
