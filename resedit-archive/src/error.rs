use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("malformed archive: {reason} (at offset {offset})")]
    Malformed { offset: u64, reason: String },

    #[error("multi-disk archives are not supported")]
    MultiDisk,

    #[error("entry not found: {path}")]
    NotFound { path: String },

    #[error("entry path rejected: {path} ({reason})")]
    PathViolation { path: String, reason: String },

    #[error("entry {path} is {size} bytes, exceeding the {cap}-byte per-entry cap")]
    SizeCapExceeded { path: String, size: u64, cap: u64 },

    #[error("archive total size {size} bytes exceeds the {cap}-byte aggregate cap")]
    AggregateSizeCapExceeded { size: u64, cap: u64 },

    #[error("unsupported compression method {0}")]
    UnsupportedCompression(u16),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
