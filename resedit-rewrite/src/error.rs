use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("mapping conflict for {key}: already mapped to {existing}, got {incoming}")]
    MappingConflict {
        key: String,
        existing: String,
        incoming: String,
    },

    #[error("rewrite produced a string the target encoding cannot represent: {value}")]
    Encoding { value: String },

    #[error(transparent)]
    Format(#[from] resedit_format::FormatError),
}

pub type Result<T> = std::result::Result<T, RewriteError>;
