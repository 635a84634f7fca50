//! Ties the binary-format codecs, the archive view, and the rewriters into
//! a single transactional run over an APK-shaped archive: scan, validate,
//! replace, validate again, commit or roll back.

pub mod cancellation;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod snapshot;

pub use cancellation::Cancellation;
pub use config::Config;
pub use error::{PipelineError, Result};
pub use report::ReplacementReport;
pub use snapshot::{Transaction, TransactionStatus};
