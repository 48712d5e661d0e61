use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("required input file not found: {path}")]
    #[diagnostic(help("{hint}"))]
    MissingInputFile { path: PathBuf, hint: String },

    #[error("failed to parse input file {path}: {message}")]
    InputParse { path: PathBuf, message: String },

    #[error("no audio URL for \"{title}\" (expected key {path})")]
    MissingAssetUrl { title: String, path: String },

    #[error("malformed host file: {0}")]
    MalformedHostFile(String),

    #[error("invalid catalog record: {0}")]
    InvalidRecord(String),

    #[error("request for {url} failed: {message}")]
    NetworkFetch { url: String, message: String },

    #[error("{url} returned status {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("failed to finalize archive: {0}")]
    ArchiveFinalization(String),

    #[error("a bulk download is already in progress")]
    BulkInProgress,

    #[error("track not found in catalog: {0}")]
    TrackNotFound(u64),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl CatalogError {
    /// Network and archive failures share one user-facing message.
    pub fn is_download_failure(&self) -> bool {
        matches!(
            self,
            CatalogError::NetworkFetch { .. }
                | CatalogError::FetchStatus { .. }
                | CatalogError::ArchiveFinalization(_)
        )
    }

    /// Process exit status for the CLI: 2 for lookups that found nothing,
    /// 3 for download failures, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            CatalogError::TrackNotFound(_) | CatalogError::UnknownCollection(_) => 2,
            error if error.is_download_failure() => 3,
            _ => 1,
        }
    }
}
