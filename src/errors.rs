use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the payload processing core.
#[derive(Error, Debug)]
pub enum Error {
    /// A `%` escape with missing or non-hex digits.
    #[error("malformed percent encoding at byte {position}")]
    MalformedEncoding { position: usize },
    /// An operation was called before a required prior step, or for the
    /// wrong field kind / storage mode.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// The compression primitive rejected the stream.
    #[error("codec error: {0}")]
    Codec(String),
    /// The peer compressed against a preset dictionary that was never
    /// installed on this side. Protocol violation, not retryable.
    #[error("peer requires a preset dictionary (adler32 {0:#010x})")]
    DictionaryRequired(u32),
    #[error("failed to reserve {0} bytes")]
    Allocation(usize),
}
