use thiserror::Error;

/// Error taxonomy for the paging core.
///
/// Only `ConfigError` and `IoOpenError` are fatal at startup; every other
/// variant is recoverable and is expected to be logged and swallowed by the
/// worker loop (see [`crate::worker`]).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("config error: {0}")]
    ConfigError(String),

    #[error("failed to open backing file {path}: {source}")]
    IoOpenError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed at offset {offset}: {source}")]
    IoReadError {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("write failed at offset {offset}: {source}")]
    IoWriteError {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("partial io at offset {offset}: {got} of {expected} bytes")]
    PartialIo {
        offset: u64,
        got: usize,
        expected: usize,
    },

    #[error("cache entry allocation failed")]
    AllocError,

    #[error("compression failed: {0}")]
    CompressError(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
