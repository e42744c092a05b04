use std::io;

use thiserror::Error;

/// Failures surfaced by the decompression stream and its collaborators.
///
/// `Io` and `BadData` are kept apart on purpose: a caller can tell a flaky
/// source from a damaged payload without parsing messages.
#[derive(Error, Debug)]
pub enum Error {
    /// A buffer or the decoder's working memory could not be allocated.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// The underlying compressed source failed to read or seek.
    #[error("source I/O error: {0}")]
    Io(#[from] io::Error),

    /// The decoder rejected the compressed data (corrupt, truncated, or
    /// using parameters it does not support).
    #[error("bad compressed data: {0}")]
    BadData(String),

    #[error("invalid stream configuration: {0}")]
    InvalidConfig(String),

    /// The stream was already closed.
    #[error("stream is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_bad_data(&self) -> bool {
        matches!(self, Error::BadData(_))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::BadData(_) => io::Error::new(io::ErrorKind::InvalidData, err),
            Error::OutOfMemory(_) => io::Error::new(io::ErrorKind::OutOfMemory, err),
            Error::InvalidConfig(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
            Error::Closed => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}
