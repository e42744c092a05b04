pub mod decoder;
pub mod error;
pub mod file;
pub mod filter;
pub mod format;
pub mod stream;

pub use decoder::{DecodeProgress, StreamDecoder};
pub use error::{Error, Result};
pub use file::{BoxedFile, PlainFile, VirtualFile};
pub use filter::{FilterOpen, FilterOutcome, FilterRegistry};
pub use format::{StreamConfig, DEFAULT_BUFFER_SIZE, DEFAULT_WINDOW_LOG_MAX, FILTER_ZSTDIO};
pub use stream::DecompressStream;
