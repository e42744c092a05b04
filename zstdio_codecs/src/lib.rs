mod passthrough;
mod zstd_codec;
mod zstdio;

pub use passthrough::PassThroughDecoder;
pub use zstd_codec::{
    compress, compress_stream, is_zstd_signature, ZstdDecoder, DEFAULT_LEVEL, SKIPPABLE_MAGIC_MASK,
    SKIPPABLE_MAGIC_MIN, ZSTD_MAGIC,
};
pub use zstdio::{open_zstd, register_zstdio, unregister_zstdio, zstdio_open};
