use std::io::{self, Read, Write};

use zstd::stream::raw::{DParameter, Decoder, InBuffer, Operation, OutBuffer};
use zstd::stream::Encoder;
use zstdio_core::decoder::{DecodeProgress, StreamDecoder};
use zstdio_core::{Error, Result, StreamConfig};

/// Little-endian magic number opening every zstd frame.
pub const ZSTD_MAGIC: u32 = 0xFD2F_B528;

/// Skippable frames use magics `0x184D2A50..=0x184D2A5F`.
pub const SKIPPABLE_MAGIC_MIN: u32 = 0x184D_2A50;
pub const SKIPPABLE_MAGIC_MASK: u32 = 0xFFFF_FFF0;

/// Compression level used by [`compress`] when none is given.
pub const DEFAULT_LEVEL: i32 = zstd::DEFAULT_COMPRESSION_LEVEL;

/// `true` if `header` starts with a zstd frame or skippable-frame magic.
pub fn is_zstd_signature(header: &[u8]) -> bool {
    let Some(magic) = header.get(..4) else {
        return false;
    };
    let magic = u32::from_le_bytes([magic[0], magic[1], magic[2], magic[3]]);
    magic == ZSTD_MAGIC || magic & SKIPPABLE_MAGIC_MASK == SKIPPABLE_MAGIC_MIN
}

/// Zstandard streaming decoder.
///
/// Wraps the `zstd` crate's raw decompression context. The context owns its
/// workspace, sized for frames whose window does not exceed
/// `2^window_log_max` bytes; frames asking for more are rejected as
/// [`Error::BadData`]. Concatenated frames decode back to back.
pub struct ZstdDecoder {
    inner: Decoder<'static>,
    window_log_max: u32,
}

impl ZstdDecoder {
    pub fn new(window_log_max: u32) -> Result<Self> {
        let mut inner = Decoder::new()
            .map_err(|e| Error::OutOfMemory(format!("zstd decompression context: {}", e)))?;
        inner
            .set_parameter(DParameter::WindowLogMax(window_log_max))
            .map_err(|e| {
                Error::InvalidConfig(format!("zstd window_log_max {}: {}", window_log_max, e))
            })?;
        Ok(Self {
            inner,
            window_log_max,
        })
    }

    pub fn with_config(config: &StreamConfig) -> Result<Self> {
        Self::new(config.window_log_max)
    }

    pub fn window_log_max(&self) -> u32 {
        self.window_log_max
    }
}

impl StreamDecoder for ZstdDecoder {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<DecodeProgress> {
        let mut src = InBuffer::around(input);
        let mut dst = OutBuffer::around(output);
        // `run` returns 0 once a frame is fully decoded and flushed.
        let hint = self
            .inner
            .run(&mut src, &mut dst)
            .map_err(|e| Error::BadData(format!("zstd: {}", e)))?;
        Ok(DecodeProgress {
            consumed: src.pos(),
            produced: dst.pos(),
            frame_complete: hint == 0,
        })
    }

    fn reset(&mut self) -> Result<()> {
        // Session-only reset: the window limit set in `new` survives.
        self.inner
            .reinit()
            .map_err(|e| Error::OutOfMemory(format!("resetting zstd context: {}", e)))
    }
}

/// Compress `raw` into a single zstd frame with a content checksum.
///
/// The checksum lets the decoder report bit flips as corrupt data instead of
/// returning altered bytes.
pub fn compress(raw: &[u8], level: i32) -> io::Result<Vec<u8>> {
    let mut encoder = Encoder::new(Vec::new(), level)?;
    encoder.include_checksum(true)?;
    encoder.write_all(raw)?;
    encoder.finish()
}

/// Streaming counterpart of [`compress`]. Returns the number of raw bytes read.
pub fn compress_stream<R: Read, W: Write>(mut src: R, dst: W, level: i32) -> io::Result<u64> {
    let mut encoder = Encoder::new(dst, level)?;
    encoder.include_checksum(true)?;
    let n = io::copy(&mut src, &mut encoder)?;
    encoder.finish()?.flush()?;
    Ok(n)
}
