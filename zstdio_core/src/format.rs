use crate::error::{Error, Result};

/// Default size of each of the two stream buffers (compressed input and
/// decompressed output): 8 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 0x2000;

/// Default maximum window the decoder accepts, as a power of two.
/// 2^27 = 128 MiB, the largest window zstd decodes without opting in.
pub const DEFAULT_WINDOW_LOG_MAX: u32 = 27;

/// Smallest window log any zstd frame may declare.
pub const WINDOW_LOG_MIN: u32 = 10;

/// Largest window log supported on 64-bit targets.
pub const WINDOW_LOG_LIMIT: u32 = 31;

// ── Filter IDs ─────────────────────────────────────────────────────────────

/// Registry key of the zstd decompression filter.
pub const FILTER_ZSTDIO: u16 = 4;

// ── Stream configuration ───────────────────────────────────────────────────

/// Sizing knobs for a [`DecompressStream`](crate::DecompressStream).
///
/// Memory held by one open stream is bounded by two buffers of
/// `buffer_size` bytes plus the decoder's workspace for a window of
/// `2^window_log_max` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub buffer_size: usize,
    pub window_log_max: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            window_log_max: DEFAULT_WINDOW_LOG_MAX,
        }
    }
}

impl StreamConfig {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_window_log_max(mut self, window_log_max: u32) -> Self {
        self.window_log_max = window_log_max;
        self
    }

    /// Largest back-reference distance the decoder will accept, in bytes.
    pub fn max_window_size(&self) -> u64 {
        1u64 << self.window_log_max
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfig("buffer_size must be non-zero".into()));
        }
        if !(WINDOW_LOG_MIN..=WINDOW_LOG_LIMIT).contains(&self.window_log_max) {
            return Err(Error::InvalidConfig(format!(
                "window_log_max {} outside supported range {}..={}",
                self.window_log_max, WINDOW_LOG_MIN, WINDOW_LOG_LIMIT
            )));
        }
        Ok(())
    }
}
