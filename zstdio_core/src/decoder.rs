use crate::error::Result;

/// Outcome of one [`StreamDecoder::decode`] step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeProgress {
    /// Bytes taken from the front of `input`.
    pub consumed: usize,
    /// Bytes written to the front of `output`.
    pub produced: usize,
    /// `true` when the decoder sits on a frame boundary with nothing left to
    /// flush. Reaching end-of-source while this is `false` means the payload
    /// was cut short.
    pub frame_complete: bool,
}

/// Streaming decompressor abstraction.
///
/// Each `StreamDecoder` implementation:
/// - Moves strictly forward: it can never be repositioned except by
///   [`reset`](StreamDecoder::reset), which drops all window history and
///   makes the next `decode` expect the very first byte of the payload.
/// - Works on bounded chunks: `decode` may consume any prefix of `input`
///   and fill any prefix of `output`, and must make progress whenever
///   `output` is non-empty and there is either input or buffered output left.
/// - Reports malformed or unsupported data as
///   [`Error::BadData`](crate::Error::BadData), never as silently wrong bytes.
pub trait StreamDecoder {
    /// Human-readable decoder name for logs and CLI display.
    fn name(&self) -> &'static str;

    /// Advance the decoder with `input`, writing decompressed bytes into
    /// `output`.
    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<DecodeProgress>;

    /// Return to the initial state, keeping the parameters chosen at
    /// construction (window limit and the like).
    fn reset(&mut self) -> Result<()>;
}

impl<D: StreamDecoder + ?Sized> StreamDecoder for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<DecodeProgress> {
        (**self).decode(input, output)
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }
}
