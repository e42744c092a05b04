use zstdio_core::decoder::{DecodeProgress, StreamDecoder};
use zstdio_core::Result;

/// Identity decoder: every input byte comes out unchanged.
///
/// Useful for:
/// - Exercising the stream's buffering and offset bookkeeping where the
///   expected output is simply the source bytes.
/// - Serving stored (uncompressed) payloads through the same stream type.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughDecoder;

impl StreamDecoder for PassThroughDecoder {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<DecodeProgress> {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        Ok(DecodeProgress {
            consumed: n,
            produced: n,
            frame_complete: true,
        })
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}
