use std::io::{self, Read, Seek, SeekFrom};

use log::{debug, trace, warn};

use crate::decoder::{DecodeProgress, StreamDecoder};
use crate::error::{Error, Result};
use crate::file::VirtualFile;
use crate::format::StreamConfig;

/// Seekable view over a forward-only decompressor.
///
/// # Model
/// The source holds a compressed payload starting at byte 0; the decoder can
/// only walk that payload front to back. The stream turns this into a file
/// addressed by decompressed ("logical") offset:
///
/// - Reading at the current position continues decoding where the previous
///   read stopped.
/// - A forward seek is paid for by decoding and discarding everything in
///   between. No index is kept, so the cost grows with the distance skipped.
/// - A backward seek rewinds the source to 0, resets the decoder and decodes
///   forward again from the start.
///
/// # Memory
/// One input buffer and one output buffer of [`StreamConfig::buffer_size`]
/// bytes each are allocated at open time and reused for every read, next to
/// the decoder's own workspace. Nothing grows with the payload.
///
/// # Access
/// All operations take `&mut self`: one caller drives a stream at a time.
/// Sharing a stream between threads requires an external lock.
pub struct DecompressStream<S, D> {
    source: Option<S>,
    decoder: Option<D>,
    config: StreamConfig,
    /// Compressed bytes; `input_pos..input_filled` is not yet decoded.
    input: Vec<u8>,
    input_pos: usize,
    input_filled: usize,
    /// Scratch space for one decode step. Never holds bytes across steps.
    output: Vec<u8>,
    /// Logical offset of the next byte the decoder will produce.
    produced_offset: u64,
    source_eof: bool,
    frame_complete: bool,
    /// Forces a rewind before the next read: set when a rewind could not
    /// finish or the decoder failed.
    rewind_pending: bool,
    /// Cursor used by the `Read`/`Seek` impls.
    cursor: u64,
    rewinds: u64,
}

impl<S: Read + Seek, D: StreamDecoder> DecompressStream<S, D> {
    /// Take ownership of `source` and prepare to decode it with `decoder`.
    ///
    /// The source is moved to byte 0 if it is positioned elsewhere. Both
    /// buffers are allocated here; an allocation failure is reported as
    /// [`Error::OutOfMemory`] and everything allocated so far is released.
    pub fn open(mut source: S, decoder: D, config: StreamConfig) -> Result<Self> {
        config.validate()?;

        let input = alloc_buffer(config.buffer_size)?;
        let output = alloc_buffer(config.buffer_size)?;

        if source.stream_position()? != 0 {
            source.seek(SeekFrom::Start(0))?;
        }

        debug!(
            "opened {} stream: buffer_size={} window_log_max={}",
            decoder.name(),
            config.buffer_size,
            config.window_log_max
        );

        Ok(Self {
            source: Some(source),
            decoder: Some(decoder),
            config,
            input,
            input_pos: 0,
            input_filled: 0,
            output,
            produced_offset: 0,
            source_eof: false,
            frame_complete: true,
            rewind_pending: false,
            cursor: 0,
            rewinds: 0,
        })
    }

    /// Fill `buf` with decompressed bytes starting at logical `offset`.
    ///
    /// Returns the number of bytes written, which is less than `buf.len()`
    /// only when the payload ends inside the requested range (and `0` at or
    /// past the end). An empty `buf` returns `0` without touching the decoder.
    ///
    /// # Errors
    /// - [`Error::Io`] if the source fails to read or seek. Nothing is retried;
    ///   calling again resumes from the same decoder position.
    /// - [`Error::BadData`] if the decoder rejects the payload or the payload
    ///   ends in the middle of a frame. The next read starts over from the
    ///   beginning, so the error repeats at the same position.
    /// - [`Error::Closed`] after [`close`](Self::close).
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if self.source.is_none() {
            return Err(Error::Closed);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if self.rewind_pending || offset < self.produced_offset {
            self.rewind()?;
        }

        let end = offset.saturating_add(buf.len() as u64);
        let mut delivered = 0usize;

        while delivered < buf.len() {
            let current = self.produced_offset;
            // Never decode past the end of the request; the surplus would be
            // thrown away anyway.
            let capacity = (end - current).min(self.output.len() as u64) as usize;

            if self.input_pos == self.input_filled && !self.source_eof {
                self.refill()?;
            }

            let progress = self.decode_step(capacity)?;
            self.input_pos += progress.consumed;
            if progress.consumed > 0 || progress.produced > 0 {
                self.frame_complete = progress.frame_complete;
            }

            if progress.produced == 0 {
                if self.input_pos < self.input_filled {
                    if progress.consumed == 0 {
                        self.rewind_pending = true;
                        return Err(Error::BadData(format!(
                            "decoder made no progress at decompressed offset {}",
                            current
                        )));
                    }
                    continue;
                }
                if !self.source_eof {
                    continue;
                }
                if !self.frame_complete {
                    warn!("compressed stream truncated at decompressed offset {}", current);
                    return Err(Error::BadData(format!(
                        "compressed stream truncated at decompressed offset {}",
                        current
                    )));
                }
                break;
            }

            let produced_end = current + progress.produced as u64;
            let wanted = offset + delivered as u64;
            if produced_end > wanted {
                let skip = (wanted - current) as usize;
                let n = progress.produced - skip;
                buf[delivered..delivered + n]
                    .copy_from_slice(&self.output[skip..progress.produced]);
                delivered += n;
            }
            self.produced_offset = produced_end;
        }

        Ok(delivered)
    }

    /// Read compressed bytes into the (fully consumed) input buffer.
    fn refill(&mut self) -> Result<()> {
        let source = self.source.as_mut().ok_or(Error::Closed)?;
        let n = source.read(&mut self.input)?;
        trace!("refilled input buffer with {} compressed bytes", n);
        self.input_pos = 0;
        self.input_filled = n;
        if n == 0 {
            self.source_eof = true;
        }
        Ok(())
    }

    fn decode_step(&mut self, capacity: usize) -> Result<DecodeProgress> {
        let decoder = self.decoder.as_mut().ok_or(Error::Closed)?;
        let input = &self.input[self.input_pos..self.input_filled];
        let available = input.len();

        let progress = match decoder.decode(input, &mut self.output[..capacity]) {
            Ok(progress) => progress,
            Err(err) => {
                // The decoder's state is undefined after a failure.
                self.rewind_pending = true;
                if err.is_bad_data() {
                    warn!(
                        "{} decoder rejected data near decompressed offset {}: {}",
                        decoder.name(),
                        self.produced_offset,
                        err
                    );
                }
                return Err(err);
            }
        };

        if progress.consumed > available || progress.produced > capacity {
            self.rewind_pending = true;
            return Err(Error::BadData(format!(
                "decoder overran its buffers: consumed {}/{} produced {}/{}",
                progress.consumed, available, progress.produced, capacity
            )));
        }
        Ok(progress)
    }

    /// Restart decoding from the first compressed byte.
    fn rewind(&mut self) -> Result<()> {
        debug!(
            "rewinding stream from decompressed offset {} to 0",
            self.produced_offset
        );
        self.rewind_pending = true;
        self.produced_offset = 0;
        self.input_pos = 0;
        self.input_filled = 0;
        self.source_eof = false;
        self.frame_complete = true;

        let source = self.source.as_mut().ok_or(Error::Closed)?;
        source.seek(SeekFrom::Start(0))?;
        let decoder = self.decoder.as_mut().ok_or(Error::Closed)?;
        decoder.reset()?;

        self.rewind_pending = false;
        self.rewinds += 1;
        Ok(())
    }
}

impl<S, D> DecompressStream<S, D> {
    /// Release the decoder, the buffers, and the source.
    ///
    /// The source is dropped (and thereby closed) exactly once; calling
    /// `close` again, or dropping the stream afterwards, does nothing.
    pub fn close(&mut self) {
        if let Some(source) = self.source.take() {
            drop(source);
            self.decoder = None;
            self.input = Vec::new();
            self.output = Vec::new();
            self.input_pos = 0;
            self.input_filled = 0;
            debug!(
                "closed stream at decompressed offset {} after {} rewinds",
                self.produced_offset, self.rewinds
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Logical offset up to which output has been decoded.
    #[inline]
    pub fn produced_offset(&self) -> u64 {
        self.produced_offset
    }

    /// Number of times decoding restarted from the beginning.
    #[inline]
    pub fn rewind_count(&self) -> u64 {
        self.rewinds
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

impl<S, D> Drop for DecompressStream<S, D> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: Read + Seek, D: StreamDecoder> Read for DecompressStream<S, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_at(self.cursor, buf)?;
        self.cursor += n as u64;
        Ok(n)
    }
}

impl<S: Read + Seek, D: StreamDecoder> Seek for DecompressStream<S, D> {
    /// Moves the read cursor only; decoding catches up on the next read.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(delta) => self.cursor.checked_add_signed(delta),
            SeekFrom::End(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "cannot seek relative to the end: decompressed size is unknown",
                ))
            }
        };
        match target {
            Some(t) => {
                self.cursor = t;
                Ok(t)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )),
        }
    }
}

impl<S: Read + Seek, D: StreamDecoder> VirtualFile for DecompressStream<S, D> {
    fn size(&self) -> Option<u64> {
        None
    }

    fn is_easily_seekable(&self) -> bool {
        false
    }
}

fn alloc_buffer(size: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|e| Error::OutOfMemory(format!("{} byte stream buffer: {}", size, e)))?;
    buf.resize(size, 0);
    Ok(buf)
}
