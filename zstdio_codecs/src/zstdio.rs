use std::io::{ErrorKind, Read, Seek, SeekFrom};

use log::debug;
use zstdio_core::{
    BoxedFile, DecompressStream, FilterOutcome, FilterRegistry, Result, StreamConfig, FILTER_ZSTDIO,
};

use crate::zstd_codec::{is_zstd_signature, ZstdDecoder};

/// Open `file` as a zstd-compressed payload.
///
/// The returned stream owns `file`. It reports an unknown size and expensive
/// seeks.
pub fn open_zstd(
    file: BoxedFile,
    config: StreamConfig,
) -> Result<DecompressStream<BoxedFile, ZstdDecoder>> {
    let decoder = ZstdDecoder::with_config(&config)?;
    DecompressStream::open(file, decoder, config)
}

/// File filter entry point: wraps `file` in a decompressing stream when it
/// starts with a zstd signature, and hands it back otherwise.
pub fn zstdio_open(file: BoxedFile, name: &str) -> Result<FilterOutcome> {
    zstdio_open_with(file, name, StreamConfig::default())
}

fn zstdio_open_with(
    mut file: BoxedFile,
    name: &str,
    config: StreamConfig,
) -> Result<FilterOutcome> {
    file.seek(SeekFrom::Start(0))?;
    let mut header = [0u8; 4];
    let n = read_prefix(&mut file, &mut header)?;
    file.seek(SeekFrom::Start(0))?;

    if !is_zstd_signature(&header[..n]) {
        return Ok(FilterOutcome::Declined(file));
    }

    debug!("zstdio: {} carries a zstd signature", name);
    let stream = open_zstd(file, config)?;
    Ok(FilterOutcome::Applied(Box::new(stream)))
}

/// Install the zstd filter under [`FILTER_ZSTDIO`], using `config` for every
/// stream it opens.
pub fn register_zstdio(registry: &mut FilterRegistry, config: StreamConfig) {
    registry.register(FILTER_ZSTDIO, move |file: BoxedFile, name: &str| {
        zstdio_open_with(file, name, config)
    });
}

pub fn unregister_zstdio(registry: &mut FilterRegistry) -> bool {
    registry.unregister(FILTER_ZSTDIO)
}

/// Read until `buf` is full or the file ends; returns bytes read.
fn read_prefix(file: &mut BoxedFile, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
