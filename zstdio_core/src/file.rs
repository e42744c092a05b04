use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A readable, positionable file as seen by filter consumers.
///
/// Besides `Read + Seek`, a virtual file tells its consumer two things up
/// front: whether its total size is known, and whether seeking is cheap.
/// Decompressing filters report an unknown size and expensive seeks so that
/// callers can avoid jumping backwards needlessly.
pub trait VirtualFile: Read + Seek {
    /// Total logical size in bytes, or `None` if it cannot be known without
    /// reading everything.
    fn size(&self) -> Option<u64>;

    /// `false` when seeking may cost time proportional to the distance moved
    /// (or to the offset itself, for backward seeks).
    fn is_easily_seekable(&self) -> bool {
        true
    }
}

pub type BoxedFile = Box<dyn VirtualFile>;

impl<F: VirtualFile + ?Sized> VirtualFile for Box<F> {
    fn size(&self) -> Option<u64> {
        (**self).size()
    }

    fn is_easily_seekable(&self) -> bool {
        (**self).is_easily_seekable()
    }
}

/// Virtual file over an ordinary random-access source with a known length.
pub struct PlainFile<R> {
    inner: R,
    len: u64,
}

impl PlainFile<File> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { inner: file, len })
    }
}

impl<R: Read + Seek> PlainFile<R> {
    /// Wrap `inner`, measuring its length and rewinding it to the start.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, len })
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for PlainFile<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for PlainFile<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl<R: Read + Seek> VirtualFile for PlainFile<R> {
    fn size(&self) -> Option<u64> {
        Some(self.len)
    }
}
