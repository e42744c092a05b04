use std::collections::BTreeMap;

use log::debug;

use crate::error::Result;
use crate::file::BoxedFile;

/// What a filter did with the file it was offered.
pub enum FilterOutcome {
    /// The filter recognised the file and wraps it.
    Applied(BoxedFile),
    /// The file is not for this filter; it is handed back positioned at 0.
    Declined(BoxedFile),
}

impl FilterOutcome {
    pub fn into_file(self) -> BoxedFile {
        match self {
            FilterOutcome::Applied(file) | FilterOutcome::Declined(file) => file,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, FilterOutcome::Applied(_))
    }
}

/// Filter factory: inspects `file` (named `name`, for diagnostics) and either
/// wraps it or hands it back.
pub type FilterOpen = Box<dyn Fn(BoxedFile, &str) -> Result<FilterOutcome>>;

/// Ordered set of file filters applied when a file is opened.
///
/// Filters run in ascending id order and stack: each one is offered the file
/// produced by the previous one. A filter that declines leaves the file as it
/// was.
#[derive(Default)]
pub struct FilterRegistry {
    filters: BTreeMap<u16, FilterOpen>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `filter` under `id`, replacing any filter already there.
    pub fn register<F>(&mut self, id: u16, filter: F)
    where
        F: Fn(BoxedFile, &str) -> Result<FilterOutcome> + 'static,
    {
        if self.filters.insert(id, Box::new(filter)).is_some() {
            debug!("replaced file filter {}", id);
        } else {
            debug!("registered file filter {}", id);
        }
    }

    /// Remove the filter under `id`. Returns `false` if none was registered.
    pub fn unregister(&mut self, id: u16) -> bool {
        let removed = self.filters.remove(&id).is_some();
        if removed {
            debug!("unregistered file filter {}", id);
        }
        removed
    }

    pub fn is_registered(&self, id: u16) -> bool {
        self.filters.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run every registered filter over `file` and return the outermost file.
    pub fn open(&self, file: BoxedFile, name: &str) -> Result<BoxedFile> {
        let mut file = file;
        for (id, filter) in &self.filters {
            file = match filter(file, name)? {
                FilterOutcome::Applied(filtered) => {
                    debug!("filter {} applied to {}", id, name);
                    filtered
                }
                FilterOutcome::Declined(original) => original,
            };
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Seek, SeekFrom};

    use super::*;
    use crate::file::{PlainFile, VirtualFile};

    /// Upper-cases everything it reads; stands in for a real filter.
    struct Upper(BoxedFile);

    impl Read for Upper {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.0.read(buf)?;
            buf[..n].make_ascii_uppercase();
            Ok(n)
        }
    }

    impl Seek for Upper {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.0.seek(pos)
        }
    }

    impl VirtualFile for Upper {
        fn size(&self) -> Option<u64> {
            self.0.size()
        }
    }

    /// Reverses what it reads; applied after `Upper` when ids are ordered.
    struct Reverse(BoxedFile);

    impl Read for Reverse {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.0.read(buf)?;
            buf[..n].reverse();
            Ok(n)
        }
    }

    impl Seek for Reverse {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.0.seek(pos)
        }
    }

    impl VirtualFile for Reverse {
        fn size(&self) -> Option<u64> {
            None
        }
    }

    fn upper(file: BoxedFile, _name: &str) -> Result<FilterOutcome> {
        Ok(FilterOutcome::Applied(Box::new(Upper(file))))
    }

    fn reverse(file: BoxedFile, _name: &str) -> Result<FilterOutcome> {
        Ok(FilterOutcome::Applied(Box::new(Reverse(file))))
    }

    fn decline(file: BoxedFile, _name: &str) -> Result<FilterOutcome> {
        Ok(FilterOutcome::Declined(file))
    }

    fn plain(bytes: &[u8]) -> BoxedFile {
        Box::new(PlainFile::new(Cursor::new(bytes.to_vec())).unwrap())
    }

    fn read_all(mut file: BoxedFile) -> Vec<u8> {
        let mut out = Vec::new();
        file.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn empty_registry_returns_file_untouched() {
        let registry = FilterRegistry::new();
        let file = registry.open(plain(b"abc"), "abc.txt").unwrap();
        assert_eq!(file.size(), Some(3));
        assert_eq!(read_all(file), b"abc");
    }

    #[test]
    fn filters_stack_in_id_order() {
        let mut registry = FilterRegistry::new();
        // Registered out of order on purpose.
        registry.register(2, reverse);
        registry.register(1, upper);
        let file = registry.open(plain(b"abc"), "abc.txt").unwrap();
        assert_eq!(file.size(), None, "outermost filter is Reverse");
        assert_eq!(read_all(file), b"CBA");
    }

    #[test]
    fn declined_filter_keeps_previous_file() {
        let mut registry = FilterRegistry::new();
        registry.register(1, decline);
        let file = registry.open(plain(b"abc"), "abc.txt").unwrap();
        assert!(file.is_easily_seekable());
        assert_eq!(read_all(file), b"abc");
    }

    #[test]
    fn unregister_removes_filter() {
        let mut registry = FilterRegistry::new();
        registry.register(1, upper);
        assert!(registry.is_registered(1));
        assert!(registry.unregister(1));
        assert!(!registry.unregister(1), "second unregister is a no-op");
        assert!(registry.is_empty());
        assert_eq!(read_all(registry.open(plain(b"abc"), "abc.txt").unwrap()), b"abc");
    }
}
