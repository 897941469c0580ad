//! Buffer construction options

use std::path::PathBuf;

/// Default preallocation of the in-memory backend
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Where the stream bytes live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backing {
    /// Process memory, released when the reader side closes
    Memory,
    /// A single file, opened (or created) for appending and for reading
    File(PathBuf),
}

/// Options for [`crate::StreamBuffer::with_config`]
///
/// # Example
///
/// ```
/// use streambuf::{BufferConfig, StreamBuffer};
///
/// let config = BufferConfig::memory().initial_capacity(64);
/// let buffer = StreamBuffer::with_config(&config).unwrap();
/// assert_eq!(buffer.write(b"hello").unwrap(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    pub backing: Backing,
    /// Ignored by the file backend
    pub initial_capacity: usize,
    /// `sync_all` the file when its writer side closes. Ignored in memory.
    pub sync_on_close: bool,
}

impl BufferConfig {
    #[must_use]
    pub fn memory() -> Self {
        Self {
            backing: Backing::Memory,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            sync_on_close: false,
        }
    }

    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Backing::File(path.into()),
            ..Self::memory()
        }
    }

    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    #[must_use]
    pub fn sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::memory()
    }
}
