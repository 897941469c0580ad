//! Storage backends
//!
//! A backend is an opaque append-only byte store with two independently
//! closable halves.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  StreamBuffer (coordination layer)  │
//! │  - notifier generations             │
//! │  - live-reader counter              │
//! │  - two-phase close                  │
//! └─────────────────────────────────────┘
//!          ▲
//!          │ uses Backend for storage
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  Backend (storage layer)            │
//! │  - append() for writing             │
//! │  - read_at() for positioned reads   │
//! │  - close_writer() / close_reader()  │
//! └─────────────────────────────────────┘
//!      ▲                     ▲
//!      │                     │
//!  MemoryBackend        FileBackend
//! ```

pub mod file;
pub mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use crate::config::{Backing, BufferConfig};
use crate::error::Result;

/// Capability interface of a storage backend
///
/// # Invariants
///
/// - Once the writer side is closed, `append` fails with `Closed`
/// - Once the reader side is closed, `read_at` fails with `Closed` and
///   read-side resources are released
/// - Closing the reader side also closes the writer side if still open
/// - A reader never observes a partial append
///
/// Implementations serialize internally with a shared/exclusive lock:
/// reads run concurrently with each other and with an append's data copy;
/// publishing appended bytes and closing are exclusive.
pub trait Backend: Send + Sync {
    /// Append all of `data`, returning its length
    ///
    /// # Errors
    /// `Closed` once the writer side is closed, `Io` on storage failure
    fn append(&self, data: &[u8]) -> Result<usize>;

    /// Copy bytes starting at `offset` into `buf` without consuming them.
    ///
    /// Returns a positive count when `offset` is inside the written data.
    /// At or past the end:
    /// - `Closed` if the writer side is closed (no more data will ever arrive)
    /// - `NoDataYet` otherwise (retry after the next write)
    ///
    /// `buf` must not be empty.
    ///
    /// # Errors
    /// See above; `Closed` also once the reader side is closed
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Close the write side and release write-related resources
    ///
    /// # Errors
    /// `AlreadyClosed` on the second call
    fn close_writer(&self) -> Result<()>;

    /// Close the read side and release read-related resources
    ///
    /// # Errors
    /// `AlreadyClosed` on the second call
    fn close_reader(&self) -> Result<()>;

    /// Number of committed bytes
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Create the backend selected by `config`
///
/// # Errors
/// Propagates file open failures
pub fn open(config: &BufferConfig) -> Result<Box<dyn Backend>> {
    match &config.backing {
        Backing::Memory => Ok(Box::new(MemoryBackend::with_capacity(
            config.initial_capacity,
        ))),
        Backing::File(path) => Ok(Box::new(FileBackend::open_with_options(
            path,
            config.sync_on_close,
        )?)),
    }
}
