//! Stream buffer: one writer, many independent readers
//!
//! Implements a broadcast-style stream where:
//! - Writes append to a storage backend and rotate the notifier generation
//! - Any number of Readers read from the backend at their own positions
//! - A two-phase close stops the writer, wakes every reader, optionally waits
//!   for readers to finish, then releases the reader-side storage

use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use crate::backend::{self, Backend, MemoryBackend};
use crate::config::{BufferConfig, DEFAULT_INITIAL_CAPACITY};
use crate::error::{Result, StreamError};
use crate::notifier::Notifier;
use crate::reader::Reader;
use crate::reader_count::ReaderCount;

/// State shared between the buffer and its readers
pub(crate) struct Shared {
    pub(crate) backend: Box<dyn Backend>,
    pub(crate) notifier: Notifier,
    pub(crate) readers: ReaderCount,
    /// Writes and reader creation take the shared side, close the exclusive side
    closed: RwLock<bool>,
}

/// Append-only byte stream with independent readers
///
/// # Thread Safety
///
/// `StreamBuffer` is `Send + Sync`; share it by reference or `Arc`.
///
/// - **Concurrent writes**: `write()` and `new_reader()` hold the shared side
///   of an internal `parking_lot::RwLock`. They run concurrently with each
///   other; the relative order of concurrent writes is unspecified.
/// - **Close is exclusive**: `close()` and `close_and_wait()` take the
///   exclusive side to flip the closed flag, so no write or reader creation
///   is accepted once a close has begun.
///
/// # Closing
///
/// [`StreamBuffer::close_and_wait`] is the draining close: readers may finish
/// consuming already-written bytes until they close themselves or the
/// cancellation future resolves. [`StreamBuffer::close`] uses a zero wait
/// budget and may drop unread tails; use it only when that's acceptable.
pub struct StreamBuffer {
    shared: Arc<Shared>,
}

impl StreamBuffer {
    /// Create an in-memory buffer
    #[must_use]
    pub fn memory() -> Self {
        Self::from_backend(Box::new(MemoryBackend::with_capacity(
            DEFAULT_INITIAL_CAPACITY,
        )))
    }

    /// Create a buffer backed by the file at `path`
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened for appending or reading
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(&BufferConfig::file(path.as_ref()))
    }

    /// Create a buffer with the backend selected by `config`
    ///
    /// # Errors
    /// Propagates backend construction errors
    pub fn with_config(config: &BufferConfig) -> Result<Self> {
        Ok(Self::from_backend(backend::open(config)?))
    }

    /// Create a buffer over a caller-provided backend
    #[must_use]
    pub fn from_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                notifier: Notifier::new(),
                readers: ReaderCount::new(),
                closed: RwLock::new(false),
            }),
        }
    }

    /// Append `data` and wake blocked readers
    ///
    /// An empty write returns `Ok(0)` without waking anybody.
    ///
    /// # Errors
    /// `Closed` once the buffer is closed; backend errors otherwise
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let closed = self.shared.closed.read();
        if *closed {
            return Err(StreamError::Closed);
        }

        if data.is_empty() {
            return Ok(0);
        }

        let n = self.shared.backend.append(data)?;
        self.shared.notifier.refresh();
        drop(closed);
        Ok(n)
    }

    /// Create a reader positioned at offset 0
    ///
    /// # Errors
    /// `Closed` once the buffer is closed
    pub fn new_reader(&self) -> Result<Reader> {
        let closed = self.shared.closed.read();
        if *closed {
            return Err(StreamError::Closed);
        }

        self.shared.readers.add();
        Ok(Reader::new(Arc::clone(&self.shared)))
    }

    /// Close without waiting for readers
    ///
    /// Equivalent to [`StreamBuffer::close_and_wait`] with an already expired
    /// wait budget. Readers that have not yet consumed everything lose the
    /// remainder and see `Closed`.
    ///
    /// # Errors
    /// `AlreadyClosed` on the second call; backend close errors
    pub fn close(&self) -> Result<()> {
        let writer_closed = self.stop_writer()?;

        let abandoned = self.shared.readers.get();
        if abandoned > 0 {
            log::debug!("stream buffer: immediate close with {abandoned} live readers");
        }

        self.shared.backend.close_reader()?;
        writer_closed
    }

    /// Close, waiting for live readers until `cancel` resolves
    ///
    /// Steps:
    /// 1. mark closed (later `write`/`new_reader` fail with `Closed`)
    /// 2. close the backend's writer side
    /// 3. close the notifier, waking every blocked reader
    /// 4. wait until every reader is closed or `cancel` resolves
    /// 5. close the backend's reader side
    ///
    /// Cancellation is not an error: the close completes and returns `Ok`.
    /// Readers still active after a cancelled wait are abandoned and observe
    /// `Closed` from the released backend.
    ///
    /// Dropping the returned future after its first poll (for example under
    /// `tokio::time::timeout`) acts like a cancelled wait: the reader side is
    /// released on drop.
    ///
    /// # Errors
    /// `AlreadyClosed` on the second call; backend close errors
    pub async fn close_and_wait<F>(&self, cancel: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let writer_closed = self.stop_writer()?;
        let release = ReleaseReaders::new(self.shared.backend.as_ref());

        tokio::select! {
            biased;
            () = self.shared.readers.wait_idle() => {
                log::debug!("stream buffer: all readers closed");
            }
            () = cancel => {
                log::debug!(
                    "stream buffer: wait cancelled, abandoning {} readers",
                    self.shared.readers.get()
                );
            }
        }

        release.release()?;
        writer_closed
    }

    /// First phase of close, under the exclusive lock.
    ///
    /// The outer error aborts the close; the inner one is the writer-side
    /// release result, reported after the reader side is released too.
    fn stop_writer(&self) -> Result<Result<()>> {
        let mut closed = self.shared.closed.write();
        if *closed {
            return Err(StreamError::AlreadyClosed);
        }
        *closed = true;

        let writer_closed = self.shared.backend.close_writer();
        if let Err(e) = &writer_closed {
            log::warn!("stream buffer: closing writer side failed: {e}");
        }
        if let Err(e) = self.shared.notifier.close() {
            log::warn!("stream buffer: notifier was closed before the buffer: {e}");
        }
        Ok(writer_closed)
    }

    /// Number of bytes written so far
    #[must_use]
    pub fn len(&self) -> u64 {
        self.shared.backend.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a close has begun
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.shared.closed.read()
    }

    /// Number of readers created and not yet closed
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.shared.readers.get()
    }

    #[cfg(test)]
    pub(crate) fn notifier(&self) -> &Notifier {
        &self.shared.notifier
    }
}

/// Releases the backend's reader side exactly once, on completion or on drop
struct ReleaseReaders<'a> {
    backend: Option<&'a dyn Backend>,
}

impl<'a> ReleaseReaders<'a> {
    fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    fn release(mut self) -> Result<()> {
        match self.backend.take() {
            Some(backend) => backend.close_reader(),
            None => Ok(()),
        }
    }
}

impl Drop for ReleaseReaders<'_> {
    fn drop(&mut self) {
        if let Some(backend) = self.backend.take() {
            log::debug!("stream buffer: close_and_wait dropped while waiting, releasing readers");
            if let Err(e) = backend.close_reader() {
                log::warn!("stream buffer: releasing reader side failed: {e}");
            }
        }
    }
}

impl fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StreamBuffer(len={}, closed={}, readers={}, notifier={:?})",
            self.len(),
            self.is_closed(),
            self.reader_count(),
            self.shared.notifier
        )
    }
}

impl Drop for StreamBuffer {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        log::warn!("StreamBuffer dropped without close: {self:?}");
        if let Err(e) = self.close() {
            log::warn!("stream buffer: implicit close failed: {e}");
        }
    }
}

impl embedded_io_async::ErrorType for StreamBuffer {
    type Error = StreamError;
}

impl embedded_io_async::Write for StreamBuffer {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        StreamBuffer::write(self, buf)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl std::io::Write for &StreamBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        StreamBuffer::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::io::Write for StreamBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        StreamBuffer::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
