//! Reader side of the stream buffer

use std::fmt;
use std::sync::Arc;

use crate::buffer::Shared;
use crate::error::{Result, StreamError};
use crate::notifier::Notifier;

/// Reference point for [`Reader::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Absolute position
    Start,
    /// Relative to the current position
    Current,
    /// Relative to the end; unsupported for a still-growing stream
    End,
}

impl TryFrom<i32> for Whence {
    type Error = StreamError;

    /// Conventional integer values: 0 start, 1 current, 2 end
    fn try_from(whence: i32) -> Result<Self> {
        match whence {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(StreamError::InvalidWhence(other)),
        }
    }
}

/// Link from a reader back to its buffer, shared with `ReaderCloser`s
struct ReaderLink {
    buffer: Arc<Shared>,
    /// Single-shot: closing fires it for good
    closer: Notifier,
}

impl ReaderLink {
    fn close(&self) -> Result<()> {
        self.closer.close()?;
        self.buffer.readers.done();
        Ok(())
    }
}

/// Cursor into a [`crate::StreamBuffer`]
///
/// # Thread Safety
///
/// - **Independent readers**: each Reader owns its position. Different
///   Readers operate concurrently without interfering with each other.
/// - **NOT shareable for `read()`**: `read()` and `seek()` take `&mut self`.
///   To close a reader from another task while a read is in flight, use
///   the handle returned by [`Reader::closer`].
pub struct Reader {
    link: Arc<ReaderLink>,
    pos: u64,
}

impl Reader {
    pub(crate) fn new(buffer: Arc<Shared>) -> Self {
        Self {
            link: Arc::new(ReaderLink {
                buffer,
                closer: Notifier::new(),
            }),
            pos: 0,
        }
    }

    /// Read into `buf` from the current position
    ///
    /// Waits until bytes are available, the buffer is closed, or this
    /// reader is closed. A zero-length `buf` returns `Ok(0)` immediately.
    ///
    /// Returns a positive count on success; never `Ok(0)` for a non-empty
    /// `buf`.
    ///
    /// # Errors
    /// - `Closed` if this reader is closed
    /// - `Closed` if the buffer is closed and nothing is left at the position
    /// - backend errors otherwise
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let link = &self.link;
        loop {
            if link.closer.is_closed() {
                return Err(StreamError::Closed);
            }

            // Captured before read_at so a write landing in between still wakes us
            let data_ready = link.buffer.notifier.wait();

            match link.buffer.backend.read_at(buf, self.pos) {
                Ok(n) => {
                    self.pos += n as u64;
                    return Ok(n);
                }
                Err(StreamError::NoDataYet) => {}
                Err(e) => return Err(e),
            }

            tokio::select! {
                biased;
                () = link.closer.wait() => return Err(StreamError::Closed),
                () = data_ready => {}
            }
        }
    }

    /// Move the read position
    ///
    /// A computed position below zero is clamped to 0 and reported as
    /// `NegativeIndex`; the position is updated regardless.
    ///
    /// # Errors
    /// `SeekEndUnsupported` for [`Whence::End`] (position unchanged),
    /// `NegativeIndex` as above
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let target = match whence {
            Whence::Start => i128::from(offset),
            Whence::Current => i128::from(self.pos) + i128::from(offset),
            Whence::End => return Err(StreamError::SeekEndUnsupported),
        };
        self.reposition(target)
    }

    fn seek_from(&mut self, pos: std::io::SeekFrom) -> Result<u64> {
        match pos {
            std::io::SeekFrom::Start(offset) => self.reposition(i128::from(offset)),
            std::io::SeekFrom::Current(offset) => self.seek(offset, Whence::Current),
            std::io::SeekFrom::End(offset) => self.seek(offset, Whence::End),
        }
    }

    fn reposition(&mut self, target: i128) -> Result<u64> {
        if target < 0 {
            self.pos = 0;
            return Err(StreamError::NegativeIndex);
        }
        self.pos = u64::try_from(target).unwrap_or(u64::MAX);
        Ok(self.pos)
    }

    /// Close the reader, unblocking a pending `read`
    ///
    /// # Errors
    /// `AlreadyClosed` on the second call
    pub fn close(&self) -> Result<()> {
        self.link.close()
    }

    /// Handle that can close this reader from another task
    #[must_use]
    pub fn closer(&self) -> ReaderCloser {
        ReaderCloser {
            link: Arc::clone(&self.link),
        }
    }

    /// Current read position
    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.link.closer.is_closed()
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reader(pos={}, closed={})",
            self.pos,
            self.is_closed()
        )
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        if !self.is_closed() {
            log::debug!("Reader dropped without close: {self:?}");
            let _ = self.close();
        }
    }
}

/// Cloneable handle closing a [`Reader`] from elsewhere
#[derive(Clone)]
pub struct ReaderCloser {
    link: Arc<ReaderLink>,
}

impl ReaderCloser {
    /// Same as [`Reader::close`]
    ///
    /// # Errors
    /// `AlreadyClosed` if the reader is already closed
    pub fn close(&self) -> Result<()> {
        self.link.close()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.link.closer.is_closed()
    }
}

impl fmt::Debug for ReaderCloser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReaderCloser(closed={})", self.is_closed())
    }
}

// At the trait boundaries a closed stream reads as EOF.

impl embedded_io_async::ErrorType for Reader {
    type Error = StreamError;
}

impl embedded_io_async::Read for Reader {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match Reader::read(self, buf).await {
            Err(StreamError::Closed) => Ok(0),
            other => other,
        }
    }
}

impl embedded_io_async::Seek for Reader {
    async fn seek(&mut self, pos: embedded_io_async::SeekFrom) -> Result<u64, Self::Error> {
        match pos {
            embedded_io_async::SeekFrom::Start(offset) => self.reposition(i128::from(offset)),
            embedded_io_async::SeekFrom::Current(offset) => {
                Reader::seek(self, offset, Whence::Current)
            }
            embedded_io_async::SeekFrom::End(offset) => Reader::seek(self, offset, Whence::End),
        }
    }
}

/// Blocking adapter; don't call from inside an async task
impl std::io::Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match futures::executor::block_on(Reader::read(self, buf)) {
            Ok(n) => Ok(n),
            Err(StreamError::Closed) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::io::Seek for Reader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        self.seek_from(pos).map_err(Into::into)
    }
}
