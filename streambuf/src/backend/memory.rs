//! In-memory backend

use parking_lot::RwLock;
use std::fmt;

use super::Backend;
use crate::error::{Result, StreamError};

struct MemoryState {
    data: Vec<u8>,
    written: u64,
    writer_closed: bool,
    reader_closed: bool,
}

/// Backend storing the stream in a growable `Vec<u8>`.
///
/// The payload is released when the reader side closes.
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                data: Vec::with_capacity(capacity),
                written: 0,
                writer_closed: false,
                reader_closed: false,
            }),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn append(&self, data: &[u8]) -> Result<usize> {
        let mut state = self.state.write();
        if state.writer_closed {
            return Err(StreamError::Closed);
        }

        state.data.extend_from_slice(data);
        state.written += data.len() as u64;
        Ok(data.len())
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let state = self.state.read();
        if state.reader_closed {
            return Err(StreamError::Closed);
        }

        match usize::try_from(offset) {
            Ok(start) if start < state.data.len() => {
                let available = &state.data[start..];
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                Ok(n)
            }
            _ if state.writer_closed => Err(StreamError::Closed),
            _ => Err(StreamError::NoDataYet),
        }
    }

    fn close_writer(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.writer_closed {
            return Err(StreamError::AlreadyClosed);
        }
        state.writer_closed = true;
        Ok(())
    }

    fn close_reader(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.reader_closed {
            return Err(StreamError::AlreadyClosed);
        }
        state.writer_closed = true;
        state.reader_closed = true;
        state.data = Vec::new();
        Ok(())
    }

    fn len(&self) -> u64 {
        self.state.read().written
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        write!(
            f,
            "MemoryBackend(written={}, writer_closed={}, reader_closed={})",
            state.written, state.writer_closed, state.reader_closed
        )
    }
}
