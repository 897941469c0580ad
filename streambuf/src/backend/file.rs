//! File-based backend for persistent streams.

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::Backend;
use crate::error::{Result, StreamError};

struct FileState {
    writer: Option<File>,
    reader: Option<File>,
    /// Committed length; bytes past it are never served
    len: u64,
}

/// A file-based backend.
///
/// Holds two independent OS handles on the same path: an append-only write
/// handle and a read handle used for positioned reads. Each is closed by its
/// own half of the close sequence.
///
/// Bytes already present in the file when it is opened are part of the
/// stream and readable from offset 0.
///
/// # Durability
///
/// Closing the writer flushes the write handle. With `sync_on_close` it
/// also calls `File::sync_all()`.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    state: RwLock<FileState>,
    sync_on_close: bool,
}

impl FileBackend {
    /// Opens or creates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle cannot be opened. The write handle
    /// is closed again if the read handle fails to open.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_options(path, false)
    }

    /// Like [`FileBackend::open`], optionally syncing to disk when the
    /// writer side closes.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle cannot be opened.
    pub fn open_with_options(path: &Path, sync_on_close: bool) -> Result<Self> {
        let writer = OpenOptions::new().append(true).create(true).open(path)?;
        // On failure `writer` is dropped here, closing its handle
        let reader = File::open(path)?;
        let len = writer.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(FileState {
                writer: Some(writer),
                reader: Some(reader),
                len,
            }),
            sync_on_close,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for FileBackend {
    fn append(&self, data: &[u8]) -> Result<usize> {
        // Upgradable: readers keep going during the disk write, other appends
        // and closes wait. Bytes past `len` are not served until published.
        let state = self.state.upgradable_read();
        let committed = state.len;
        let mut writer: &File = state.writer.as_ref().ok_or(StreamError::Closed)?;

        if let Err(e) = writer.write_all(data) {
            // Roll back a torn append so offsets stay in step with the file
            if let Err(rollback) = writer.set_len(committed) {
                log::warn!(
                    "file backend {}: failed to roll back torn append: {rollback}",
                    self.path.display()
                );
            }
            return Err(e.into());
        }

        RwLockUpgradableReadGuard::upgrade(state).len += data.len() as u64;
        Ok(data.len())
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let state = self.state.read();
        let reader = state.reader.as_ref().ok_or(StreamError::Closed)?;

        if offset >= state.len {
            return Err(if state.writer.is_none() {
                StreamError::Closed
            } else {
                StreamError::NoDataYet
            });
        }

        let available = state.len - offset;
        let n = usize::try_from(available).map_or(buf.len(), |a| a.min(buf.len()));
        read_exact_at(reader, &mut buf[..n], offset)?;
        Ok(n)
    }

    fn close_writer(&self) -> Result<()> {
        let mut writer = self
            .state
            .write()
            .writer
            .take()
            .ok_or(StreamError::AlreadyClosed)?;

        writer.flush()?;
        if self.sync_on_close {
            writer.sync_all()?;
        }
        Ok(())
    }

    fn close_reader(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.reader.take().is_none() {
            return Err(StreamError::AlreadyClosed);
        }
        if state.writer.take().is_some() {
            log::debug!(
                "file backend {}: reader side closed before writer side",
                self.path.display()
            );
        }
        Ok(())
    }

    fn len(&self) -> u64 {
        self.state.read().len
    }
}

impl std::fmt::Debug for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FileState(len={}, writer_open={}, reader_open={})",
            self.len,
            self.writer.is_some(),
            self.reader.is_some()
        )
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::read_exact_at(file, buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
