//! Error type shared by the buffer, its readers and the storage backends

use std::io;

/// Result alias used throughout the crate
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Error type for stream buffer operations
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A close-type operation was invoked on an entity that is already closed
    #[error("cannot close an already closed instance")]
    AlreadyClosed,

    /// The entity is closed and will never accept writes or produce data again
    #[error("cannot perform action on closed instance")]
    Closed,

    /// No data at the requested offset yet; retry after the next write.
    ///
    /// Only produced by [`crate::Backend::read_at`]. [`crate::Reader::read`]
    /// absorbs it and waits instead.
    #[error("no data available yet")]
    NoDataYet,

    /// Seeking relative to the end of a still-growing stream
    #[error("seek end is not currently supported")]
    SeekEndUnsupported,

    /// An integer whence value outside of start/current/end
    #[error("invalid seek whence: {0}")]
    InvalidWhence(i32),

    /// A seek would move before byte 0. The reader position is clamped to 0.
    #[error("invalid index, cannot be less than 0")]
    NegativeIndex,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl embedded_io_async::Error for StreamError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        use embedded_io_async::ErrorKind;

        match self {
            StreamError::Closed => ErrorKind::BrokenPipe,
            StreamError::SeekEndUnsupported => ErrorKind::Unsupported,
            StreamError::InvalidWhence(_) | StreamError::NegativeIndex => ErrorKind::InvalidInput,
            StreamError::AlreadyClosed | StreamError::NoDataYet | StreamError::Io(_) => {
                ErrorKind::Other
            }
        }
    }
}

impl From<StreamError> for io::Error {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::Io(e) => e,
            StreamError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, e.to_string()),
            StreamError::NoDataYet => io::Error::new(io::ErrorKind::WouldBlock, e.to_string()),
            StreamError::SeekEndUnsupported => {
                io::Error::new(io::ErrorKind::Unsupported, e.to_string())
            }
            StreamError::InvalidWhence(_) | StreamError::NegativeIndex => {
                io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
            }
            StreamError::AlreadyClosed => io::Error::other(e.to_string()),
        }
    }
}
