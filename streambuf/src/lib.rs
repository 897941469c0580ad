//! Append-only byte stream written by one producer and read to completion by
//! many independent readers.
//!
//! ```
//! use streambuf::StreamBuffer;
//!
//! # futures::executor::block_on(async {
//! let buffer = StreamBuffer::memory();
//! let mut reader = buffer.new_reader().unwrap();
//!
//! buffer.write(b"hello").unwrap();
//!
//! let mut buf = [0u8; 16];
//! let n = reader.read(&mut buf).await.unwrap();
//! assert_eq!(&buf[..n], b"hello");
//!
//! reader.close().unwrap();
//! buffer.close_and_wait(std::future::pending()).await.unwrap();
//! # });
//! ```

pub mod backend;
pub mod buffer;
pub mod config;
pub mod error;
pub mod notifier;
pub mod reader;
mod reader_count;

#[cfg(test)]
mod tests;

// Re-export the main types for convenience
pub use backend::{Backend, FileBackend, MemoryBackend};
pub use buffer::StreamBuffer;
pub use config::{Backing, BufferConfig};
pub use error::{Result, StreamError};
pub use notifier::{Notifier, Signal};
pub use reader::{Reader, ReaderCloser, Whence};
