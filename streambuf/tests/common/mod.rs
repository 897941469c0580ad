//! Shared helpers: every scenario runs against both backends

#![allow(dead_code)]

use std::time::Duration;

use streambuf::{Reader, StreamBuffer, StreamError};
use tempfile::TempDir;

pub const TIMEOUT: Duration = Duration::from_secs(1);

/// A buffer under test, keeping its temp directory alive
pub struct Fixture {
    pub name: &'static str,
    pub buffer: StreamBuffer,
    _dir: Option<TempDir>,
}

pub fn memory() -> Fixture {
    Fixture {
        name: "memory",
        buffer: StreamBuffer::memory(),
        _dir: None,
    }
}

pub fn file() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("streambuf.test");
    let buffer = StreamBuffer::open(&path)
        .unwrap_or_else(|e| panic!("open({}) = {e}, want Ok", path.display()));
    Fixture {
        name: "file",
        buffer,
        _dir: Some(dir),
    }
}

pub fn fixtures() -> Vec<Fixture> {
    vec![memory(), file()]
}

pub fn must_reader(f: &Fixture) -> Reader {
    f.buffer
        .new_reader()
        .unwrap_or_else(|e| panic!("[{}] new_reader() = {e}, want Ok", f.name))
}

pub async fn assert_read(name: &str, reader: &mut Reader, buf_size: usize, want: &str) {
    let mut buf = vec![0u8; buf_size];
    let n = tokio::time::timeout(TIMEOUT, reader.read(&mut buf))
        .await
        .unwrap_or_else(|_| panic!("[{name}] read blocked, want {want:?}"))
        .unwrap_or_else(|e| panic!("[{name}] read = {e}, want {want:?}"));
    assert_eq!(
        std::str::from_utf8(&buf[..n]).unwrap(),
        want,
        "[{name}] read data"
    );
}

pub async fn assert_read_closed(name: &str, reader: &mut Reader) {
    let mut buf = [0u8; 16];
    let result = tokio::time::timeout(TIMEOUT, reader.read(&mut buf))
        .await
        .unwrap_or_else(|_| panic!("[{name}] read blocked, want Closed"));
    assert!(
        matches!(result, Err(StreamError::Closed)),
        "[{name}] read = {result:?}, want Err(Closed)"
    );
}
