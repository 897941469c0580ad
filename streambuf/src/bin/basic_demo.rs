//! Immediate close demo
//!
//! A fast and a slow reader follow a file-backed stream. The buffer is
//! closed without waiting, so the slow reader misses the content.

use std::time::Duration;

use streambuf::{Reader, StreamBuffer, StreamError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let path = std::env::temp_dir().join("streambuf-basic-demo.log");
    let buffer = StreamBuffer::open(&path)?;

    let fast = buffer.new_reader()?;
    let slow = buffer.new_reader()?;

    let fast_task = tokio::spawn(read_all(fast));
    let slow_task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        read_all(slow).await
    });

    buffer.write(b"hello ")?;
    buffer.write(b"file backend")?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    buffer.close()?;

    let (fast_bytes, slow_bytes) = tokio::join!(fast_task, slow_task);

    // Fast reader has all contents
    println!("fast reader: {}", String::from_utf8_lossy(&fast_bytes?));
    // Slow reader is missing contents due to close ending readers immediately
    println!("slow reader: {}", String::from_utf8_lossy(&slow_bytes?));

    std::fs::remove_file(&path)?;
    Ok(())
}

async fn read_all(mut reader: Reader) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4];

    loop {
        match reader.read(&mut buf).await {
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(StreamError::Closed) => break,
            Err(e) => {
                eprintln!("read error: {e}");
                break;
            }
        }
    }

    if let Err(e) = reader.close() {
        eprintln!("reader close: {e}");
    }
    out
}
