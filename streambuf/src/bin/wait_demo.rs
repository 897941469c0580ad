//! Draining close demo
//!
//! A first reader and a late reader follow a file-backed stream. The buffer
//! is closed with `close_and_wait` and a 3 second budget, so the late reader
//! still drains everything.

use std::time::Duration;

use streambuf::{Reader, StreamBuffer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let path = std::env::temp_dir().join("streambuf-wait-demo.log");
    let buffer = StreamBuffer::open(&path)?;

    let first = buffer.new_reader()?;
    let first_task = tokio::spawn(read_all(first));

    buffer.write(b"hello file backend")?;

    let late = buffer.new_reader()?;
    let late_task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        read_all(late).await
    });

    buffer
        .close_and_wait(tokio::time::sleep(Duration::from_secs(3)))
        .await?;

    let (first_bytes, late_bytes) = tokio::join!(first_task, late_task);

    println!("first reader: {}", String::from_utf8_lossy(&first_bytes?));
    // The wait budget outlasts the late reader, so it sees everything too
    println!("late reader: {}", String::from_utf8_lossy(&late_bytes?));

    std::fs::remove_file(&path)?;
    Ok(())
}

async fn read_all(mut reader: Reader) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4];

    while let Ok(n) = reader.read(&mut buf).await {
        out.extend_from_slice(&buf[..n]);
    }

    if let Err(e) = reader.close() {
        eprintln!("reader close: {e}");
    }
    out
}
