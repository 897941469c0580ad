//! Many writers, many blocked readers, concurrent close

mod common;

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use common::fixtures;
use streambuf::{Reader, StreamError};

/// Read until the stream reports Closed
async fn drain(mut reader: Reader) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 7];
    loop {
        match reader.read(&mut buf).await {
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(StreamError::Closed) => break,
            Err(e) => panic!("read = {e}, want data or Closed"),
        }
    }
    reader.close().unwrap();
    out
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fan_out_readers_see_full_content() {
    const READERS: usize = 8;

    for f in fixtures() {
        let buffer = Arc::new(f.buffer);
        let readers: Vec<_> = (0..READERS)
            .map(|_| tokio::spawn(drain(buffer.new_reader().unwrap())))
            .collect();

        let mut expected = Vec::new();
        for i in 0..100u32 {
            let chunk = format!("chunk-{i};");
            buffer.write(chunk.as_bytes()).unwrap();
            expected.extend_from_slice(chunk.as_bytes());
            if i % 10 == 0 {
                tokio::task::yield_now().await;
            }
        }

        tokio::time::timeout(Duration::from_secs(5), buffer.close_and_wait(pending()))
            .await
            .unwrap_or_else(|_| panic!("[{}] close_and_wait hung", f.name))
            .unwrap();

        for reader in readers {
            let got = reader.await.unwrap();
            assert_eq!(got, expected, "[{}] reader content", f.name);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_and_fast_readers_both_drain_before_close_completes() {
    for f in fixtures() {
        let buffer = Arc::new(f.buffer);
        let fast = tokio::spawn(drain(buffer.new_reader().unwrap()));
        let slow_reader = buffer.new_reader().unwrap();
        let slow = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drain(slow_reader).await
        });

        buffer.write(b"hello ").unwrap();
        buffer.write(b"file backend").unwrap();

        buffer
            .close_and_wait(tokio::time::sleep(Duration::from_secs(3)))
            .await
            .unwrap();

        assert_eq!(fast.await.unwrap(), b"hello file backend");
        assert_eq!(slow.await.unwrap(), b"hello file backend");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stress_writers_blocked_readers_and_close() {
    const WRITERS: usize = 8;
    const WRITES: usize = 50;
    const READERS: usize = 16;

    for f in fixtures() {
        let buffer = Arc::new(f.buffer);

        // Readers start blocked on an empty stream
        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let reader = buffer.new_reader().unwrap();
                tokio::spawn(async move {
                    let n = drain(reader).await.len();
                    assert_eq!(n % 4, 0, "reader saw a partial append");
                    n
                })
            })
            .collect();

        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let buffer = buffer.clone();
                tokio::spawn(async move {
                    for i in 0..WRITES {
                        let word = format!("{:02}{:02}", w, i % 100);
                        match buffer.write(word.as_bytes()) {
                            Ok(4) => {}
                            Err(StreamError::Closed) => return,
                            other => panic!("write = {other:?}"),
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(5)).await;
        tokio::time::timeout(Duration::from_secs(5), buffer.close_and_wait(pending()))
            .await
            .unwrap_or_else(|_| panic!("[{}] close_and_wait hung with blocked readers", f.name))
            .unwrap();

        for writer in writers {
            writer.await.unwrap();
        }
        let written = buffer.len();
        for reader in readers {
            // Nobody cancelled the wait, so every reader drained everything
            assert_eq!(reader.await.unwrap() as u64, written, "[{}]", f.name);
        }
    }
}
