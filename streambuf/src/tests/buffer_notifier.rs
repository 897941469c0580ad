use crate::error::StreamError;
use crate::StreamBuffer;

#[test]
fn test_write_and_close_signal_waiters() {
    let buffer = StreamBuffer::memory();

    let first = buffer.notifier().wait();
    assert!(!first.is_fired(), "initial generation should be open");

    buffer.write(b"x").unwrap();
    assert!(first.is_fired(), "generation should fire after write");

    let second = buffer.notifier().wait();
    assert!(!second.is_fired(), "refreshed generation should be open");

    buffer.close().unwrap();
    assert!(second.is_fired(), "generation should fire after close");
}

#[test]
fn test_empty_write_does_not_rotate() {
    let buffer = StreamBuffer::memory();
    let signal = buffer.notifier().wait();

    assert_eq!(buffer.write(b"").unwrap(), 0);
    assert!(!signal.is_fired());

    buffer.close().unwrap();
}

#[tokio::test]
async fn test_close_and_wait_completes_with_notifier_already_closed() {
    let buffer = StreamBuffer::memory();
    buffer.write(b"abc").unwrap();
    let mut reader = buffer.new_reader().unwrap();
    buffer.notifier().close().unwrap();

    // The close still runs to the end and releases the reader side
    buffer
        .close_and_wait(std::future::ready(()))
        .await
        .unwrap();
    assert!(buffer.is_closed());

    let mut buf = [0u8; 4];
    assert!(matches!(reader.read(&mut buf).await, Err(StreamError::Closed)));
    assert!(matches!(buffer.close(), Err(StreamError::AlreadyClosed)));
}
