//! Live-reader counter
//!
//! A countable wait-group: readers are added on creation and removed on
//! close, and the buffer's close path can wait until the count drains to
//! zero. Backed by a `tokio::sync::watch` channel, so a waiter that
//! subscribes after the last reader left still sees zero.

use tokio::sync::watch;

#[derive(Debug)]
pub(crate) struct ReaderCount {
    live: watch::Sender<usize>,
}

impl ReaderCount {
    pub(crate) fn new() -> Self {
        let (live, _) = watch::channel(0);
        Self { live }
    }

    pub(crate) fn add(&self) {
        self.live.send_modify(|n| *n += 1);
    }

    pub(crate) fn done(&self) {
        self.live.send_modify(|n| {
            debug_assert!(*n > 0, "reader count underflow");
            *n = n.saturating_sub(1);
        });
    }

    pub(crate) fn get(&self) -> usize {
        *self.live.borrow()
    }

    /// Resolve once no readers are live
    pub(crate) async fn wait_idle(&self) {
        let mut rx = self.live.subscribe();
        // The sender lives in `self`, so the channel cannot close under us
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_idle_when_empty() {
        let count = ReaderCount::new();
        assert_eq!(count.get(), 0);
        assert!(count.wait_idle().now_or_never().is_some());
    }

    #[test]
    fn test_not_idle_while_reader_live() {
        let count = ReaderCount::new();
        count.add();
        count.add();
        assert_eq!(count.get(), 2);
        assert!(count.wait_idle().now_or_never().is_none());

        count.done();
        assert!(count.wait_idle().now_or_never().is_none());

        count.done();
        assert!(count.wait_idle().now_or_never().is_some());
    }

    #[tokio::test]
    async fn test_wait_idle_wakes_on_last_done() {
        let count = std::sync::Arc::new(ReaderCount::new());
        count.add();

        let waiter = {
            let count = count.clone();
            tokio::spawn(async move { count.wait_idle().await })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        count.done();
        waiter.await.unwrap();
    }
}
