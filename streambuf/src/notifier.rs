//! Notifier
//!
//! One-to-many wakeup primitive based on rotating signal generations.
//!
//! # 1) Generations
//!
//! The notifier always holds exactly one live [`Signal`]. Any number of
//! clients can clone it with [`Notifier::wait`] and await it. A refresh
//! fires the live signal (waking everybody who holds it) and installs a
//! fresh one. A terminal close fires the live signal and keeps it: every
//! later `wait()` returns an already-fired signal.
//!
//! # 2) Waiting without missing a refresh
//!
//! The typical client workflow is "check condition, wait if not satisfied".
//! If the producer changes the condition and refreshes between the check
//! and the wait, the wakeup would be lost. To avoid this, capture the signal
//! *before* checking:
//!
//! ```ignore
//! loop {
//!     let signal = notifier.wait();
//!     if condition_satisfied() {
//!         break;
//!     }
//!     signal.await;
//! }
//! ```
//!
//! A refresh that happens after `wait()` fires the captured signal, so the
//! await returns immediately and the loop checks again.

use futures::future::{FutureExt, Shared};
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::error::{Result, StreamError};

/// One generation of the notifier.
///
/// Resolves once the generation is retired by a refresh or a close.
/// Cloning is cheap; all clones observe the same firing.
#[derive(Clone)]
pub struct Signal(Shared<oneshot::Receiver<()>>);

impl Signal {
    fn pair() -> (oneshot::Sender<()>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self(rx.shared()))
    }

    /// Check without blocking whether the signal has fired
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.clone().now_or_never().is_some()
    }
}

impl Future for Signal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // A dropped sender counts as fired, same as a sent one
        Pin::new(&mut self.0).poll(cx).map(|_| ())
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signal(fired={})", self.is_fired())
    }
}

struct Generation {
    sender: Option<oneshot::Sender<()>>,
    signal: Signal,
    rotations: u64,
    closed: bool,
}

/// Generation-based broadcast
///
/// # Thread Safety
///
/// The live generation is guarded by a `parking_lot::RwLock`: `wait()` takes
/// the shared side, `refresh()` and `close()` take the exclusive side. A
/// waiter therefore never observes a half-installed generation.
pub struct Notifier {
    inner: RwLock<Generation>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        let (sender, signal) = Signal::pair();
        Self {
            inner: RwLock::new(Generation {
                sender: Some(sender),
                signal,
                rotations: 0,
                closed: false,
            }),
        }
    }

    /// Get the live generation
    #[must_use]
    pub fn wait(&self) -> Signal {
        self.inner.read().signal.clone()
    }

    /// Retire the live generation, waking its holders, and install a new one.
    ///
    /// After a terminal close this is a no-op: the live generation stays fired.
    pub fn refresh(&self) {
        let retired = {
            let mut inner = self.inner.write();
            if inner.closed {
                return;
            }
            let (sender, signal) = Signal::pair();
            inner.signal = signal;
            inner.rotations += 1;
            inner.sender.replace(sender)
        };

        if let Some(sender) = retired {
            // Receivers may all be gone; nobody to wake then
            let _ = sender.send(());
        }
    }

    /// Fire the live generation permanently
    ///
    /// # Errors
    /// Returns `AlreadyClosed` on the second call
    pub fn close(&self) -> Result<()> {
        let retired = {
            let mut inner = self.inner.write();
            if inner.closed {
                return Err(StreamError::AlreadyClosed);
            }
            inner.closed = true;
            log::debug!("notifier: closing after {} rotations", inner.rotations);
            inner.sender.take()
        };

        if let Some(sender) = retired {
            let _ = sender.send(());
        }
        Ok(())
    }

    /// Check if the notifier is terminally closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        write!(
            f,
            "Notifier(rotations={}, closed={})",
            inner.rotations, inner.closed
        )
    }
}
