//! # Stream Module
//!
//! Pull-based response streaming over `may` coroutine channels.
//!
//! ## Overview
//!
//! A stream channel pairs a [`StreamSender`] (producer side, usually a
//! coroutine spawned by a handler) with a [`StreamReceiver`] (consumer side,
//! handed to the transport inside a streaming response body). Production is
//! driven by consumer demand: the sender must acquire a credit issued by the
//! receiver before every frame, so it can never buffer more than the channel
//! capacity ahead of a slow consumer.
//!
//! ## Cancellation
//!
//! Dropping the receiver (client abort) trips the shared [`CancelToken`] and
//! closes the credit channel. A blocked or subsequent [`StreamSender::send`]
//! then fails, the producer's loop ends, and any resources it holds unwind
//! through normal drops. The same token is exposed on the request context so
//! in-flight handlers can observe cancellation directly.
//!
//! ## SSE framing
//!
//! [`StreamSender::send_event`] formats a frame per the `text/event-stream`
//! wire format (`data: <payload>\n\n`) for routes declared with the
//! event-stream media kind.

use may::sync::mpsc;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::runtime_config::RuntimeConfig;

/// Shared cancellation flag for one request.
///
/// Cloned into the request context and into stream endpoints; once set it
/// never clears.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every holder of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Why a send failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// The consumer cancelled (receiver dropped or token tripped).
    Cancelled,
    /// The frame channel closed before the frame was accepted.
    Closed,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Cancelled => f.write_str("stream cancelled by consumer"),
            StreamError::Closed => f.write_str("stream closed"),
        }
    }
}

impl std::error::Error for StreamError {}

/// Producer side of a stream channel. Single-owner: hand it to the one
/// producer coroutine driving the response body.
pub struct StreamSender {
    frames: mpsc::Sender<String>,
    credits: mpsc::Receiver<()>,
    cancel: CancelToken,
}

impl StreamSender {
    /// Send one frame, blocking the calling coroutine until the consumer
    /// issues a credit.
    ///
    /// # Errors
    ///
    /// Fails with [`StreamError::Cancelled`] once the receiver is dropped or
    /// the cancel token is tripped; the producer should stop and let its
    /// resources unwind.
    pub fn send(&self, frame: impl Into<String>) -> Result<(), StreamError> {
        if self.cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
        // Demand-driven: wait for the consumer to hand back a credit.
        self.credits.recv().map_err(|_| StreamError::Cancelled)?;
        if self.cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
        self.frames
            .send(frame.into())
            .map_err(|_| StreamError::Closed)
    }

    /// Send a `text/event-stream` framed event.
    pub fn send_event(&self, data: impl AsRef<str>) -> Result<(), StreamError> {
        let mut frame = String::with_capacity(data.as_ref().len() + 8);
        frame.push_str("data: ");
        frame.push_str(data.as_ref());
        frame.push_str("\n\n");
        self.send(frame)
    }

    /// Token shared with the consumer side.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

/// Consumer side of a stream channel.
///
/// Dropping the receiver cancels the stream.
pub struct StreamReceiver {
    frames: mpsc::Receiver<String>,
    credits: mpsc::Sender<()>,
    cancel: CancelToken,
}

impl StreamReceiver {
    /// Receive the next frame, issuing a fresh credit to the producer.
    ///
    /// Returns `None` once every sender is gone and the channel drained.
    pub fn recv(&self) -> Option<String> {
        match self.frames.recv() {
            Ok(frame) => {
                let _ = self.credits.send(());
                Some(frame)
            }
            Err(_) => None,
        }
    }

    /// Drain the stream into one string. Blocks until the producer side
    /// finishes.
    #[must_use]
    pub fn collect(self) -> String {
        let mut out = String::new();
        while let Some(frame) = self.recv() {
            out.push_str(&frame);
        }
        out
    }

    /// Token shared with the producer side.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

impl Drop for StreamReceiver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for StreamReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReceiver")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Create a stream channel with the given credit capacity (minimum 1).
///
/// The producer can run at most `capacity` frames ahead of the consumer.
#[must_use]
pub fn channel(capacity: usize) -> (StreamSender, StreamReceiver) {
    let (frame_tx, frame_rx) = mpsc::channel();
    let (credit_tx, credit_rx) = mpsc::channel();
    for _ in 0..capacity.max(1) {
        let _ = credit_tx.send(());
    }
    let cancel = CancelToken::new();
    (
        StreamSender {
            frames: frame_tx,
            credits: credit_rx,
            cancel: cancel.clone(),
        },
        StreamReceiver {
            frames: frame_rx,
            credits: credit_tx,
            cancel,
        },
    )
}

/// Spawn a stream producer coroutine with the configured stack size.
///
/// # Errors
///
/// Propagates the spawn failure when the runtime cannot allocate the
/// coroutine.
pub fn spawn_producer<F>(
    config: &RuntimeConfig,
    f: F,
) -> std::io::Result<may::coroutine::JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    // SAFETY: may::coroutine::Builder::spawn is unsafe by runtime contract.
    // The closure is Send + 'static and communicates only over channels and
    // the cancel token, so it holds no references into the spawning frame.
    unsafe {
        may::coroutine::Builder::new()
            .stack_size(config.stack_size)
            .spawn(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_flow_in_order() {
        let (tx, rx) = channel(4);
        tx.send("a").unwrap();
        tx.send("b").unwrap();
        drop(tx);
        assert_eq!(rx.recv().as_deref(), Some("a"));
        assert_eq!(rx.recv().as_deref(), Some("b"));
        assert!(rx.recv().is_none());
    }

    #[test]
    fn sse_framing() {
        let (tx, rx) = channel(2);
        tx.send_event("tick").unwrap();
        drop(tx);
        assert_eq!(rx.collect(), "data: tick\n\n");
    }

    #[test]
    fn dropping_receiver_fails_sends() {
        let (tx, rx) = channel(1);
        drop(rx);
        assert_eq!(tx.send("late"), Err(StreamError::Cancelled));
        assert!(tx.cancel_token().is_cancelled());
    }

    #[test]
    fn capacity_bounds_unconsumed_frames() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (tx, rx) = channel(1);
        let progress = Arc::new(AtomicUsize::new(0));
        let seen = progress.clone();
        let handle = spawn_producer(&RuntimeConfig::default(), move || {
            for frame in ["1", "2"] {
                tx.send(frame).unwrap();
                seen.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        // With one credit the producer cannot run ahead of the consumer.
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(progress.load(Ordering::SeqCst), 1);

        assert_eq!(rx.recv().as_deref(), Some("1"));
        assert_eq!(rx.recv().as_deref(), Some("2"));
        handle.join().unwrap();
        assert_eq!(progress.load(Ordering::SeqCst), 2);
    }
}
