//! Bounded record conduit with backpressure for streaming pipelines.
//!
//! One [`channel`] connects two adjacent pipeline stages:
//!
//! ```text
//!   OutChannel ──▶ [VecDeque<Record> ring] ──▶ InChannel
//!                  ├── send waits when full (backpressure)
//!                  ├── recv waits when empty
//!                  ├── close / drop all senders → EOF for the reader
//!                  ├── drop reader → Closed for the writer
//!                  └── Interrupt::raise() → unblocks everything
//! ```
//!
//! Implementation uses `std::sync::Mutex` (not tokio) since critical
//! sections are just VecDeque operations. Closed flags are `AtomicBool`
//! so Drop stays synchronous. Wakers are stored under the lock to
//! prevent lost wakeups. Cancellation rides a
//! `tokio_util::sync::CancellationToken`: every waiting operation races
//! its token so a raise lands immediately, even mid-backpressure.

use std::collections::VecDeque;
use std::future::poll_fn;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Poll, Waker};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use rill_types::Record;

/// Default per-channel capacity, in records.
pub const CHANNEL_CAPACITY: usize = 64;

/// Cooperative cancellation handle shared by one evaluation run.
///
/// Cheap to clone; raising is idempotent and safe at any time, including
/// while nothing is blocked.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    token: CancellationToken,
}

impl Interrupt {
    pub fn new() -> Interrupt {
        Interrupt::default()
    }

    /// Trip the interrupt: every blocked channel operation returns with
    /// an `Interrupted` outcome, now and forever after.
    pub fn raise(&self) {
        self.token.cancel();
    }

    pub fn is_raised(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the interrupt has been raised.
    pub async fn raised(&self) {
        self.token.cancelled().await;
    }
}

/// Failure outcome of [`OutChannel::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The consumer is gone (or the channel was closed). Producers
    /// should wind down quietly, like a broken pipe.
    #[error("channel closed")]
    Closed,
    /// Cancellation fired while sending.
    #[error("interrupted")]
    Interrupted,
}

/// Failure outcome of [`InChannel::recv`]. EOF is not an error — it is
/// `Ok(None)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvError {
    /// Cancellation fired while receiving.
    #[error("interrupted")]
    Interrupted,
}

struct ChannelState {
    buffer: VecDeque<Record>,
    capacity: usize,
    /// Wakers of senders waiting for space.
    send_wakers: Vec<Waker>,
    /// Waker of the reader waiting for data.
    recv_waker: Option<Waker>,
}

struct Shared {
    state: Mutex<ChannelState>,
    /// Sender side closed: reader sees EOF once the buffer drains.
    closed: AtomicBool,
    /// Reader dropped: further sends fail with `Closed`.
    receiver_gone: AtomicBool,
    /// Live sender clones. The last drop closes the channel.
    senders: AtomicUsize,
    /// Null-sink mode: sends always succeed and discard the record.
    discard: bool,
    interrupt: Interrupt,
}

impl Shared {
    fn wake_receiver(&self) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(waker) = state.recv_waker.take() {
                waker.wake();
            }
        }
    }

    fn wake_senders(&self) {
        if let Ok(mut state) = self.state.lock() {
            for waker in state.send_wakers.drain(..) {
                waker.wake();
            }
        }
    }
}

/// Producing end of a record conduit.
///
/// `Clone` because the shared error sink has many producers; data
/// channels between stages stay point-to-point by convention.
pub struct OutChannel {
    shared: Arc<Shared>,
}

/// Consuming end of a record conduit.
pub struct InChannel {
    shared: Arc<Shared>,
}

/// Create a bounded record conduit.
pub fn channel(capacity: usize, interrupt: Interrupt) -> (OutChannel, InChannel) {
    let shared = Arc::new(Shared {
        state: Mutex::new(ChannelState {
            buffer: VecDeque::with_capacity(capacity.min(CHANNEL_CAPACITY)),
            capacity: capacity.max(1),
            send_wakers: Vec::new(),
            recv_waker: None,
        }),
        closed: AtomicBool::new(false),
        receiver_gone: AtomicBool::new(false),
        senders: AtomicUsize::new(1),
        discard: false,
        interrupt,
    });

    (
        OutChannel {
            shared: shared.clone(),
        },
        InChannel { shared },
    )
}

impl OutChannel {
    /// A sink whose sends always succeed and discard the record.
    pub fn null(interrupt: Interrupt) -> OutChannel {
        OutChannel {
            shared: Arc::new(Shared {
                state: Mutex::new(ChannelState {
                    buffer: VecDeque::new(),
                    capacity: 1,
                    send_wakers: Vec::new(),
                    recv_waker: None,
                }),
                closed: AtomicBool::new(false),
                receiver_gone: AtomicBool::new(false),
                senders: AtomicUsize::new(1),
                discard: true,
                interrupt,
            }),
        }
    }

    /// Deliver one record, waiting while the buffer is full.
    pub async fn send(&self, record: Record) -> Result<(), SendError> {
        tokio::select! {
            biased;
            _ = self.shared.interrupt.raised() => Err(SendError::Interrupted),
            result = self.push(record) => result,
        }
    }

    async fn push(&self, record: Record) -> Result<(), SendError> {
        let mut slot = Some(record);
        poll_fn(|cx| {
            if self.shared.discard {
                slot.take();
                return Poll::Ready(Ok(()));
            }
            if self.shared.receiver_gone.load(Ordering::Acquire)
                || self.shared.closed.load(Ordering::Acquire)
            {
                return Poll::Ready(Err(SendError::Closed));
            }

            let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());

            // Re-check under the lock: the reader may have raced away.
            if self.shared.receiver_gone.load(Ordering::Acquire) {
                return Poll::Ready(Err(SendError::Closed));
            }

            if state.buffer.len() < state.capacity {
                match slot.take() {
                    Some(record) => state.buffer.push_back(record),
                    None => return Poll::Ready(Ok(())),
                }
                if let Some(waker) = state.recv_waker.take() {
                    waker.wake();
                }
                Poll::Ready(Ok(()))
            } else {
                state.send_wakers.push(cx.waker().clone());
                Poll::Pending
            }
        })
        .await
    }

    /// Mark EOF for the consumer. Idempotent; later sends fail with
    /// [`SendError::Closed`].
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.wake_receiver();
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.shared.receiver_gone.load(Ordering::Acquire)
            || self.shared.closed.load(Ordering::Acquire)
    }

    /// The interrupt this channel races against.
    pub fn interrupt(&self) -> &Interrupt {
        &self.shared.interrupt
    }
}

impl Clone for OutChannel {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::AcqRel);
        OutChannel {
            shared: self.shared.clone(),
        }
    }
}

impl Drop for OutChannel {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.closed.store(true, Ordering::Release);
            self.shared.wake_receiver();
        }
    }
}

impl InChannel {
    /// An input that is already at EOF — what the first stage of a
    /// pipeline reads.
    pub fn empty(interrupt: Interrupt) -> InChannel {
        let (tx, rx) = channel(1, interrupt);
        tx.close();
        rx
    }

    /// Take the next record, waiting while the buffer is empty.
    /// `Ok(None)` is EOF.
    pub async fn recv(&mut self) -> Result<Option<Record>, RecvError> {
        tokio::select! {
            biased;
            _ = self.shared.interrupt.raised() => Err(RecvError::Interrupted),
            record = self.pull() => Ok(record),
        }
    }

    async fn pull(&self) -> Option<Record> {
        poll_fn(|cx| {
            let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());

            if let Some(record) = state.buffer.pop_front() {
                for waker in state.send_wakers.drain(..) {
                    waker.wake();
                }
                Poll::Ready(Some(record))
            } else if self.shared.closed.load(Ordering::Acquire) {
                Poll::Ready(None)
            } else {
                state.recv_waker = Some(cx.waker().clone());
                Poll::Pending
            }
        })
        .await
    }
}

impl Drop for InChannel {
    fn drop(&mut self) {
        self.shared.receiver_gone.store(true, Ordering::Release);
        self.shared.wake_senders();
    }
}

impl std::fmt::Debug for OutChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutChannel").finish()
    }
}

impl std::fmt::Debug for InChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InChannel").finish()
    }
}
