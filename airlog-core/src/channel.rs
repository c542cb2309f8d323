//! Sensor Channel: single-producer/single-consumer hand-off queue
//!
//! ## Overview
//!
//! Each sensor task hands its raw samples to the aggregator through one
//! channel. The channel is split into a [`SampleSender`] and a
//! [`SampleReceiver`]; neither half is `Clone`, so exactly one producer and
//! one consumer exist by construction.
//!
//! ```text
//! Sensor task                        Aggregator
//!      ↓                                 ↓
//!   push() ────→ lock-free queue ←──── try_pop()
//!      ↓                                 ↓
//!  never blocks                     never blocks
//! ```
//!
//! ## Capacity Policy
//!
//! The policy is fixed when the channel is created:
//!
//! | Policy              | Slow consumer behaviour                          |
//! |---------------------|--------------------------------------------------|
//! | `DropOldest(n)`     | Oldest unread sample is discarded, memory bounded |
//! | `Unbounded`         | Nothing is lost, memory grows with the backlog    |
//!
//! `DropOldest` favours freshness: a logger that fell behind records what the
//! sensor reads now, not what it read a minute ago. Drops are counted in
//! [`ChannelStats`].
//!
//! ## Ordering
//!
//! Samples pop in the order they were pushed. Nothing is guaranteed across
//! channels.

use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_queue::{ArrayQueue, SegQueue};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_CHANNEL_CAPACITY;
use crate::sample::RawSample;

/// Capacity policy of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Hold at most `n` samples; pushing into a full channel evicts the oldest
    DropOldest(usize),
    /// Never drop; grows without limit
    Unbounded,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self::DropOldest(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Result of a non-blocking pop
#[derive(Debug, Clone, PartialEq)]
pub enum TryPop {
    /// Oldest unread sample
    Data(RawSample),
    /// Nothing waiting
    Empty,
}

impl TryPop {
    /// Convert into an `Option`
    pub fn into_option(self) -> Option<RawSample> {
        match self {
            Self::Data(sample) => Some(sample),
            Self::Empty => None,
        }
    }
}

/// Channel health counters
///
/// Updated with relaxed atomics; they are diagnostics, not synchronisation.
#[derive(Debug, Default)]
pub struct ChannelStats {
    /// Samples pushed
    pub pushed: AtomicU64,
    /// Samples popped
    pub popped: AtomicU64,
    /// Samples evicted because the channel was full
    pub dropped: AtomicU64,
    /// Deepest backlog observed
    pub max_depth: AtomicU64,
}

impl ChannelStats {
    /// Update max depth if current is higher
    fn update_max_depth(&self, current: u64) {
        let mut max = self.max_depth.load(Ordering::Relaxed);
        while current > max {
            match self.max_depth.compare_exchange_weak(
                max,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => max = actual,
            }
        }
    }

    /// Copy the counters out
    pub fn snapshot(&self) -> ChannelStatsSnapshot {
        ChannelStatsSnapshot {
            pushed: self.pushed.load(Ordering::Relaxed),
            popped: self.popped.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            max_depth: self.max_depth.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ChannelStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStatsSnapshot {
    /// Samples pushed
    pub pushed: u64,
    /// Samples popped
    pub popped: u64,
    /// Samples evicted
    pub dropped: u64,
    /// Deepest backlog observed
    pub max_depth: u64,
}

enum Queue {
    Bounded(ArrayQueue<RawSample>),
    Unbounded(SegQueue<RawSample>),
}

impl Queue {
    fn len(&self) -> usize {
        match self {
            Self::Bounded(q) => q.len(),
            Self::Unbounded(q) => q.len(),
        }
    }
}

struct Shared {
    queue: Queue,
    policy: CapacityPolicy,
    stats: ChannelStats,
}

/// Create a channel with the given capacity policy
///
/// A `DropOldest(0)` request is raised to a capacity of one.
///
/// ```rust
/// use airlog_core::channel::{channel, CapacityPolicy, TryPop};
/// use airlog_core::sample::{RawPayload, RawSample};
///
/// let (mut tx, mut rx) = channel(CapacityPolicy::DropOldest(4));
/// tx.push(RawSample::new(RawPayload::EdgeCount { count: 3, window_s: 2.0 }, 0.0));
///
/// assert!(matches!(rx.try_pop(), TryPop::Data(_)));
/// assert_eq!(rx.try_pop(), TryPop::Empty);
/// ```
pub fn channel(policy: CapacityPolicy) -> (SampleSender, SampleReceiver) {
    let (queue, policy) = match policy {
        CapacityPolicy::DropOldest(capacity) => {
            let capacity = capacity.max(1);
            (
                Queue::Bounded(ArrayQueue::new(capacity)),
                CapacityPolicy::DropOldest(capacity),
            )
        }
        CapacityPolicy::Unbounded => (Queue::Unbounded(SegQueue::new()), CapacityPolicy::Unbounded),
    };

    let shared = Arc::new(Shared {
        queue,
        policy,
        stats: ChannelStats::default(),
    });

    (
        SampleSender { shared: Arc::clone(&shared) },
        SampleReceiver { shared },
    )
}

/// Producer half, owned by one sensor task
pub struct SampleSender {
    shared: Arc<Shared>,
}

impl SampleSender {
    /// Hand a sample to the consumer
    ///
    /// Never blocks and never fails. On a full bounded channel the oldest
    /// unread sample is evicted to make room.
    pub fn push(&mut self, sample: RawSample) {
        let shared = &*self.shared;
        match &shared.queue {
            Queue::Bounded(queue) => {
                if queue.force_push(sample).is_some() {
                    shared.stats.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            Queue::Unbounded(queue) => queue.push(sample),
        }
        shared.stats.pushed.fetch_add(1, Ordering::Relaxed);
        shared.stats.update_max_depth(shared.queue.len() as u64);
    }

    /// Capacity policy
    pub fn policy(&self) -> CapacityPolicy {
        self.shared.policy
    }

    /// Whether the receiving half has been dropped
    pub fn is_disconnected(&self) -> bool {
        Arc::strong_count(&self.shared) < 2
    }
}

/// Consumer half, owned by the aggregator
pub struct SampleReceiver {
    shared: Arc<Shared>,
}

impl SampleReceiver {
    /// Take the oldest unread sample without blocking
    pub fn try_pop(&mut self) -> TryPop {
        let popped = match &self.shared.queue {
            Queue::Bounded(queue) => queue.pop(),
            Queue::Unbounded(queue) => queue.pop(),
        };

        match popped {
            Some(sample) => {
                self.shared.stats.popped.fetch_add(1, Ordering::Relaxed);
                TryPop::Data(sample)
            }
            None => TryPop::Empty,
        }
    }

    /// Samples waiting
    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    /// Whether no sample is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity policy
    pub fn policy(&self) -> CapacityPolicy {
        self.shared.policy
    }

    /// Channel counters
    pub fn stats(&self) -> &ChannelStats {
        &self.shared.stats
    }
}
