//! Simulated network latency.
//!
//! A [`LatencyQueue`] holds items until a fixed future time, decoupling when a
//! message arrives from when it is processed. Items are released in
//! eligible-time order; items with equal eligible times keep insertion order.
//! Nothing is ever dropped, merged or reordered beyond that.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Pending<T> {
    eligible_at: f64,
    seq: u64,
    item: T,
}

// Reversed so the max-heap pops the earliest eligible time first.
impl<T> Ord for Pending<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .eligible_at
            .total_cmp(&self.eligible_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Pending<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Pending<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Pending<T> {}

/// Time-ordered delivery buffer with a fixed delay.
pub struct LatencyQueue<T> {
    delay: f64,
    pending: BinaryHeap<Pending<T>>,
    next_seq: u64,
}

impl<T> LatencyQueue<T> {
    /// Creates an empty queue whose [`push`](Self::push) delays items by `delay` seconds.
    pub fn new(delay: f64) -> Self {
        Self {
            delay,
            pending: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Holds `item` until `eligible_at`.
    pub fn enqueue(&mut self, item: T, eligible_at: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Pending {
            eligible_at,
            seq,
            item,
        });
    }

    /// Holds `item` until `now` plus the queue's delay.
    pub fn push(&mut self, item: T, now: f64) {
        self.enqueue(item, now + self.delay);
    }

    /// Lazily removes and yields every item eligible at `now`, earliest first.
    ///
    /// Items not consumed from the iterator stay queued.
    pub fn drain_due(&mut self, now: f64) -> DrainDue<'_, T> {
        DrainDue { queue: self, now }
    }

    pub fn next_eligible_at(&self) -> Option<f64> {
        self.pending.peek().map(|pending| pending.eligible_at)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops everything still in flight.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Iterator returned by [`LatencyQueue::drain_due`].
pub struct DrainDue<'a, T> {
    queue: &'a mut LatencyQueue<T>,
    now: f64,
}

impl<T> Iterator for DrainDue<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.queue.pending.peek()?.eligible_at <= self.now {
            self.queue.pending.pop().map(|pending| pending.item)
        } else {
            None
        }
    }
}
