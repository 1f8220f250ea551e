//! Per-partition bounded queue.
//!
//! Every partition owns one [`BoundedQueue`]: storage, count, shutdown flag and
//! both condition variables live behind a single lock. The shutdown flag is
//! only written and read under that lock, so a reducer that checked
//! "empty and not shut down" cannot sleep through the broadcast.

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// A producer tried to enqueue after the shutdown broadcast.
    #[error("partition {partition} queue is closed for shutdown")]
    Closed { partition: usize },
}

/// Result of a blocking [`BoundedQueue::get`].
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued<T> {
    Item(T),
    /// Queue is empty and will never receive another item.
    Shutdown,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QueueMetrics {
    pub partition: usize,
    pub capacity: usize,
    pub puts: u64,
    pub gets: u64,
    /// Number of `put` calls that had to wait for space.
    pub blocked_puts: u64,
    /// Number of `get` calls that had to wait for an item or the shutdown broadcast.
    pub blocked_gets: u64,
    pub peak_depth: usize,
}

pub struct BoundedQueue<T> {
    partition: usize,
    capacity: usize,
    state: Mutex<QueueState<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

struct QueueState<T> {
    items: VecDeque<T>,
    shutdown: bool,
    puts: u64,
    gets: u64,
    blocked_puts: u64,
    blocked_gets: u64,
    peak_depth: usize,
}

impl<T> BoundedQueue<T> {
    /// Panics if `capacity` is zero.
    pub fn new(partition: usize, capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            partition,
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                shutdown: false,
                puts: 0,
                gets: 0,
                blocked_puts: 0,
                blocked_gets: 0,
                peak_depth: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    pub fn partition(&self) -> usize { self.partition }

    pub fn capacity(&self) -> usize { self.capacity }

    /// Appends `item`, blocking while the queue is full.
    ///
    /// Wakes at most one blocked consumer. Fails only when the queue was
    /// already closed for shutdown; the item is dropped in that case.
    pub fn put(&self, item: T) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        if state.items.len() == self.capacity && !state.shutdown {
            state.blocked_puts += 1;
            while state.items.len() == self.capacity && !state.shutdown {
                self.not_full.wait(&mut state);
            }
        }
        if state.shutdown {
            return Err(QueueError::Closed { partition: self.partition });
        }
        state.items.push_back(item);
        state.puts += 1;
        let depth = state.items.len();
        debug_assert!(depth <= self.capacity, "queue {} over capacity", self.partition);
        if depth > state.peak_depth {
            state.peak_depth = depth;
        }
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes the head item, blocking while the queue is empty and not shut down.
    ///
    /// Items still queued at shutdown are returned before [`Dequeued::Shutdown`].
    pub fn get(&self) -> Dequeued<T> {
        let mut state = self.state.lock();
        if state.items.is_empty() && !state.shutdown {
            state.blocked_gets += 1;
            while state.items.is_empty() && !state.shutdown {
                self.not_empty.wait(&mut state);
            }
        }
        match state.items.pop_front() {
            Some(item) => {
                state.gets += 1;
                self.not_full.notify_one();
                Dequeued::Item(item)
            }
            None => Dequeued::Shutdown,
        }
    }

    /// Non-blocking `get`.
    pub fn try_get(&self) -> Option<T> {
        let mut state = self.state.lock();
        let item = state.items.pop_front()?;
        state.gets += 1;
        self.not_full.notify_one();
        Some(item)
    }

    /// Sets the shutdown flag under the queue lock and wakes every waiter.
    ///
    /// Only valid once all producers for this partition have finished.
    pub fn close_for_shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        self.not_empty.notify_all();
        // producers still waiting here are a protocol violation; release them so they can fail
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool { self.state.lock().shutdown }

    pub fn len(&self) -> usize { self.state.lock().items.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn metrics(&self) -> QueueMetrics {
        let state = self.state.lock();
        QueueMetrics {
            partition: self.partition,
            capacity: self.capacity,
            puts: state.puts,
            gets: state.gets,
            blocked_puts: state.blocked_puts,
            blocked_gets: state.blocked_gets,
            peak_depth: state.peak_depth,
        }
    }
}
