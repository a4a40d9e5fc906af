use std::{cmp::Ordering, collections::BinaryHeap};

use fxhash::FxHashSet;
use parking_lot::{Condvar, Mutex};

use crate::point::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshRequest {
    /// Popularity of the invalidated entry; popular routes are recomputed first
    pub priority: u64,
    pub origin: Point,
    pub destination: Point,
}

impl PartialOrd for RefreshRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RefreshRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.origin.cmp(&self.origin))
            .then_with(|| other.destination.cmp(&self.destination))
    }
}

struct QueueState {
    heap: BinaryHeap<RefreshRequest>,
    pending: FxHashSet<(Point, Point)>,
    closed: bool,
}

/// Priority queue of paths to recompute after an invalidation.
pub struct RefreshQueue {
    state: Mutex<QueueState>,
    cvar: Condvar,
}

impl RefreshQueue {
    pub fn new() -> Self {
        RefreshQueue {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                pending: FxHashSet::default(),
                closed: false,
            }),
            cvar: Condvar::new(),
        }
    }

    /// Returns false when the request was already pending or the queue is closed.
    pub fn push(&self, request: RefreshRequest) -> bool {
        let mut state = self.state.lock();
        if state.closed || !state.pending.insert((request.origin, request.destination)) {
            return false;
        }
        state.heap.push(request);
        self.cvar.notify_one();
        true
    }

    pub fn try_pop(&self) -> Option<RefreshRequest> {
        let mut state = self.state.lock();
        let request = state.heap.pop()?;
        state
            .pending
            .remove(&(request.origin, request.destination));
        Some(request)
    }

    /// Blocks until a request is available. Returns `None` once the queue is closed.
    pub fn pop_blocking(&self) -> Option<RefreshRequest> {
        let mut state = self.state.lock();
        self.cvar
            .wait_while(&mut state, |state| state.heap.is_empty() && !state.closed);

        if state.closed {
            return None;
        }

        let request = state.heap.pop()?;
        state
            .pending
            .remove(&(request.origin, request.destination));
        Some(request)
    }

    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.heap.clear();
        state.pending.clear();
        self.cvar.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl Default for RefreshQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(priority: u64, x: i32) -> RefreshRequest {
        RefreshRequest {
            priority,
            origin: Point::new(x, 0),
            destination: Point::new(x, 1),
        }
    }

    #[test]
    fn test_pops_highest_priority_first() {
        let queue = RefreshQueue::new();
        queue.push(request(1, 0));
        queue.push(request(5, 1));
        queue.push(request(3, 2));

        assert_eq!(queue.try_pop().map(|r| r.priority), Some(5));
        assert_eq!(queue.try_pop().map(|r| r.priority), Some(3));
        assert_eq!(queue.try_pop().map(|r| r.priority), Some(1));
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_deduplicates_pending_requests() {
        let queue = RefreshQueue::new();
        assert!(queue.push(request(1, 0)));
        assert!(!queue.push(request(7, 0)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_close_releases_waiters() {
        let queue = std::sync::Arc::new(RefreshQueue::new());
        let waiter = {
            let queue = std::sync::Arc::clone(&queue);
            std::thread::spawn(move || queue.pop_blocking())
        };
        queue.close();
        assert!(waiter.join().unwrap().is_none());
        assert!(!queue.push(request(1, 0)));
    }
}
