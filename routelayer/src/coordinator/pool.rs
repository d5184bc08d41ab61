//! Bounded in-flight request pool with FIFO eviction.
//!
//! Each admitted request holds a [`Ticket`]: a cancellable token plus its
//! issue timestamp. The pool is not a queue. When it is full, the oldest
//! outstanding ticket is cancelled and evicted to admit the new one, so
//! superseded work is abandoned instead of stalling new requests behind it.

use std::collections::VecDeque;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Maximum number of unresolved provider requests held at once.
pub const MAX_IN_FLIGHT_REQUESTS: usize = 4;

/// Handle for one admitted request.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: u64,
    pub token: CancellationToken,
    pub issued_at: Instant,
}

struct PoolEntry {
    id: u64,
    token: CancellationToken,
}

pub struct RequestPool {
    capacity: usize,
    next_id: u64,
    outstanding: VecDeque<PoolEntry>,
}

impl Default for RequestPool {
    fn default() -> Self {
        Self::new(MAX_IN_FLIGHT_REQUESTS)
    }
}

impl RequestPool {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "pool capacity must be positive");
        Self {
            capacity,
            next_id: 0,
            outstanding: VecDeque::new(),
        }
    }

    /// Admits a new request, evicting (and cancelling) the oldest
    /// outstanding tickets first when at capacity.
    pub fn admit(&mut self) -> Ticket {
        while self.outstanding.len() >= self.capacity {
            if let Some(evicted) = self.outstanding.pop_front() {
                debug!(ticket = evicted.id, "evicting oldest in-flight request");
                evicted.token.cancel();
            }
        }

        let id = self.next_id;
        self.next_id += 1;

        let token = CancellationToken::new();
        self.outstanding.push_back(PoolEntry {
            id,
            token: token.clone(),
        });

        Ticket {
            id,
            token,
            issued_at: Instant::now(),
        }
    }

    /// Removes a ticket after its request resolved (success or failure).
    /// Evicted tickets are already gone; settling them again is harmless.
    pub fn settle(&mut self, id: u64) {
        self.outstanding.retain(|entry| entry.id != id);
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_bound_evicts_oldest_in_issue_order() {
        let mut pool = RequestPool::default();
        let tickets: Vec<Ticket> = (0..6).map(|_| pool.admit()).collect();

        // Exactly the 4 most recently issued remain outstanding.
        assert_eq!(pool.outstanding(), MAX_IN_FLIGHT_REQUESTS);

        // The two earliest were cancelled, in issue order; the rest were not.
        assert!(tickets[0].token.is_cancelled());
        assert!(tickets[1].token.is_cancelled());
        for ticket in &tickets[2..] {
            assert!(!ticket.token.is_cancelled());
        }
    }

    #[test]
    fn test_settle_frees_a_slot() {
        let mut pool = RequestPool::new(2);
        let first = pool.admit();
        let second = pool.admit();

        pool.settle(first.id);
        assert_eq!(pool.outstanding(), 1);

        // With a free slot, admitting does not evict the survivor.
        let third = pool.admit();
        assert!(!second.token.is_cancelled());
        assert!(!third.token.is_cancelled());
        assert_eq!(pool.outstanding(), 2);
    }

    #[test]
    fn test_settle_evicted_ticket_is_harmless() {
        let mut pool = RequestPool::new(1);
        let first = pool.admit();
        let _second = pool.admit();

        assert!(first.token.is_cancelled());
        pool.settle(first.id);
        assert_eq!(pool.outstanding(), 1);
    }

    #[test]
    fn test_issue_times_are_monotonic() {
        let mut pool = RequestPool::default();
        let a = pool.admit();
        let b = pool.admit();
        assert!(b.issued_at >= a.issued_at);
        assert!(b.id > a.id);
    }
}
