use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rocket::tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-identity FIFO queues. Work for one identity runs one task at a time in arrival order;
/// different identities never wait for each other.
///
/// A queue exists only while it has tasks, so idle identities cost nothing.
#[derive(Debug, Default)]
pub struct IdentityQueue {
    slots: Mutex<HashMap<String, Slot>>,
}

#[derive(Debug)]
struct Slot {
    turn: Arc<AsyncMutex<()>>,
    /// Tasks that hold or are waiting for `turn`.
    pending: usize,
}

/// Exclusive access for one identity. Dropping it lets the next task for that identity run.
#[must_use]
#[derive(Debug)]
pub struct IdentityTurn<'a> {
    // Fields drop in order: release the turn before leaving the queue.
    _guard: OwnedMutexGuard<()>,
    _ticket: Ticket<'a>,
}

/// A place in an identity's queue. Leaving the last place removes the queue.
#[derive(Debug)]
struct Ticket<'a> {
    queue: &'a IdentityQueue,
    identity: String,
}

impl IdentityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until all earlier tasks for `identity` are done.
    pub async fn enter(&self, identity: &str) -> IdentityTurn<'_> {
        // Taking the ticket is synchronous, so arrival order is fixed before we first yield.
        let (ticket, turn) = self.join(identity);
        let guard = turn.lock_owned().await;
        IdentityTurn {
            _guard: guard,
            _ticket: ticket,
        }
    }

    /// How many identities currently have queued or running tasks.
    pub fn active_identities(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn join(&self, identity: &str) -> (Ticket<'_>, Arc<AsyncMutex<()>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(identity.to_string()).or_insert_with(|| Slot {
            turn: Arc::new(AsyncMutex::new(())),
            pending: 0,
        });
        slot.pending += 1;
        let ticket = Ticket {
            queue: self,
            identity: identity.to_string(),
        };
        (ticket, slot.turn.clone())
    }

    fn leave(&self, identity: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(identity) {
            slot.pending -= 1;
            if slot.pending == 0 {
                slots.remove(identity);
            }
        }
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.queue.leave(&self.identity);
    }
}

#[cfg(test)]
impl IdentityQueue {
    /// Tasks holding or waiting for the given identity's turn.
    pub fn slot_pending(&self, identity: &str) -> usize {
        self.slots
            .lock()
            .unwrap()
            .get(identity)
            .map_or(0, |slot| slot.pending)
    }
}
