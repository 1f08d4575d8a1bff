//! Serialization of everything that mutates the ledger.
//!
//! Three primitives, always taken in this order:
//!
//! 1. the per-identity queue, so one participant's requests are handled in arrival order;
//! 2. the ballot critical section, held for exactly the vote-casting transaction;
//! 3. the global write queue, through which every mutating store operation passes.
//!
//! The order is enforced by the signatures below: casting requires an [`IdentityTurn`], and the
//! write queue is always the innermost lock.

mod fifo;
mod identity;

use std::future::Future;

pub use fifo::FifoLock;
pub use identity::{IdentityQueue, IdentityTurn};

#[derive(Debug)]
pub struct SubmissionSerializer {
    identities: IdentityQueue,
    ballots: FifoLock,
    writes: FifoLock,
}

impl Default for SubmissionSerializer {
    fn default() -> Self {
        Self {
            identities: IdentityQueue::new(),
            ballots: FifoLock::new("ballot critical section"),
            writes: FifoLock::new("write queue"),
        }
    }
}

impl SubmissionSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one external identity.
    pub async fn identity(&self, identity: &str) -> IdentityTurn<'_> {
        self.identities.enter(identity).await
    }

    /// Run a vote-casting operation inside the ballot critical section and the write queue.
    pub async fn cast<F, T>(&self, _turn: &IdentityTurn<'_>, op: F) -> T
    where
        F: Future<Output = T>,
    {
        let _ballot = self.ballots.lock().await;
        let _write = self.writes.lock().await;
        op.await
    }

    /// Run any other mutating operation in the write queue.
    pub async fn write<F, T>(&self, op: F) -> T
    where
        F: Future<Output = T>,
    {
        let _write = self.writes.lock().await;
        op.await
    }

    /// How many identities currently have queued or running tasks.
    pub fn active_identities(&self) -> usize {
        self.identities.active_identities()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };
    use std::time::Duration;

    use rocket::tokio::{self, time::sleep};

    use super::*;

    #[rocket::async_test]
    async fn identity_tasks_run_in_arrival_order() {
        let serializer = Arc::new(SubmissionSerializer::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        // Hold the identity so every task below queues up behind us.
        let first = serializer.identity("alice").await;
        let mut handles = Vec::new();
        for i in 0..10 {
            let task_serializer = serializer.clone();
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                let _turn = task_serializer.identity("alice").await;
                // Later tasks finish faster, so any reordering would show.
                sleep(Duration::from_millis(10 - i)).await;
                log.lock().unwrap().push(i);
            }));
            // Let the task take its place in the queue before spawning the next.
            while serializer.identities.slot_pending("alice") < i as usize + 2 {
                tokio::task::yield_now().await;
            }
        }
        drop(first);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*log.lock().unwrap(), (0..10).collect::<Vec<_>>());
        assert_eq!(serializer.active_identities(), 0);
    }

    #[rocket::async_test]
    async fn identities_are_independent() {
        let serializer = SubmissionSerializer::new();
        let _alice = serializer.identity("alice").await;
        // Would hang if identities shared a queue.
        let bob = tokio::time::timeout(Duration::from_secs(1), serializer.identity("bob")).await;
        assert!(bob.is_ok());
        assert_eq!(serializer.active_identities(), 2);
        drop(bob);
        assert_eq!(serializer.active_identities(), 1);
    }

    #[rocket::async_test]
    async fn abandoned_waiters_leave_the_queue() {
        let serializer = SubmissionSerializer::new();
        let held = serializer.identity("alice").await;
        let waiting =
            tokio::time::timeout(Duration::from_millis(20), serializer.identity("alice")).await;
        assert!(waiting.is_err());
        drop(held);
        assert_eq!(serializer.active_identities(), 0);
    }

    #[rocket::async_test]
    async fn casts_are_mutually_exclusive() {
        let serializer = Arc::new(SubmissionSerializer::new());
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..8 {
            let serializer = serializer.clone();
            let running = running.clone();
            let max_running = max_running.clone();
            handles.push(tokio::spawn(async move {
                let identity = format!("voter-{i}");
                let turn = serializer.identity(&identity).await;
                serializer
                    .cast(&turn, async {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        max_running.fetch_max(now, Ordering::SeqCst);
                        sleep(Duration::from_millis(5)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_running.load(Ordering::SeqCst), 1);
    }

    #[rocket::async_test]
    async fn writes_wait_for_casts() {
        let serializer = Arc::new(SubmissionSerializer::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let turn = serializer.identity("alice").await;
        let writer = {
            let serializer = serializer.clone();
            let log = log.clone();
            async move {
                // Give the cast a head start so it holds the write queue.
                sleep(Duration::from_millis(5)).await;
                serializer
                    .write(async { log.lock().unwrap().push("write") })
                    .await;
            }
        };
        let cast = serializer.cast(&turn, async {
            sleep(Duration::from_millis(30)).await;
            log.lock().unwrap().push("cast");
        });
        tokio::join!(cast, writer);

        assert_eq!(*log.lock().unwrap(), vec!["cast", "write"]);
    }
}
