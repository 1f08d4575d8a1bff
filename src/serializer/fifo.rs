use rocket::tokio::sync::{Mutex, MutexGuard};

/// A lock that is granted strictly in the order it was requested.
#[derive(Debug)]
pub struct FifoLock {
    name: &'static str,
    inner: Mutex<()>,
}

impl FifoLock {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(()),
        }
    }

    /// Wait for our turn. The lock is released when the guard is dropped.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                trace!("Queueing for {}", self.name);
                self.inner.lock().await
            }
        }
    }
}
