use std::time::Duration;

use chrono::{DateTime, Utc};
use rocket::tokio::{self, sync::Mutex, task::JoinHandle, time::sleep};

use super::Voting;

/// How long to wait before trying again if persisting the end of voting fails.
const RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// The task that ends voting at its scheduled end time. At most one is scheduled at a time.
#[derive(Debug, Default)]
pub struct ExpiryTimer {
    task: Mutex<Option<Scheduled>>,
}

#[derive(Debug)]
struct Scheduled {
    at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

impl ExpiryTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// End voting at `at`, replacing any previously scheduled end.
    /// If `at` is in the past, voting ends immediately.
    pub async fn schedule(&self, at: DateTime<Utc>, voting: Voting) {
        let mut task = self.task.lock().await;
        if let Some(previous) = task.take() {
            previous.handle.abort();
        }

        let handle = tokio::spawn(async move {
            // Sleeping is measured on a different clock, so don't trust a single sleep.
            while Utc::now() < at {
                sleep(until(at).max(Duration::from_millis(1))).await;
            }
            loop {
                match voting.expire().await {
                    Ok(()) => break,
                    Err(e) => {
                        error!(
                            "Failed to end voting, retrying in {}s: {e}",
                            RETRY_INTERVAL.as_secs()
                        );
                        sleep(RETRY_INTERVAL).await;
                    }
                }
            }
        });
        debug!("Voting will end at {at}");
        *task = Some(Scheduled { at, handle });
    }

    /// Cancel the scheduled end, if any.
    pub async fn cancel(&self) {
        if let Some(previous) = self.task.lock().await.take() {
            previous.handle.abort();
            debug!("Cancelled scheduled end of voting at {}", previous.at);
        }
    }

    /// When voting is scheduled to end, if the timer hasn't fired yet.
    pub async fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.task
            .lock()
            .await
            .as_ref()
            .filter(|scheduled| !scheduled.handle.is_finished())
            .map(|scheduled| scheduled.at)
    }
}

/// The time from now until `at`, or zero if it has passed.
fn until(at: DateTime<Utc>) -> Duration {
    (at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;

    #[test]
    fn past_times_are_due_now() {
        assert_eq!(until(Utc::now() - ChronoDuration::seconds(5)), Duration::ZERO);
        let later = until(Utc::now() + ChronoDuration::seconds(60));
        assert!(later > Duration::from_secs(55) && later <= Duration::from_secs(60));
    }
}
