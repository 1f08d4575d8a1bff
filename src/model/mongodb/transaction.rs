use std::time::Duration;

use mongodb::{
    options::{Acknowledgment, ReadConcern, TransactionOptions, WriteConcern},
    Client, ClientSession,
};
use rocket::tokio::time::sleep;

use crate::error::{Error, Result};

use super::errors::{is_transient_error, is_unknown_commit_result};

/// How transient storage contention is retried: a bounded number of attempts with exponential
/// backoff between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// The delay to wait after the given (1-indexed) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// The work done inside one transaction.
///
/// A body may be run several times if the transaction hits transient contention, so it must not
/// have side effects outside the session. Returning `Ok(Err(rejection))` aborts the transaction
/// without retrying, leaving no trace in the database.
#[rocket::async_trait]
pub trait TransactionBody: Sync {
    type Output: Send;
    type Rejection: Send;

    async fn run(
        &self,
        session: &mut ClientSession,
    ) -> Result<std::result::Result<Self::Output, Self::Rejection>>;
}

/// Runs [`TransactionBody`]s as multi-document transactions, retrying transient failures.
#[derive(Debug, Clone)]
pub struct Transactor {
    client: Client,
    policy: RetryPolicy,
    options: TransactionOptions,
}

impl Transactor {
    pub fn new(client: Client, policy: RetryPolicy, max_commit_time: Duration) -> Self {
        let options = TransactionOptions::builder()
            .read_concern(ReadConcern::snapshot())
            .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
            .max_commit_time(max_commit_time)
            .build();
        Self {
            client,
            policy,
            options,
        }
    }

    /// Run the body in a transaction, committing iff it produces an output.
    ///
    /// Transient errors restart the whole transaction after a backoff. Once the attempts are
    /// exhausted, the last error is surfaced as [`Error::Storage`].
    pub async fn run<B: TransactionBody>(
        &self,
        body: &B,
    ) -> Result<std::result::Result<B::Output, B::Rejection>> {
        let mut attempt = 1;
        loop {
            match self.attempt(body).await {
                Ok(outcome) => return Ok(outcome),
                Err(Error::Db(err)) if is_transient_error(&err) => {
                    if attempt >= self.policy.max_attempts {
                        error!("Transaction failed after {attempt} attempts: {err}");
                        return Err(Error::Storage {
                            attempts: attempt,
                            source: err,
                        });
                    }
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        "Transaction attempt {attempt} hit contention, retrying in {}ms: {err}",
                        delay.as_millis()
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt<B: TransactionBody>(
        &self,
        body: &B,
    ) -> Result<std::result::Result<B::Output, B::Rejection>> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(self.options.clone()).await?;
        match body.run(&mut session).await {
            Ok(Ok(output)) => {
                self.commit(&mut session).await?;
                Ok(Ok(output))
            }
            Ok(Err(rejection)) => {
                abort(&mut session).await;
                Ok(Err(rejection))
            }
            Err(err) => {
                abort(&mut session).await;
                Err(err)
            }
        }
    }

    async fn commit(&self, session: &mut ClientSession) -> Result<()> {
        let mut attempt = 1;
        loop {
            match session.commit_transaction().await {
                Ok(()) => return Ok(()),
                Err(err) if is_unknown_commit_result(&err) && attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    warn!("Commit result unknown, retrying in {}ms: {err}", delay.as_millis());
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Abort the transaction. The server may already have aborted it after a failed write,
/// in which case there is nothing left to do.
async fn abort(session: &mut ClientSession) {
    if let Err(err) = session.abort_transaction().await {
        debug!("Ignoring failure to abort transaction: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(100),
        }
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let policy = policy();
        assert_eq!(policy.backoff(1), Duration::from_millis(20));
        assert_eq!(policy.backoff(2), Duration::from_millis(40));
        assert_eq!(policy.backoff(3), Duration::from_millis(80));
        assert_eq!(policy.backoff(4), Duration::from_millis(100));
        assert_eq!(policy.backoff(40), Duration::from_millis(100));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_millis(100));
    }

    #[test]
    fn zeroth_attempt_uses_initial_backoff() {
        assert_eq!(policy().backoff(0), Duration::from_millis(20));
    }
}
