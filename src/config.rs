use std::time::Duration;

use rocket::figment::Error as FigmentError;
use serde::Deserialize;

use crate::model::mongodb::RetryPolicy;

/// Server configuration, read from `Rocket.toml` and `ROCKET_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    db_uri: String,
    #[serde(default = "default_db_name")]
    db_name: String,
    ballot_secret: String,
    bot_secret: String,
    jwt_secret: String,
    #[serde(default = "default_tx_max_attempts")]
    tx_max_attempts: u32,
    #[serde(default = "default_tx_initial_backoff_ms")]
    tx_initial_backoff_ms: u64,
    #[serde(default = "default_tx_max_backoff_ms")]
    tx_max_backoff_ms: u64,
    #[serde(default = "default_tx_max_commit_ms")]
    tx_max_commit_ms: u64,
    #[serde(default = "default_event_capacity")]
    event_capacity: usize,
}

impl Config {
    /// Extract the configuration from Rocket's default figment.
    pub fn from_figment() -> Result<Self, FigmentError> {
        rocket::Config::figment().extract()
    }

    /// MongoDB connection string.
    /// Configured via `DB_URI`.
    pub fn db_uri(&self) -> &str {
        &self.db_uri
    }

    /// Name of the database holding all collections.
    /// Configured via `DB_NAME`.
    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Key for ballot verification tokens.
    /// Configured via `BALLOT_SECRET`.
    pub fn ballot_secret(&self) -> &[u8] {
        self.ballot_secret.as_bytes()
    }

    /// Shared secret presented by the conversational front-end.
    /// Configured via `BOT_SECRET`.
    pub fn bot_secret(&self) -> &str {
        &self.bot_secret
    }

    /// Key used to sign and verify admin bearer tokens.
    /// Configured via `JWT_SECRET`.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// How transient storage contention is retried.
    /// Configured via `TX_MAX_ATTEMPTS`, `TX_INITIAL_BACKOFF_MS` and `TX_MAX_BACKOFF_MS`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.tx_max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.tx_initial_backoff_ms),
            max_backoff: Duration::from_millis(self.tx_max_backoff_ms),
        }
    }

    /// Upper bound on how long a single commit may wait on the server.
    /// Configured via `TX_MAX_COMMIT_MS`.
    pub fn max_commit_time(&self) -> Duration {
        Duration::from_millis(self.tx_max_commit_ms)
    }

    /// How many undelivered notifications a slow subscriber may fall behind by.
    /// Configured via `EVENT_CAPACITY`.
    pub fn event_capacity(&self) -> usize {
        self.event_capacity.max(1)
    }
}

fn default_db_name() -> String {
    "vote_ledger".to_string()
}

fn default_tx_max_attempts() -> u32 {
    5
}

fn default_tx_initial_backoff_ms() -> u64 {
    20
}

fn default_tx_max_backoff_ms() -> u64 {
    1000
}

fn default_tx_max_commit_ms() -> u64 {
    5000
}

fn default_event_capacity() -> usize {
    256
}
