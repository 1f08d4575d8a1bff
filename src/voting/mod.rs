//! The voting service: status register, eligible voter registry, unit and candidate store,
//! ballot ledger and the transaction coordinator that ties them together.
//!
//! Everything that mutates the store goes through the [`SubmissionSerializer`], and everything
//! that must be atomic runs as a [`TransactionBody`](crate::model::mongodb::TransactionBody).

mod audit;
mod cancellation;
mod conversation;
mod coordinator;
mod ledger;
mod registry;
mod status;
mod timer;
mod units;

use std::sync::Arc;

use mongodb::{Client, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};

use crate::{
    config::Config,
    error::Result,
    events::Notifier,
    model::mongodb::{
        ensure_counters_exist, ensure_indexes_exist, Coll, MongoCollection, Transactor,
    },
    serializer::SubmissionSerializer,
};

pub use coordinator::SubmissionError;

use self::timer::ExpiryTimer;

/// Handle on the voting service. Cheap to clone; all clones share the same queues and timer.
#[derive(Clone)]
pub struct Voting {
    db: Database,
    transactor: Transactor,
    serializer: Arc<SubmissionSerializer>,
    notifier: Notifier,
    ballot_secret: Arc<[u8]>,
    timer: Arc<ExpiryTimer>,
}

impl Voting {
    pub fn new(db_client: Client, db: Database, config: &Config) -> Self {
        Self {
            db,
            transactor: Transactor::new(
                db_client,
                config.retry_policy(),
                config.max_commit_time(),
            ),
            serializer: Arc::new(SubmissionSerializer::new()),
            notifier: Notifier::new(config.event_capacity()),
            ballot_secret: config.ballot_secret().into(),
            timer: Arc::new(ExpiryTimer::new()),
        }
    }

    /// Prepare the database and restore any scheduled end of voting.
    pub async fn init(&self) -> Result<()> {
        ensure_indexes_exist(&self.db).await?;
        ensure_counters_exist(&self.coll()).await?;
        self.ensure_status_exists().await?;
        self.restore_timer().await
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// How many external identities have requests queued or in progress.
    pub fn queued_identities(&self) -> usize {
        self.serializer.active_identities()
    }

    fn coll<T: MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }
}

/// A fairing that prepares the database and places a [`Voting`] and its [`Notifier`] into
/// managed state during ignition.
///
/// This fairing depends on the database and [`Config`] being available in managed state, and so
/// must be attached after the fairings responsible for those.
pub struct VotingFairing;

#[rocket::async_trait]
impl Fairing for VotingFairing {
    fn info(&self) -> Info {
        Info {
            name: "Voting service",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        info!("Preparing voting service...");
        let voting = match (
            rocket.state::<Client>(),
            rocket.state::<Database>(),
            rocket.state::<Config>(),
        ) {
            (Some(db_client), Some(db), Some(config)) => {
                Voting::new(db_client.clone(), db.clone(), config)
            }
            _ => {
                error!("Database or config was not available when preparing voting service");
                return Err(rocket);
            }
        };

        if let Err(e) = voting.init().await {
            error!("Failed to prepare voting service: {e}");
            return Err(rocket);
        }
        info!("...voting service ready!");

        let notifier = voting.notifier().clone();
        Ok(rocket.manage(voting).manage(notifier))
    }
}
