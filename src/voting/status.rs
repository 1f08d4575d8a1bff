//! The voting status register, stored as rows of the `settings` collection.

use chrono::{DateTime, Utc};
use mongodb::{
    bson::doc,
    options::{ReplaceOptions, UpdateOptions},
    ClientSession,
};
use rocket::futures::TryStreamExt;

use crate::{
    error::{Error, Result},
    events::Notification,
    model::{
        api::status::StatusDescription,
        common::status::{StatusCommand, StatusRecord, TransitionError, VotingStatus},
        db::setting::Setting,
        mongodb::{Coll, TransactionBody},
    },
};

use super::Voting;

/// Read the status register as part of a transaction.
pub(super) async fn read_status(
    settings: &Coll<Setting>,
    session: &mut ClientSession,
) -> Result<StatusRecord> {
    let rows: Vec<Setting> = settings
        .find_with_session(None, None, session)
        .await?
        .stream(session)
        .try_collect()
        .await?;
    Ok(StatusRecord::from_settings(&rows))
}

async fn write_status(
    settings: &Coll<Setting>,
    record: &StatusRecord,
    session: &mut ClientSession,
) -> Result<()> {
    let upsert = ReplaceOptions::builder().upsert(true).build();
    for row in record.to_settings() {
        settings
            .replace_one_with_session(
                doc! {"_id": row.key.as_str()},
                &row,
                upsert.clone(),
                session,
            )
            .await?;
    }
    Ok(())
}

/// Apply an administrative command to the stored status.
struct ApplyCommand {
    settings: Coll<Setting>,
    command: StatusCommand,
    now: DateTime<Utc>,
}

#[rocket::async_trait]
impl TransactionBody for ApplyCommand {
    type Output = (StatusRecord, StatusRecord);
    type Rejection = TransitionError;

    async fn run(
        &self,
        session: &mut ClientSession,
    ) -> Result<std::result::Result<Self::Output, Self::Rejection>> {
        let before = read_status(&self.settings, session).await?;
        let after = match before.apply(self.command, self.now) {
            Ok(after) => after,
            Err(rejection) => return Ok(Err(rejection)),
        };
        write_status(&self.settings, &after, session).await?;
        Ok(Ok((before, after)))
    }
}

/// Persist the end of voting once its end time has passed.
struct Expire {
    settings: Coll<Setting>,
    now: DateTime<Utc>,
}

#[rocket::async_trait]
impl TransactionBody for Expire {
    type Output = Option<StatusRecord>;
    type Rejection = std::convert::Infallible;

    async fn run(
        &self,
        session: &mut ClientSession,
    ) -> Result<std::result::Result<Self::Output, Self::Rejection>> {
        let record = read_status(&self.settings, session).await?;
        let expired = record.expire(self.now);
        if let Some(expired) = &expired {
            write_status(&self.settings, expired, session).await?;
        }
        Ok(Ok(expired))
    }
}

impl Voting {
    /// The stored status register.
    pub async fn status_record(&self) -> Result<StatusRecord> {
        let rows: Vec<Setting> = self
            .coll::<Setting>()
            .find(None, None)
            .await?
            .try_collect()
            .await?;
        Ok(StatusRecord::from_settings(&rows))
    }

    /// The status in force right now, with its time bounds.
    pub async fn status(&self) -> Result<StatusDescription> {
        let record = self.status_record().await?;
        Ok(StatusDescription::at(&record, Utc::now()))
    }

    /// Open voting, or resume it after a pause. Bounds that are given replace the stored ones.
    pub async fn start(
        &self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<StatusDescription> {
        self.command(StatusCommand::Start {
            start_time,
            end_time,
        })
        .await
    }

    pub async fn pause(&self) -> Result<StatusDescription> {
        self.command(StatusCommand::Pause).await
    }

    pub async fn stop(&self) -> Result<StatusDescription> {
        self.command(StatusCommand::Stop).await
    }

    /// Return to `not_started` from any state, clearing the time bounds and any scheduled end.
    pub async fn reset(&self) -> Result<StatusDescription> {
        self.command(StatusCommand::Reset).await
    }

    async fn command(&self, command: StatusCommand) -> Result<StatusDescription> {
        let now = Utc::now();
        let body = ApplyCommand {
            settings: self.coll(),
            command,
            now,
        };
        let (before, after) = match self.serializer.write(self.transactor.run(&body)).await? {
            Ok(records) => records,
            Err(rejection @ TransitionError::Illegal { .. }) => {
                info!("Refused status change: {rejection}");
                return Err(Error::conflict(rejection.to_string()));
            }
            Err(rejection) => return Err(Error::bad_request(rejection.to_string())),
        };

        self.reschedule(&after).await;
        let status = after.effective(now);
        if before.effective(now) != status {
            info!("Voting is now {}", status.as_str());
            self.notifier.publish(Notification::StatusChanged { status, at: now });
        }
        Ok(StatusDescription::at(&after, now))
    }

    /// Persist the end of voting, if its end time has passed. Called by the expiry timer.
    pub(super) async fn expire(&self) -> Result<()> {
        let now = Utc::now();
        let body = Expire {
            settings: self.coll(),
            now,
        };
        let expired = match self.serializer.write(self.transactor.run(&body)).await? {
            Ok(expired) => expired,
            Err(never) => match never {},
        };
        if expired.is_some() {
            info!("Voting has reached its end time and is now finished");
            self.notifier.publish(Notification::StatusChanged {
                status: VotingStatus::Finished,
                at: now,
            });
        }
        Ok(())
    }

    /// Make the expiry timer match the given record.
    async fn reschedule(&self, record: &StatusRecord) {
        match (record.status, record.end_time) {
            (VotingStatus::Active | VotingStatus::Paused, Some(end)) => {
                self.timer.schedule(end, self.clone()).await;
            }
            _ => self.timer.cancel().await,
        }
    }

    /// Schedule the end of voting stored in the database. Called once during ignition.
    pub(super) async fn restore_timer(&self) -> Result<()> {
        let record = self.status_record().await?;
        self.reschedule(&record).await;
        Ok(())
    }

    /// Create the status rows if this is a fresh database, leaving existing rows alone.
    pub(super) async fn ensure_status_exists(&self) -> Result<()> {
        let settings = self.coll::<Setting>();
        let upsert = UpdateOptions::builder().upsert(true).build();
        for row in StatusRecord::default().to_settings() {
            let update = doc! {
                "$setOnInsert": { "value": row.value.clone() }
            };
            settings
                .update_one(doc! {"_id": row.key.as_str()}, update, upsert.clone())
                .await?;
        }
        Ok(())
    }

    /// When the expiry timer will end voting, if it is scheduled.
    pub async fn scheduled_end(&self) -> Option<DateTime<Utc>> {
        self.timer.scheduled_at().await
    }
}
