//! The eligible voter registry: a roster of names, each with a "has voted" flag.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, Bson},
    options::FindOptions,
    ClientSession,
};
use rocket::futures::TryStreamExt;

use crate::{
    error::{Error, Result},
    model::{
        api::{
            pagination::{Paginated, Pagination},
            registry::{BulkAddReport, Eligibility, RegistryEntry, RegistryFilter},
        },
        common::names,
        db::eligible_voter::EligibleVoter,
        mongodb::{Coll, TransactionBody},
    },
};

use super::Voting;

/// Mark the entry for a normalized name as having voted, as part of a transaction.
///
/// Returns whether an entry that had not yet voted was found.
pub(super) async fn mark_in_session(
    registry: &Coll<EligibleVoter>,
    normalized_name: &str,
    now: DateTime<Utc>,
    session: &mut ClientSession,
) -> Result<bool> {
    let filter = doc! {
        "_id": normalized_name,
        "has_voted": false,
    };
    let update = doc! {
        "$set": { "has_voted": true, "voted_at": Bson::DateTime(now.into()) }
    };
    let result = registry
        .update_one_with_session(filter, update, None, session)
        .await?;
    Ok(result.matched_count == 1)
}

/// Mark the entry for a normalized name as not having voted, as part of a transaction.
///
/// Returns whether an entry was found.
pub(super) async fn unmark_in_session(
    registry: &Coll<EligibleVoter>,
    normalized_name: &str,
    session: &mut ClientSession,
) -> Result<bool> {
    let update = doc! {
        "$set": { "has_voted": false, "voted_at": Bson::Null }
    };
    let result = registry
        .update_one_with_session(doc! {"_id": normalized_name}, update, None, session)
        .await?;
    Ok(result.matched_count == 1)
}

/// Sort a batch of names into new, duplicate and invalid ones.
///
/// Returns the entries to insert. Duplicates within the batch and names already in `existing`
/// both count as duplicates.
fn classify(
    names: &[String],
    existing: &HashSet<String>,
) -> (Vec<EligibleVoter>, BulkAddReport) {
    let mut report = BulkAddReport::default();
    let mut seen = HashSet::new();
    let mut new_entries = Vec::new();
    for name in names {
        let full_name = match names::validate(name) {
            Ok(full_name) => full_name,
            Err(_) => {
                report.invalid += 1;
                report.invalid_names.push(name.clone());
                continue;
            }
        };
        let entry = EligibleVoter::new(full_name);
        if existing.contains(&entry.normalized_name) || !seen.insert(entry.normalized_name.clone())
        {
            report.duplicates += 1;
        } else {
            report.added += 1;
            new_entries.push(entry);
        }
    }
    (new_entries, report)
}

/// Add a batch of names in one transaction.
struct BulkAdd<'a> {
    registry: Coll<EligibleVoter>,
    names: &'a [String],
}

#[rocket::async_trait]
impl TransactionBody for BulkAdd<'_> {
    type Output = BulkAddReport;
    type Rejection = std::convert::Infallible;

    async fn run(
        &self,
        session: &mut ClientSession,
    ) -> Result<std::result::Result<Self::Output, Self::Rejection>> {
        let candidates: Vec<String> = self
            .names
            .iter()
            .filter(|name| names::validate(name).is_ok())
            .map(|name| names::normalize(name))
            .collect();
        // Inserting a duplicate would abort the whole transaction, so find them first.
        let existing: HashSet<String> = self
            .registry
            .find_with_session(doc! {"_id": {"$in": candidates}}, None, session)
            .await?
            .stream(session)
            .map_ok(|entry| entry.normalized_name)
            .try_collect()
            .await?;

        let (new_entries, report) = classify(self.names, &existing);
        if !new_entries.is_empty() {
            self.registry
                .insert_many_with_session(new_entries, None, session)
                .await?;
        }
        Ok(Ok(report))
    }
}

/// Set one entry's flag outside of any ballot.
struct SetVoted {
    registry: Coll<EligibleVoter>,
    normalized_name: String,
    has_voted: bool,
    now: DateTime<Utc>,
}

#[rocket::async_trait]
impl TransactionBody for SetVoted {
    type Output = ();
    type Rejection = ();

    async fn run(
        &self,
        session: &mut ClientSession,
    ) -> Result<std::result::Result<Self::Output, Self::Rejection>> {
        let exists = self
            .registry
            .find_one_with_session(doc! {"_id": self.normalized_name.as_str()}, None, session)
            .await?
            .is_some();
        if !exists {
            return Ok(Err(()));
        }
        if self.has_voted {
            mark_in_session(&self.registry, &self.normalized_name, self.now, session).await?;
        } else {
            unmark_in_session(&self.registry, &self.normalized_name, session).await?;
        }
        Ok(Ok(()))
    }
}

impl Voting {
    /// Is this name on the registry, and has it voted?
    pub async fn check_eligibility(&self, name: &str) -> Result<Eligibility> {
        let entry = self
            .coll::<EligibleVoter>()
            .find_one(doc! {"_id": names::normalize(name)}, None)
            .await?;
        Ok(Eligibility {
            eligible: entry.is_some(),
            has_voted: entry.map_or(false, |entry| entry.has_voted),
        })
    }

    /// Add many names at once. Invalid and duplicate names are reported, not fatal.
    pub async fn bulk_add(&self, names: &[String]) -> Result<BulkAddReport> {
        let body = BulkAdd {
            registry: self.coll(),
            names,
        };
        let report = match self.serializer.write(self.transactor.run(&body)).await? {
            Ok(report) => report,
            Err(never) => match never {},
        };
        info!(
            "Registry bulk add: {} added, {} duplicates, {} invalid",
            report.added, report.duplicates, report.invalid
        );
        Ok(report)
    }

    pub async fn mark_as_voted(&self, name: &str) -> Result<()> {
        self.set_voted(name, true).await
    }

    pub async fn unmark_as_voted(&self, name: &str) -> Result<()> {
        self.set_voted(name, false).await
    }

    async fn set_voted(&self, name: &str, has_voted: bool) -> Result<()> {
        let body = SetVoted {
            registry: self.coll(),
            normalized_name: names::normalize(name),
            has_voted,
            now: Utc::now(),
        };
        self.serializer
            .write(self.transactor.run(&body))
            .await?
            .map_err(|()| Error::not_found(format!("Registry entry '{}'", body.normalized_name)))
    }

    /// One page of registry entries, in name order.
    pub async fn list_registry(
        &self,
        filter: RegistryFilter,
        pagination: Pagination,
    ) -> Result<Paginated<RegistryEntry>> {
        let filter = match filter {
            RegistryFilter::All => doc! {},
            RegistryFilter::Voted => doc! {"has_voted": true},
            RegistryFilter::NotVoted => doc! {"has_voted": false},
        };
        let registry = self.coll::<EligibleVoter>();
        let total = registry.count_documents(filter.clone(), None).await?;
        let options = FindOptions::builder()
            .sort(doc! {"_id": 1})
            .skip(pagination.skip())
            .limit(pagination.page_size() as i64)
            .build();
        let items = registry
            .find(filter, options)
            .await?
            .map_ok(RegistryEntry::from)
            .try_collect()
            .await?;
        Ok(Paginated {
            items,
            pagination: pagination.result(total as usize),
        })
    }

    /// Take a name off the registry.
    pub async fn remove_from_registry(&self, name: &str) -> Result<()> {
        let normalized_name = names::normalize(name);
        let registry = self.coll::<EligibleVoter>();
        let result = self
            .serializer
            .write(registry.delete_one(doc! {"_id": normalized_name.as_str()}, None))
            .await?;
        if result.deleted_count == 0 {
            return Err(Error::not_found(format!("Registry entry '{normalized_name}'")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn classification() {
        let names = batch(&[
            "Иванов Иван Иванович",
            "ИВАНОВ ИВАН ИВАНОВИЧ",
            "  Иванов   Иван  Иванович  ",
            "Петров Пётр",
            "Ann",
            "R2-D2 Droid",
            "Already There",
        ]);
        let existing = HashSet::from(["already there".to_string()]);
        let (new_entries, report) = classify(&names, &existing);

        assert_eq!(report.added, 2);
        assert_eq!(report.duplicates, 3);
        assert_eq!(report.invalid, 2);
        assert_eq!(report.invalid_names, batch(&["Ann", "R2-D2 Droid"]));
        let added: Vec<_> = new_entries.iter().map(|e| e.full_name.as_str()).collect();
        assert_eq!(added, vec!["Иванов Иван Иванович", "Петров Пётр"]);
    }

    #[backend_test]
    async fn bulk_add_normalizes_names(voting: Voting, registry: Coll<EligibleVoter>) {
        let names = batch(&[
            "Иванов Иван Иванович",
            "ИВАНОВ ИВАН ИВАНОВИЧ",
            "  Иванов   Иван  Иванович  ",
        ]);
        let report = voting.bulk_add(&names).await.unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.duplicates, 2);
        assert_eq!(report.invalid, 0);
        assert_eq!(registry.count_documents(None, None).await.unwrap(), 1);

        // Adding again finds them all in the store.
        let report = voting.bulk_add(&names).await.unwrap();
        assert_eq!(report.added, 0);
        assert_eq!(report.duplicates, 3);

        let eligibility = voting.check_eligibility("иванов иван иванович").await.unwrap();
        assert_eq!(
            eligibility,
            Eligibility {
                eligible: true,
                has_voted: false,
            }
        );
        assert!(!voting.check_eligibility("Somebody Else").await.unwrap().eligible);
    }

    #[backend_test]
    async fn marking_and_listing(voting: Voting) {
        voting
            .bulk_add(&batch(&["Jane Doe", "John Smith", "Mary Major"]))
            .await
            .unwrap();

        voting.mark_as_voted("  JANE doe").await.unwrap();
        assert!(voting.check_eligibility("Jane Doe").await.unwrap().has_voted);
        let voted = voting
            .list_registry(RegistryFilter::Voted, Pagination::default())
            .await
            .unwrap();
        assert_eq!(voted.pagination.total, 1);
        assert_eq!(voted.items[0].full_name, "Jane Doe");
        assert!(voted.items[0].voted_at.is_some());

        voting.unmark_as_voted("Jane Doe").await.unwrap();
        assert!(!voting.check_eligibility("Jane Doe").await.unwrap().has_voted);

        let page = voting
            .list_registry(RegistryFilter::NotVoted, Pagination::new(2, 2).unwrap())
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].normalized_name, "mary major");

        assert!(voting.mark_as_voted("Nobody Known").await.is_err());
        voting.remove_from_registry("john smith").await.unwrap();
        assert!(voting.remove_from_registry("john smith").await.is_err());
        assert!(!voting.check_eligibility("John Smith").await.unwrap().eligible);
    }
}
