//! Endpoints for the conversational front-end, authenticated by the shared bot secret.

use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        api::{
            auth::BotAuth,
            conversation::ConversationView,
            registry::Eligibility,
            status::StatusDescription,
            submission::{BallotSubmission, SubmissionResponse},
            unit::PublicUnit,
        },
        common::conversation::ConversationEvent,
    },
    voting::{SubmissionError, Voting},
};

pub fn routes() -> Vec<Route> {
    routes![
        submit_ballot,
        check_eligibility,
        get_status,
        get_units,
        get_conversation,
        advance_conversation,
    ]
}

/// Error reported when the store could not take a ballot.
const STORAGE_ERROR: &str = "STORAGE_ERROR";

#[post("/bot/ballots", data = "<submission>", format = "json")]
async fn submit_ballot(
    _bot: BotAuth,
    submission: Json<BallotSubmission>,
    voting: &State<Voting>,
) -> (Status, Json<SubmissionResponse>) {
    match voting.cast_ballot(submission.0).await {
        Ok(hash) => (Status::Ok, Json(SubmissionResponse::accepted(hash))),
        Err(SubmissionError::Invalid(why)) => (
            Status::UnprocessableEntity,
            Json(SubmissionResponse::failed(why)),
        ),
        Err(SubmissionError::Rejected(rejection)) => {
            (Status::Conflict, Json(SubmissionResponse::rejected(rejection)))
        }
        Err(SubmissionError::Storage(err)) => {
            error!("Failed to store ballot: {err}");
            (
                Status::InternalServerError,
                Json(SubmissionResponse::failed(STORAGE_ERROR.to_string())),
            )
        }
    }
}

#[get("/bot/eligibility?<name>")]
async fn check_eligibility(
    _bot: BotAuth,
    name: &str,
    voting: &State<Voting>,
) -> Result<Json<Eligibility>> {
    Ok(Json(voting.check_eligibility(name).await?))
}

#[get("/bot/status")]
async fn get_status(_bot: BotAuth, voting: &State<Voting>) -> Result<Json<StatusDescription>> {
    Ok(Json(voting.status().await?))
}

#[get("/bot/units")]
async fn get_units(_bot: BotAuth, voting: &State<Voting>) -> Result<Json<Vec<PublicUnit>>> {
    Ok(Json(voting.open_units().await?))
}

#[get("/bot/conversations/<external_id>")]
async fn get_conversation(
    _bot: BotAuth,
    external_id: &str,
    voting: &State<Voting>,
) -> Result<Json<ConversationView>> {
    Ok(Json(voting.conversation(external_id).await?))
}

#[post("/bot/conversations/<external_id>", data = "<event>", format = "json")]
async fn advance_conversation(
    _bot: BotAuth,
    external_id: &str,
    event: Json<ConversationEvent>,
    voting: &State<Voting>,
) -> Result<Json<ConversationView>> {
    Ok(Json(voting.advance(external_id, event.0).await?))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Header},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::model::{
        api::{
            auth::BOT_SECRET_HEADER,
            submission::Choice,
            unit::{CandidateSpec, UnitSpec},
        },
        common::{conversation::ConversationState, status::VotingStatus},
    };

    use super::*;

    fn bot_secret() -> Header<'static> {
        Header::new(BOT_SECRET_HEADER, "debug-bot-secret")
    }

    async fn submit(client: &Client, submission: &BallotSubmission) -> (Status, SubmissionResponse) {
        let response = client
            .post(uri!(submit_ballot))
            .header(ContentType::JSON)
            .header(bot_secret())
            .body(serde_json::to_string(submission).unwrap())
            .dispatch()
            .await;
        let status = response.status();
        (status, response.into_json().await.unwrap())
    }

    async fn open_unit(voting: &Voting) -> (u32, u32) {
        let unit = voting
            .create_unit(&UnitSpec {
                name: "Morning".to_string(),
                starts_at: None,
                ends_at: None,
            })
            .await
            .unwrap();
        let candidate = voting
            .add_candidate(
                unit.id,
                &CandidateSpec {
                    name: "Alice Archer".to_string(),
                },
            )
            .await
            .unwrap();
        voting.set_unit_active(unit.id, true).await.unwrap();
        (unit.id, candidate.id)
    }

    #[backend_test(active)]
    async fn submit_and_duplicate(client: Client, voting: Voting) {
        let (unit_id, candidate_id) = open_unit(&voting).await;
        let submission =
            BallotSubmission::example("tg-1", unit_id, Choice::Candidate(candidate_id));

        let (status, response) = submit(&client, &submission).await;
        assert_eq!(status, Status::Ok);
        assert!(response.success);
        assert_eq!(response.verification_hash.unwrap().len(), 64);

        let (status, response) = submit(&client, &submission).await;
        assert_eq!(status, Status::Conflict);
        assert_eq!(response.error.as_deref(), Some("ALREADY_VOTED"));

        let mut invalid = submission;
        invalid.candidate_id = None;
        let (status, response) = submit(&client, &invalid).await;
        assert_eq!(status, Status::UnprocessableEntity);
        assert!(!response.success);
    }

    #[backend_test]
    async fn closed_voting_is_reported(client: Client) {
        let submission = BallotSubmission::example("tg-1", 1, Choice::Abstain);
        let (status, response) = submit(&client, &submission).await;
        assert_eq!(status, Status::Conflict);
        assert_eq!(response.error.as_deref(), Some("VOTING_NOT_ACTIVE"));

        let response = client
            .get(uri!(get_status))
            .header(bot_secret())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let status: StatusDescription = response.into_json().await.unwrap();
        assert_eq!(status.status, VotingStatus::NotStarted);
    }

    #[backend_test]
    async fn secret_is_required(client: Client) {
        let response = client.get(uri!(get_status)).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);

        let response = client
            .get(uri!(get_status))
            .header(Header::new(BOT_SECRET_HEADER, "wrong"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[backend_test(active)]
    async fn units_and_eligibility(client: Client, voting: Voting) {
        open_unit(&voting).await;
        voting.bulk_add(&["Jane Doe".to_string()]).await.unwrap();

        let units: Vec<PublicUnit> = client
            .get(uri!(get_units))
            .header(bot_secret())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].candidates[0].name, "Alice Archer");

        let eligibility: Eligibility = client
            .get(uri!(check_eligibility(name = "  JANE DOE ")))
            .header(bot_secret())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(eligibility.eligible);
        assert!(!eligibility.has_voted);
    }

    #[backend_test]
    async fn conversation_endpoints(client: Client) {
        let begin = ConversationEvent::Begin {
            nickname: "ivan".to_string(),
        };
        let response = client
            .post(uri!(advance_conversation(external_id = "tg-1")))
            .header(ContentType::JSON)
            .header(bot_secret())
            .body(serde_json::to_string(&begin).unwrap())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let view: ConversationView = client
            .get(uri!(get_conversation(external_id = "tg-1")))
            .header(bot_secret())
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(
            view.state,
            ConversationState::AwaitingName {
                nickname: "ivan".to_string()
            }
        );

        let response = client
            .post(uri!(advance_conversation(external_id = "tg-1")))
            .header(ContentType::JSON)
            .header(bot_secret())
            .body(r#"{"event": "confirmed"}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);
    }
}
