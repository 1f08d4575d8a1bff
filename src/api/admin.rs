//! Endpoints for administrators, authenticated by a signed bearer token.

use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AdminToken,
            ballot::{BallotDescription, BallotFilter},
            cancellation::{CancelBallotRequest, CancellationReport, CancellationRequest},
            pagination::{Paginated, Pagination},
            registry::{BulkAddReport, NameBatch, RegistryEntry, RegistryFilter},
            status::{StartRequest, StatusDescription},
            tally::{AuditReport, UnitTally},
            unit::{ActiveFlag, CandidateDescription, CandidateSpec, UnitDescription, UnitSpec},
        },
        common::{BallotId, CandidateId, UnitId},
    },
    voting::Voting,
};

pub fn routes() -> Vec<Route> {
    routes![
        get_status,
        start_voting,
        pause_voting,
        stop_voting,
        reset_voting,
        get_units,
        create_unit,
        get_unit,
        set_unit_active,
        add_candidate,
        set_candidate_active,
        get_ballots,
        get_tally,
        audit,
        add_to_registry,
        get_registry,
        remove_from_registry,
        set_registry_voted,
        cancel_for_voter,
        cancel_ballot,
    ]
}

#[get("/admin/status")]
async fn get_status(_token: AdminToken, voting: &State<Voting>) -> Result<Json<StatusDescription>> {
    Ok(Json(voting.status().await?))
}

#[post("/admin/status/start", data = "<request>", format = "json")]
async fn start_voting(
    token: AdminToken,
    request: Json<StartRequest>,
    voting: &State<Voting>,
) -> Result<Json<StatusDescription>> {
    let status = voting
        .start(request.start_time, request.end_time)
        .await?;
    info!("Admin {} started voting", token.admin_id);
    Ok(Json(status))
}

#[post("/admin/status/pause")]
async fn pause_voting(token: AdminToken, voting: &State<Voting>) -> Result<Json<StatusDescription>> {
    let status = voting.pause().await?;
    info!("Admin {} paused voting", token.admin_id);
    Ok(Json(status))
}

#[post("/admin/status/stop")]
async fn stop_voting(token: AdminToken, voting: &State<Voting>) -> Result<Json<StatusDescription>> {
    let status = voting.stop().await?;
    info!("Admin {} stopped voting", token.admin_id);
    Ok(Json(status))
}

#[post("/admin/status/reset")]
async fn reset_voting(token: AdminToken, voting: &State<Voting>) -> Result<Json<StatusDescription>> {
    let status = voting.reset().await?;
    info!("Admin {} reset voting", token.admin_id);
    Ok(Json(status))
}

#[get("/admin/units")]
async fn get_units(_token: AdminToken, voting: &State<Voting>) -> Result<Json<Vec<UnitDescription>>> {
    Ok(Json(voting.list_units().await?))
}

#[post("/admin/units", data = "<spec>", format = "json")]
async fn create_unit(
    _token: AdminToken,
    spec: Json<UnitSpec>,
    voting: &State<Voting>,
) -> Result<Json<UnitDescription>> {
    Ok(Json(voting.create_unit(&spec).await?))
}

#[get("/admin/units/<unit_id>")]
async fn get_unit(
    _token: AdminToken,
    unit_id: UnitId,
    voting: &State<Voting>,
) -> Result<Json<UnitDescription>> {
    Ok(Json(voting.unit(unit_id).await?))
}

#[put("/admin/units/<unit_id>/active", data = "<flag>", format = "json")]
async fn set_unit_active(
    _token: AdminToken,
    unit_id: UnitId,
    flag: Json<ActiveFlag>,
    voting: &State<Voting>,
) -> Result<()> {
    voting.set_unit_active(unit_id, flag.active).await
}

#[post("/admin/units/<unit_id>/candidates", data = "<spec>", format = "json")]
async fn add_candidate(
    _token: AdminToken,
    unit_id: UnitId,
    spec: Json<CandidateSpec>,
    voting: &State<Voting>,
) -> Result<Json<CandidateDescription>> {
    Ok(Json(voting.add_candidate(unit_id, &spec).await?))
}

#[put(
    "/admin/units/<unit_id>/candidates/<candidate_id>/active",
    data = "<flag>",
    format = "json"
)]
async fn set_candidate_active(
    _token: AdminToken,
    unit_id: UnitId,
    candidate_id: CandidateId,
    flag: Json<ActiveFlag>,
    voting: &State<Voting>,
) -> Result<()> {
    voting
        .set_candidate_active(unit_id, candidate_id, flag.active)
        .await
}

#[get("/admin/units/<unit_id>/ballots?<filter..>")]
async fn get_ballots(
    _token: AdminToken,
    unit_id: UnitId,
    filter: BallotFilter,
    pagination: Pagination,
    voting: &State<Voting>,
) -> Result<Json<Paginated<BallotDescription>>> {
    Ok(Json(voting.list_ballots(unit_id, filter, pagination).await?))
}

#[get("/admin/units/<unit_id>/tally")]
async fn get_tally(
    _token: AdminToken,
    unit_id: UnitId,
    voting: &State<Voting>,
) -> Result<Json<UnitTally>> {
    Ok(Json(voting.unit_tally(unit_id).await?))
}

#[get("/admin/audit")]
async fn audit(_token: AdminToken, voting: &State<Voting>) -> Result<Json<AuditReport>> {
    Ok(Json(voting.audit().await?))
}

#[post("/admin/registry", data = "<batch>", format = "json")]
async fn add_to_registry(
    _token: AdminToken,
    batch: Json<NameBatch>,
    voting: &State<Voting>,
) -> Result<Json<BulkAddReport>> {
    Ok(Json(voting.bulk_add(&batch.names).await?))
}

#[get("/admin/registry?<filter>")]
async fn get_registry(
    _token: AdminToken,
    filter: Option<RegistryFilter>,
    pagination: Pagination,
    voting: &State<Voting>,
) -> Result<Json<Paginated<RegistryEntry>>> {
    let filter = filter.unwrap_or_default();
    Ok(Json(voting.list_registry(filter, pagination).await?))
}

#[delete("/admin/registry?<name>")]
async fn remove_from_registry(
    _token: AdminToken,
    name: &str,
    voting: &State<Voting>,
) -> Result<()> {
    voting.remove_from_registry(name).await
}

#[put("/admin/registry/voted?<name>&<voted>")]
async fn set_registry_voted(
    _token: AdminToken,
    name: &str,
    voted: bool,
    voting: &State<Voting>,
) -> Result<()> {
    if voted {
        voting.mark_as_voted(name).await
    } else {
        voting.unmark_as_voted(name).await
    }
}

#[post("/admin/cancellations", data = "<request>", format = "json")]
async fn cancel_for_voter(
    token: AdminToken,
    request: Json<CancellationRequest>,
    voting: &State<Voting>,
) -> Result<Json<CancellationReport>> {
    let (reference, reason) = request.0.validate().map_err(Error::bad_request)?;
    let report = voting
        .cancel_for_voter(reference, reason, token.admin_id)
        .await?;
    Ok(Json(report))
}

#[post("/admin/ballots/<ballot_id>/cancel", data = "<request>", format = "json")]
async fn cancel_ballot(
    token: AdminToken,
    ballot_id: BallotId,
    request: Json<CancelBallotRequest>,
    voting: &State<Voting>,
) -> Result<Json<CancellationReport>> {
    let report = voting
        .cancel_ballot(ballot_id, &request.reason, token.admin_id)
        .await?;
    Ok(Json(report))
}
