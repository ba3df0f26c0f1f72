use actix_web::{web, HttpResponse, Result};

use crate::db::fixture_store::FixtureStore;
use crate::handlers::fixtures::error_response;
use crate::models::common::ApiResponse;
use crate::models::fixture::{MatchFilter, MatchId, MatchPatch, NewMatch, TeamId};
use crate::services::MatchService;

/// Create a new match
#[tracing::instrument(
    name = "Create match request",
    skip(body, service),
    fields(home_id = %body.home_id, away_id = %body.away_id)
)]
pub async fn create_match<S: FixtureStore>(
    body: web::Json<NewMatch>,
    service: web::Data<MatchService<S>>,
) -> Result<HttpResponse> {
    match service.create_match(body.into_inner()).await {
        Ok(created) => Ok(HttpResponse::Created().json(ApiResponse::success("Match created", created))),
        Err(e) => Ok(error_response(&e)),
    }
}

#[tracing::instrument(name = "List matches request", skip(query, service))]
pub async fn list_matches<S: FixtureStore>(
    query: web::Query<MatchFilter>,
    service: web::Data<MatchService<S>>,
) -> Result<HttpResponse> {
    match service.list_matches(&query).await {
        Ok(matches) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            format!("{} matches found", matches.len()),
            matches,
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn get_match<S: FixtureStore>(
    path: web::Path<MatchId>,
    service: web::Data<MatchService<S>>,
) -> Result<HttpResponse> {
    let match_id = path.into_inner();
    match service.get_match(match_id).await {
        Ok(found) => Ok(HttpResponse::Ok().json(ApiResponse::success("Match found", found))),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Get a match as seen by one of the two teams playing it
pub async fn get_team_match<S: FixtureStore>(
    path: web::Path<(TeamId, MatchId)>,
    service: web::Data<MatchService<S>>,
) -> Result<HttpResponse> {
    let (team_id, match_id) = path.into_inner();
    match service.get_match_for_team(match_id, team_id).await {
        Ok(found) => Ok(HttpResponse::Ok().json(ApiResponse::success("Match found", found))),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Partially update a match
#[tracing::instrument(name = "Update match request", skip(path, body, service))]
pub async fn update_match<S: FixtureStore>(
    path: web::Path<MatchId>,
    body: web::Json<MatchPatch>,
    service: web::Data<MatchService<S>>,
) -> Result<HttpResponse> {
    let match_id = path.into_inner();
    match service.update_match(match_id, body.into_inner()).await {
        Ok(updated) => Ok(HttpResponse::Ok().json(ApiResponse::success("Match updated", updated))),
        Err(e) => Ok(error_response(&e)),
    }
}

#[tracing::instrument(name = "Delete match request", skip(path, service))]
pub async fn delete_match<S: FixtureStore>(
    path: web::Path<MatchId>,
    service: web::Data<MatchService<S>>,
) -> Result<HttpResponse> {
    let match_id = path.into_inner();
    match service.delete_match(match_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_message(format!(
            "Match {} deleted",
            match_id
        )))),
        Err(e) => Ok(error_response(&e)),
    }
}
