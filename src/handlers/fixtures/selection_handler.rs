use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use serde_json::json;

use crate::db::fixture_store::FixtureStore;
use crate::fixtures::FixtureError;
use crate::handlers::fixtures::error_response;
use crate::models::common::ApiResponse;
use crate::models::fixture::{ConfirmationChoice, MatchId, SelectionChoice, UserId};
use crate::services::MatchService;

/// `?select=` argument shared by the selection and confirmation routes.
///
/// Kept as a raw string so an invalid choice is reported like any other
/// invalid input instead of as a malformed query.
#[derive(Debug, Deserialize)]
pub struct SelectQuery {
    pub select: String,
}

/// Add, remove or toggle a player in a match's squad
#[tracing::instrument(name = "Set selection request", skip(path, query, service), fields(select = %query.select))]
pub async fn set_selection<S: FixtureStore>(
    path: web::Path<(MatchId, UserId)>,
    query: web::Query<SelectQuery>,
    service: web::Data<MatchService<S>>,
) -> Result<HttpResponse> {
    let (match_id, user_id) = path.into_inner();
    let choice: SelectionChoice = match query.select.parse() {
        Ok(choice) => choice,
        Err(e) => return Ok(error_response(&FixtureError::InvalidInput(e))),
    };

    match service.set_selection(match_id, user_id, choice).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            "Selection updated",
            json!({
                "match_id": match_id,
                "user_id": user_id,
                "outcome": outcome
            }),
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}

pub async fn get_selection<S: FixtureStore>(
    path: web::Path<(MatchId, UserId)>,
    service: web::Data<MatchService<S>>,
) -> Result<HttpResponse> {
    let (match_id, user_id) = path.into_inner();
    match service.selection_status(match_id, user_id).await {
        Ok(status) => Ok(HttpResponse::Ok().json(ApiResponse::success("Selection status", status))),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Record a selected player's availability
#[tracing::instrument(name = "Set confirmation request", skip(path, query, service), fields(select = %query.select))]
pub async fn set_confirmation<S: FixtureStore>(
    path: web::Path<(MatchId, UserId)>,
    query: web::Query<SelectQuery>,
    service: web::Data<MatchService<S>>,
) -> Result<HttpResponse> {
    let (match_id, user_id) = path.into_inner();
    let choice: ConfirmationChoice = match query.select.parse() {
        Ok(choice) => choice,
        Err(e) => return Ok(error_response(&FixtureError::InvalidInput(e))),
    };

    match service.set_confirmation(match_id, user_id, choice).await {
        Ok(status) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            "Confirmation updated",
            json!({
                "match_id": match_id,
                "user_id": user_id,
                "confirmed": status
            }),
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Fixtures a player still has to answer for
pub async fn get_pending_confirmations<S: FixtureStore>(
    path: web::Path<UserId>,
    service: web::Data<MatchService<S>>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    match service.pending_confirmations(user_id).await {
        Ok(pending) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            format!("{} pending confirmations", pending.len()),
            pending,
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}
