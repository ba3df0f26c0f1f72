// src/routes/fixtures.rs
use actix_web::web;

use crate::db::fixture_store::FixtureStore;
use crate::handlers::fixtures::{match_handler, selection_handler};

/// Match CRUD and team-scoped lookups
pub fn match_routes<S: FixtureStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/matches")
            .route(web::get().to(match_handler::list_matches::<S>))
            .route(web::post().to(match_handler::create_match::<S>))
    )
    .service(
        web::resource("/matches/{match_id}")
            .route(web::get().to(match_handler::get_match::<S>))
            .route(web::patch().to(match_handler::update_match::<S>))
            .route(web::delete().to(match_handler::delete_match::<S>))
    )
    .service(
        web::resource("/teams/{team_id}/matches/{match_id}")
            .route(web::get().to(match_handler::get_team_match::<S>))
    );
}

/// Squad selection and player availability
pub fn selection_routes<S: FixtureStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/matches/{match_id}/selections/{user_id}")
            .route(web::get().to(selection_handler::get_selection::<S>))
            .route(web::put().to(selection_handler::set_selection::<S>))
    )
    .service(
        web::resource("/matches/{match_id}/confirmations/{user_id}")
            .route(web::put().to(selection_handler::set_confirmation::<S>))
    )
    .service(
        web::resource("/users/{user_id}/pending")
            .route(web::get().to(selection_handler::get_pending_confirmations::<S>))
    );
}
