use actix_web::web;

pub mod backend_health;
pub mod fixtures;

use crate::db::fixture_store::FixtureStore;

pub fn init_routes<S: FixtureStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(backend_health::backend_health);

    cfg.service(
        web::scope("/api")
            .configure(fixtures::match_routes::<S>)
            .configure(fixtures::selection_routes::<S>)
    );
}
