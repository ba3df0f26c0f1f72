use actix_web::{web, App, HttpServer};
use actix_web::dev::Server;
use tracing_actix_web::TracingLogger;
use std::net::TcpListener;

pub mod config;
mod routes;
mod handlers;
pub mod models;
pub mod db;
pub mod fixtures;
pub mod services;
pub mod telemetry;
use crate::db::fixture_store::FixtureStore;
use crate::routes::init_routes;
use crate::services::MatchService;

pub fn run<S: FixtureStore>(
    listener: TcpListener,
    service: MatchService<S>,
) -> Result<Server, std::io::Error> {
    // Wrap using web::Data, which boils down to an Arc smart pointer
    let service = web::Data::new(service);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            // Get a pointer copy and attach it to the application state
            .app_data(service.clone())
            .configure(init_routes::<S>)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
