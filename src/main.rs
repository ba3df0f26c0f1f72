use std::net::TcpListener;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use teampicker_backend::run;
use teampicker_backend::config::settings::{get_config, StorageBackend};
use teampicker_backend::db::{MemoryFixtureStore, MemoryState, PgFixtureStore};
use teampicker_backend::services::MatchService;
use teampicker_backend::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Panic if we can't read the config
    let config = get_config().expect("Failed to read the config.");

    let subscriber = get_subscriber(
        "teampicker-backend".into(),
        config.application.log_level.clone(),
        std::io::stdout
    );
    init_subscriber(subscriber);

    let address = format!("{}:{}", config.application.host, config.application.port);
    let listener = TcpListener::bind(&address)?;

    match config.application.storage {
        StorageBackend::Postgres => {
            // Only try to establish connection when actually used
            let connection_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800))
                .connect_lazy(
                    config.database.connection_string().expose_secret()
                )
                .expect("Failed to create Postgres connection pool");

            let store = PgFixtureStore::new(connection_pool);
            if let Err(e) = store.run_migrations().await {
                tracing::error!("Failed to run database migrations: {}", e);
                std::process::exit(1);
            }

            tracing::info!("Serving fixtures from Postgres on {}", address);
            run(listener, MatchService::new(store))?.await
        }
        StorageBackend::Memory => {
            let seed = config.application.seed;
            tracing::warn!(
                "Serving fixtures from memory on {} with {} teams and {} players; nothing is persisted",
                address,
                seed.teams.len(),
                seed.players.len()
            );
            let store = MemoryFixtureStore::new(MemoryState::seeded(seed.teams, seed.players));
            run(listener, MatchService::new(store))?.await
        }
    }
}
