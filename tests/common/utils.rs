use std::net::TcpListener;
use once_cell::sync::Lazy;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

use teampicker_backend::run;
use teampicker_backend::config::settings::{get_config, DatabaseSettings};
use teampicker_backend::db::{MemoryFixtureStore, MemoryState, PgFixtureStore};
use teampicker_backend::services::MatchService;
use teampicker_backend::telemetry::{get_subscriber, init_subscriber};

pub const KICKOFF: &str = "2021-06-19T12:30";
pub const KICKOFF_SECONDS: &str = "2021-06-19T12:30:00";

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter_level,
            std::io::stdout
        );
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter_level,
            std::io::sink
        );
        init_subscriber(subscriber);
    }
});

pub struct TestApp {
    pub address: String,
    pub store: MemoryFixtureStore,
}

/// Teams 1 to 4, and players 1 to 6 split across teams 1 and 2
pub fn seeded_state() -> MemoryState {
    MemoryState::default()
        .with_team(1, "Team 1")
        .with_team(2, "Team 2")
        .with_team(3, "Team 3")
        .with_team(4, "Team 4")
        .with_player(1, "Ann", "Walsh", Some(1))
        .with_player(2, "Brian", "Kelly", Some(1))
        .with_player(3, "Ciara", "Byrne", Some(1))
        .with_player(4, "Declan", "Ryan", Some(2))
        .with_player(5, "Eimear", "Doyle", Some(2))
        .with_player(6, "Fionn", "Murphy", None)
}

pub fn seeded_service() -> MatchService<MemoryFixtureStore> {
    MatchService::new(MemoryFixtureStore::new(seeded_state()))
}

pub struct PgTestService {
    pub service: MatchService<PgFixtureStore>,
    pub db_pool: PgPool,
}

/// Match service on a fresh, migrated and seeded Postgres database
pub async fn spawn_pg_service() -> PgTestService {
    Lazy::force(&TRACING);

    let mut configuration = get_config().expect("Failed to read configuration.");
    configuration.database.db_name = Uuid::new_v4().to_string();
    configuration.database.db_url = None;
    let connection_pool = configure_db(&configuration.database).await;
    seed_db(&connection_pool).await;

    PgTestService {
        service: MatchService::new(PgFixtureStore::new(connection_pool.clone())),
        db_pool: connection_pool,
    }
}

pub async fn configure_db(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(
            &config.connection_string_without_db()
        )
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.db_name).as_str())
        .await
        .expect("Failed to create database.");

    // Migrate database
    let connection_pool = PgPool::connect(config.connection_string().expose_secret())
        .await
        .expect("Failed to connect to Postgres.");
    PgFixtureStore::new(connection_pool.clone())
        .run_migrations()
        .await
        .expect("Failed to migrate the database");

    connection_pool
}

/// Same teams and players as `seeded_state`
pub async fn seed_db(pool: &PgPool) {
    pool.execute(
        r#"
        INSERT INTO teams (id, name) VALUES
            (1, 'Team 1'), (2, 'Team 2'), (3, 'Team 3'), (4, 'Team 4');
        INSERT INTO users (id, name, surname, team_id) VALUES
            (1, 'Ann', 'Walsh', 1),
            (2, 'Brian', 'Kelly', 1),
            (3, 'Ciara', 'Byrne', 1),
            (4, 'Declan', 'Ryan', 2),
            (5, 'Eimear', 'Doyle', 2),
            (6, 'Fionn', 'Murphy', NULL);
        "#,
    )
    .await
    .expect("Failed to seed the database");
}

pub async fn spawn_app() -> TestApp {
    // The first time `initialize` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    Lazy::force(&TRACING);

    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    // Get port assigned by the OS
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = MemoryFixtureStore::new(seeded_state());
    let server = run(listener, MatchService::new(store.clone()))
        .expect("Failed to bind address");
    // Launch the server as a background task
    let _ = tokio::spawn(server);

    TestApp { address, store }
}

pub async fn create_match(
    client: &Client,
    app_address: &str,
    home_id: i64,
    away_id: i64,
    start_time: &str,
    selections: &[i64],
) -> reqwest::Response {
    client
        .post(&format!("{}/api/matches", app_address))
        .json(&json!({
            "home_id": home_id,
            "away_id": away_id,
            "start_time": start_time,
            "selections": selections
        }))
        .send()
        .await
        .expect("Failed to execute request.")
}

/// Create a match that is expected to succeed and return its id
pub async fn create_match_id(
    client: &Client,
    app_address: &str,
    home_id: i64,
    away_id: i64,
    start_time: &str,
    selections: &[i64],
) -> i64 {
    let response = create_match(client, app_address, home_id, away_id, start_time, selections).await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.expect("Cannot turn into a json.");
    body["data"]["id"].as_i64().expect("Created match has no id")
}
