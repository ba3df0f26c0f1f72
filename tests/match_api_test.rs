use reqwest::Client;
use serde_json::{json, Value};

mod common;
use common::utils::{create_match, create_match_id, spawn_app, KICKOFF, KICKOFF_SECONDS};

#[tokio::test]
async fn create_match_returns_the_standardised_match() {
    let test_app = spawn_app().await;
    let client = Client::new();

    let response = create_match(&client, &test_app.address, 1, 2, KICKOFF, &[3, 1, 2]).await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.expect("Cannot turn into a json.");
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["home_id"], 1);
    assert_eq!(data["away_id"], 2);
    assert_eq!(data["start_time"], KICKOFF_SECONDS);
    assert_eq!(data["result"], false);
    assert_eq!(data["score_home"], 0);

    let selections = data["selections"].as_array().expect("selections is a list");
    let ids: Vec<i64> = selections.iter().map(|player| player["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(selections[0]["confirmed"], "NONE");
    assert_eq!(selections[0]["surname"], "Walsh");
}

#[tokio::test]
async fn conflicting_fixture_is_unprocessable() {
    let test_app = spawn_app().await;
    let client = Client::new();
    create_match_id(&client, &test_app.address, 1, 2, KICKOFF, &[]).await;

    let response = create_match(&client, &test_app.address, 2, 1, KICKOFF_SECONDS, &[]).await;
    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.expect("Cannot turn into a json.");
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Duplicate fixture exists");

    let response = create_match(&client, &test_app.address, 1, 3, KICKOFF, &[]).await;
    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.expect("Cannot turn into a json.");
    assert_eq!(body["message"], "Home fixture conflict for Home team");

    assert_eq!(test_app.store.snapshot().await.match_count(), 1);
}

#[tokio::test]
async fn unknown_players_and_teams_are_unprocessable() {
    let test_app = spawn_app().await;
    let client = Client::new();

    let response = create_match(&client, &test_app.address, 1, 2, KICKOFF, &[1, 77]).await;
    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.expect("Cannot turn into a json.");
    assert_eq!(body["message"], "Unknown user id(s): 77");

    let response = create_match(&client, &test_app.address, 1, 99, KICKOFF, &[]).await;
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn unknown_fields_are_rejected() {
    let test_app = spawn_app().await;
    let client = Client::new();

    let response = client
        .post(&format!("{}/api/matches", &test_app.address))
        .json(&json!({
            "home_id": 1,
            "away_id": 2,
            "start_time": KICKOFF,
            "venue": "Pitch 2"
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_client_error());
    assert_eq!(test_app.store.snapshot().await.match_count(), 0);
}

#[tokio::test]
async fn get_update_and_delete_match() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let match_id = create_match_id(&client, &test_app.address, 1, 2, KICKOFF, &[1]).await;

    let response = client
        .get(&format!("{}/api/matches/{}", &test_app.address, match_id))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .patch(&format!("{}/api/matches/{}", &test_app.address, match_id))
        .json(&json!({
            "result": true,
            "score_home": 2,
            "score_away": 1,
            "selections": [2, 1]
        }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Cannot turn into a json.");
    assert_eq!(body["data"]["result"], true);
    assert_eq!(body["data"]["score_home"], 2);
    assert_eq!(body["data"]["selections"][0]["id"], 1);
    assert_eq!(body["data"]["selections"][1]["id"], 2);

    let response = client
        .delete(&format!("{}/api/matches/{}", &test_app.address, match_id))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .get(&format!("{}/api/matches/{}", &test_app.address, match_id))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .delete(&format!("{}/api/matches/{}", &test_app.address, match_id))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn team_scoped_match_lookup() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let match_id = create_match_id(&client, &test_app.address, 1, 2, KICKOFF, &[]).await;

    let response = client
        .get(&format!("{}/api/teams/2/matches/{}", &test_app.address, match_id))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .get(&format!("{}/api/teams/3/matches/{}", &test_app.address, match_id))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn list_matches_with_filters() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let late = create_match_id(&client, &test_app.address, 1, 2, "2021-06-26T12:30", &[]).await;
    let early = create_match_id(&client, &test_app.address, 3, 1, "2021-06-12T12:30", &[]).await;
    create_match_id(&client, &test_app.address, 3, 4, "2021-06-19T12:30", &[]).await;

    let response = client
        .get(&format!("{}/api/matches", &test_app.address))
        .query(&[("team", "1"), ("order", "date_asc")])
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Cannot turn into a json.");
    let ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![early, late]);

    let response = client
        .get(&format!("{}/api/matches", &test_app.address))
        .query(&[("date_range", "before"), ("date", "2021-06-19")])
        .send()
        .await
        .expect("Failed to execute request.");
    let body: Value = response.json().await.expect("Cannot turn into a json.");
    let ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![early]);
}

#[tokio::test]
async fn selection_and_confirmation_flow() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let match_id = create_match_id(&client, &test_app.address, 1, 2, KICKOFF, &[]).await;
    let selection_url = format!("{}/api/matches/{}/selections/4", &test_app.address, match_id);
    let confirmation_url = format!("{}/api/matches/{}/confirmations/4", &test_app.address, match_id);

    // not selected yet
    let response = client
        .put(&confirmation_url)
        .query(&[("select", "y")])
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 409);

    let response = client
        .put(&selection_url)
        .query(&[("select", "t")])
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Cannot turn into a json.");
    assert_eq!(body["data"]["outcome"], "added");

    let response = client
        .put(&confirmation_url)
        .query(&[("select", "m")])
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Cannot turn into a json.");
    assert_eq!(body["data"]["confirmed"], "MAYBE");

    let response = client
        .get(&selection_url)
        .send()
        .await
        .expect("Failed to execute request.");
    let body: Value = response.json().await.expect("Cannot turn into a json.");
    assert_eq!(body["data"], json!({ "selected": true, "confirmed": "MAYBE" }));

    let response = client
        .get(&format!("{}/api/users/4/pending", &test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Cannot turn into a json.");
    assert_eq!(body["data"][0]["match_id"], match_id);
    assert_eq!(body["data"][0]["start_time"], KICKOFF_SECONDS);
}

#[tokio::test]
async fn invalid_choices_are_unprocessable() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let match_id = create_match_id(&client, &test_app.address, 1, 2, KICKOFF, &[1]).await;

    let response = client
        .put(&format!("{}/api/matches/{}/selections/1", &test_app.address, match_id))
        .query(&[("select", "m")])
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 422);

    let response = client
        .put(&format!("{}/api/matches/{}/confirmations/1", &test_app.address, match_id))
        .query(&[("select", "t")])
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn selection_for_unknown_match_or_player_is_not_found() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let match_id = create_match_id(&client, &test_app.address, 1, 2, KICKOFF, &[]).await;

    let response = client
        .put(&format!("{}/api/matches/999/selections/1", &test_app.address))
        .query(&[("select", "y")])
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .put(&format!("{}/api/matches/{}/selections/999", &test_app.address, match_id))
        .query(&[("select", "y")])
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 404);
}
