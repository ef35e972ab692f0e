//! Browser tests for the JS-facing API
#![cfg(target_arch = "wasm32")]

use cricket_scorer::CricketApp;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn app_with_players(group: &str) -> CricketApp {
    let mut app = CricketApp::new_with_config(group, "{}", 42).unwrap();
    app.wipe_group().unwrap();
    for (name, bat, bowl) in [
        ("Anil", "Reliable", "Fast"),
        ("Ravi", "R", "Medium"),
        ("Kiran", "So-So", "Fast"),
        ("Dev", "S", "DNB"),
    ] {
        app.add_player(name, bat, bowl, false).unwrap();
    }
    app
}

#[wasm_bindgen_test]
fn test_bad_config_is_rejected() {
    assert!(CricketApp::new_with_config("web-config", "{not json", 1).is_err());
}

#[wasm_bindgen_test]
fn test_players_persist_in_local_storage() {
    let app = app_with_players("web-persist");
    drop(app);

    let reopened = CricketApp::new_with_config("web-persist", "{}", 42).unwrap();
    let players: serde_json::Value = serde_json::from_str(&reopened.get_players()).unwrap();
    assert_eq!(players.as_array().unwrap().len(), 4);
}

#[wasm_bindgen_test]
fn test_scoring_through_the_facade() {
    let mut app = app_with_players("web-scoring");
    let teams: serde_json::Value =
        serde_json::from_str(&app.generate_teams("[1,2,3,4]", 1, 2).unwrap()).unwrap();
    let batting = teams[0]["players"].as_array().unwrap().clone();
    let fielding = teams[1]["players"].as_array().unwrap().clone();

    app.start_match(2).unwrap();
    app.select_striker(batting[0].as_u64().unwrap() as u32).unwrap();
    app.select_non_striker(batting[1].as_u64().unwrap() as u32).unwrap();
    app.select_bowler(fielding[0].as_u64().unwrap() as u32).unwrap();

    app.record_runs(4).unwrap();
    app.record_delivery(r#"{"runs":0,"extras":"Wide"}"#).unwrap();
    let live: serde_json::Value = serde_json::from_str(&app.get_live_summary().unwrap()).unwrap();
    assert_eq!(live["score"], "5/0");
    assert_eq!(live["overs"], "0.1");

    app.undo().unwrap();
    let live: serde_json::Value = serde_json::from_str(&app.get_live_summary().unwrap()).unwrap();
    assert_eq!(live["score"], "4/0");

    assert!(app.record_delivery("{\"runs\":").is_err());
    app.abandon_match().unwrap();
    assert_eq!(app.get_match(), "null");
}

#[wasm_bindgen_test]
fn test_export_round_trip() {
    let mut app = app_with_players("web-export");
    let backup = app.wipe_group().unwrap();
    assert_eq!(app.get_players(), "[]");

    let summary: serde_json::Value = serde_json::from_str(&app.import_data(&backup).unwrap()).unwrap();
    assert_eq!(summary["players"], 4);
}

#[wasm_bindgen_test]
fn test_hash_password_matches_sha256() {
    assert_eq!(
        cricket_scorer::hash_password(""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}
